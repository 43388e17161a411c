use std::str::FromStr;

use crate::error::IlaError;

/// The eight syslog-style severities accepted by `-l/--loglevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Emerg,
    Alert,
    Crit,
    Err,
    Warning,
    Notice,
    Info,
    Debug,
}

impl LogLevel {
    /// Maps to the closest `tracing`/`EnvFilter` directive: there's no
    /// 1:1 syslog↔tracing mapping, so EMERG..ERR collapse to `error`,
    /// NOTICE collapses into `info`.
    pub fn as_tracing_filter(self) -> &'static str {
        match self {
            LogLevel::Emerg | LogLevel::Alert | LogLevel::Crit | LogLevel::Err => "error",
            LogLevel::Warning => "warn",
            LogLevel::Notice | LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = IlaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "EMERG" => LogLevel::Emerg,
            "ALERT" => LogLevel::Alert,
            "CRIT" => LogLevel::Crit,
            "ERR" => LogLevel::Err,
            "WARNING" => LogLevel::Warning,
            "NOTICE" => LogLevel::Notice,
            "INFO" => LogLevel::Info,
            "DEBUG" => LogLevel::Debug,
            other => return Err(IlaError::Config(format!("unknown loglevel {other:?}"))),
        })
    }
}
