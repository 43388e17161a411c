use crate::error::IlaResult;
use crate::store::StoreOptions;

use super::subopts::{parse_subopts, require};

/// Parsed `-D/--dbopts host=H,port=P`.
#[derive(Debug, Clone)]
pub struct DbOpts {
    pub host: String,
    pub port: u16,
}

impl DbOpts {
    pub fn parse(input: &str, default_host: &str, default_port: u16) -> IlaResult<Self> {
        let opts = parse_subopts(input)?;
        let host = opts.get("host").cloned().unwrap_or_else(|| default_host.to_string());
        let port = match opts.get("port") {
            Some(p) => p
                .parse()
                .map_err(|_| crate::error::IlaError::Config(format!("invalid port {p:?}")))?,
            None => default_port,
        };
        Ok(DbOpts { host, port })
    }

    pub fn parse_required(input: &str, flag: &str) -> IlaResult<Self> {
        let opts = parse_subopts(input)?;
        let host = require(&opts, "host", flag)?.to_string();
        let port: u16 = require(&opts, "port", flag)?
            .parse()
            .map_err(|_| crate::error::IlaError::Config(format!("{flag}: invalid port")))?;
        Ok(DbOpts { host, port })
    }

    pub fn into_store_options(self) -> StoreOptions {
        StoreOptions::new(self.host, self.port)
    }
}
