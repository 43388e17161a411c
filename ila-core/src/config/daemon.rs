use crate::error::{IlaError, IlaResult};

/// Backgrounds the current process for `-d/--daemonize`, keeping the
/// current working directory and leaving stdio attached to `/dev/null`
/// (mirroring the standard double-fork `daemon(3)` semantics the original
/// process-supervision wrapper relied on).
pub fn daemonize() -> IlaResult<()> {
    nix::unistd::daemon(true, false).map_err(|e| IlaError::Config(format!("daemonize failed: {e}")))
}
