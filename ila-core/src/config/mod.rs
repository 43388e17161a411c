//! Configuration surface: CLI-level sub-option parsing and the typed
//! option groups each component needs.

mod amfp;
mod daemon;
mod logging;
mod route;
mod store;
mod subopts;

pub use amfp::AmfpOpts;
pub use daemon::daemonize;
pub use logging::LogLevel;
pub use route::RouteOpts;
pub use store::DbOpts;
pub use subopts::parse_subopts;
