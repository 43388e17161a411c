//! Mapping synchronizer: mirrors a store into forwarding state, scanning
//! once at startup and then reacting to every subsequent change.

mod control;
mod router;

pub use control::run_control_sync;
pub use router::run_router_sync;
