#![forbid(unsafe_code)]

pub mod amfp;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod route;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod tlv;

pub use error::{IlaError, IlaResult};
pub use model::{
    Address, ChecksumMode, HookType, IdentKey, IdentValue, IdentType, LocKey, LocValue, MapKey,
    MapValue,
};
pub use route::RouteInstaller;
pub use store::{Store, StoreOptions, Watch};
