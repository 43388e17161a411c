//! Route installer abstraction: turns map entries into kernel forwarding
//! state, and the reference netlink-backed driver for it.

mod netlink;

pub use netlink::NetlinkRouteInstaller;

use async_trait::async_trait;

use crate::error::IlaResult;
use crate::model::MapKey;
use crate::model::MapValue;

/// Static route-installer configuration: outgoing device, next-hop, and
/// this node's own locator (routes to it are a local no-op, not a real
/// route install).
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub dev: String,
    pub via: std::net::Ipv6Addr,
    pub local_locator: u64,
}

#[async_trait]
pub trait RouteInstaller: Send + Sync {
    async fn init(&mut self) -> IlaResult<()>;
    async fn configure(&mut self, config: RouteConfig) -> IlaResult<()>;

    /// Purges any routes tagged by a prior instance of this installer,
    /// then marks the installer ready to accept `set_route`/`del_route`.
    async fn start(&mut self) -> IlaResult<()>;

    /// Installs (or, for the local locator, deletes any stale entry for)
    /// the route described by `key`/`value`.
    async fn set_route(&self, key: MapKey, value: MapValue) -> IlaResult<()>;

    /// Removes the route for `key`. Returns `Ok(())` even if it was
    /// already absent.
    async fn del_route(&self, key: MapKey) -> IlaResult<()>;
}
