//! Store abstraction: the external identifier/locator/map key-value
//! backend, and the reference wire driver for it.

mod codec;
mod redis;

pub use codec::WireCodec;
pub use redis::RedisStore;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::error::IlaResult;

/// Connection options accepted by `Store::configure`.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub host: String,
    pub port: u16,
}

impl StoreOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        StoreOptions { host: host.into(), port }
    }
}

/// A subscription created by `watch_all`/`watch_one`. Dropping or calling
/// `stop` aborts the background task feeding `events` — the idiomatic
/// replacement for the opaque watch-handle-plus-`stop_watch`-call pair.
pub struct Watch<T> {
    pub events: mpsc::Receiver<T>,
    handle: AbortHandle,
}

impl<T> Watch<T> {
    pub fn new(events: mpsc::Receiver<T>, handle: AbortHandle) -> Self {
        Watch { events, handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

/// The store abstraction described for *ident*, *loc*, and *map* rows.
///
/// `read` distinguishes "missing" (`Ok(None)`) from transport failure
/// (`Err`). `scan` and `watch_all` visitors (here, the channel consumer)
/// must be idempotent: a key may be observed more than once.
#[async_trait]
pub trait Store: Send + Sync {
    type Key: Send + Sync + Clone + 'static;
    type Value: Send + Sync + Clone + 'static;

    async fn configure(&mut self, options: StoreOptions) -> IlaResult<()>;
    async fn start(&mut self) -> IlaResult<()>;
    async fn stop(&mut self) -> IlaResult<()>;

    async fn read(&self, key: &Self::Key) -> IlaResult<Option<Self::Value>>;
    async fn write(&self, key: &Self::Key, value: &Self::Value) -> IlaResult<()>;
    /// Returns `Ok(true)` if a row was deleted, `Ok(false)` if it was
    /// already missing.
    async fn delete(&self, key: &Self::Key) -> IlaResult<bool>;

    /// Every key currently present. May repeat entries under concurrent
    /// mutation; callers must treat this idempotently.
    async fn scan(&self) -> IlaResult<Vec<Self::Key>>;

    /// Subscribes to every key mutation. Completes scan-then-watch
    /// ordering is the caller's responsibility: call `scan` before
    /// `watch_all` so no changes are missed between the two.
    async fn watch_all(&self) -> IlaResult<Watch<Self::Key>>;

    /// Subscribes to mutations of a single key.
    async fn watch_one(&self, key: Self::Key) -> IlaResult<Watch<()>>;
}
