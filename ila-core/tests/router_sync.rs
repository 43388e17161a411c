#![forbid(unsafe_code)]

//! Exercises the forwarding daemon's map-watch-to-route-install path
//! end to end against in-memory fakes (no real store or kernel involved).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ila_core::model::{Address, ChecksumMode, HookType, IdentType, MapKey, MapValue};
use ila_core::route::{RouteConfig, RouteInstaller};
use ila_core::store::{Store, StoreOptions, Watch};
use ila_core::sync::run_router_sync;
use ila_core::IlaResult;
use tokio::sync::{mpsc, Mutex};

struct FakeMapStore {
    data: Arc<Mutex<HashMap<MapKey, MapValue>>>,
    events_rx: Mutex<Option<mpsc::Receiver<MapKey>>>,
}

#[async_trait]
impl Store for FakeMapStore {
    type Key = MapKey;
    type Value = MapValue;

    async fn configure(&mut self, _options: StoreOptions) -> IlaResult<()> {
        Ok(())
    }

    async fn start(&mut self) -> IlaResult<()> {
        Ok(())
    }

    async fn stop(&mut self) -> IlaResult<()> {
        Ok(())
    }

    async fn read(&self, key: &MapKey) -> IlaResult<Option<MapValue>> {
        Ok(self.data.lock().await.get(key).copied())
    }

    async fn write(&self, key: &MapKey, value: &MapValue) -> IlaResult<()> {
        self.data.lock().await.insert(*key, *value);
        Ok(())
    }

    async fn delete(&self, key: &MapKey) -> IlaResult<bool> {
        Ok(self.data.lock().await.remove(key).is_some())
    }

    async fn scan(&self) -> IlaResult<Vec<MapKey>> {
        Ok(self.data.lock().await.keys().copied().collect())
    }

    async fn watch_all(&self) -> IlaResult<Watch<MapKey>> {
        let rx = self.events_rx.lock().await.take().expect("watch_all called twice");
        let task = tokio::spawn(std::future::pending::<()>());
        Ok(Watch::new(rx, task.abort_handle()))
    }

    async fn watch_one(&self, _key: MapKey) -> IlaResult<Watch<()>> {
        unimplemented!()
    }
}

struct FakeRouteInstaller {
    installed: Arc<Mutex<HashMap<MapKey, MapValue>>>,
    local_locator: u64,
    ack_tx: mpsc::Sender<()>,
}

#[async_trait]
impl RouteInstaller for FakeRouteInstaller {
    async fn init(&mut self) -> IlaResult<()> {
        Ok(())
    }

    async fn configure(&mut self, _config: RouteConfig) -> IlaResult<()> {
        Ok(())
    }

    async fn start(&mut self) -> IlaResult<()> {
        Ok(())
    }

    async fn set_route(&self, key: MapKey, value: MapValue) -> IlaResult<()> {
        if value.loc == self.local_locator {
            return self.del_route(key).await;
        }
        self.installed.lock().await.insert(key, value);
        let _ = self.ack_tx.send(()).await;
        Ok(())
    }

    async fn del_route(&self, key: MapKey) -> IlaResult<()> {
        self.installed.lock().await.remove(&key);
        let _ = self.ack_tx.send(()).await;
        Ok(())
    }
}

fn addr5() -> Address {
    Address::from_parts(0xaabb_0000_0000_0000, 5)
}

fn derived(loc: u64) -> MapValue {
    MapValue {
        loc,
        ifindex: 0,
        csum_mode: ChecksumMode::NeutralMapAuto,
        ident_type: IdentType::Luid,
        hook_type: HookType::RouteOutput,
    }
}

/// Scenario 3 (watch-driven route install) followed by scenario 4
/// (deletion): a map write arrives over the watch channel, installs a
/// route, then a later deletion event removes it.
#[tokio::test]
async fn watch_driven_install_then_delete() {
    let (events_tx, events_rx) = mpsc::channel(1);
    let (ack_tx, mut ack_rx) = mpsc::channel(4);

    let key = MapKey(addr5());
    let store = FakeMapStore { data: Arc::new(Mutex::new(HashMap::new())), events_rx: Mutex::new(Some(events_rx)) };
    let data = store.data.clone();
    let route = FakeRouteInstaller { installed: Arc::new(Mutex::new(HashMap::new())), local_locator: 0, ack_tx };
    let installed = route.installed.clone();

    let sync_handle = tokio::spawn(async move { run_router_sync(&store, &route).await });

    // Write the entry, then notify the watcher of it (scenario 3).
    data.lock().await.insert(key, derived(0xaabb_0000_0000_0000));
    events_tx.send(key).await.unwrap();
    ack_rx.recv().await.expect("set_route should have been invoked");

    assert_eq!(installed.lock().await.get(&key).copied(), Some(derived(0xaabb_0000_0000_0000)));

    // Remove the entry, then notify the watcher of the deletion (scenario 4).
    data.lock().await.remove(&key);
    events_tx.send(key).await.unwrap();
    ack_rx.recv().await.expect("del_route should have been invoked");

    assert!(installed.lock().await.get(&key).is_none());

    drop(events_tx);
    sync_handle.await.unwrap().unwrap();
}

/// Scenario 5: a map entry whose locator equals this router's own
/// locator must never be installed, and any stale prior entry for it
/// must be deleted instead.
#[tokio::test]
async fn local_locator_entry_is_deleted_not_installed() {
    let (events_tx, events_rx) = mpsc::channel(1);
    let (ack_tx, mut ack_rx) = mpsc::channel(4);

    let key = MapKey(addr5());
    const LOCAL_LOCATOR: u64 = 0xfe80_0000_0000_0000;

    let store = FakeMapStore { data: Arc::new(Mutex::new(HashMap::new())), events_rx: Mutex::new(Some(events_rx)) };
    let data = store.data.clone();
    let route =
        FakeRouteInstaller { installed: Arc::new(Mutex::new(HashMap::new())), local_locator: LOCAL_LOCATOR, ack_tx };
    let installed = route.installed.clone();

    // Simulate a stale route left behind by a previous instance.
    installed.lock().await.insert(key, derived(LOCAL_LOCATOR));

    let sync_handle = tokio::spawn(async move { run_router_sync(&store, &route).await });

    data.lock().await.insert(key, derived(LOCAL_LOCATOR));
    events_tx.send(key).await.unwrap();
    ack_rx.recv().await.expect("set_route should have delegated to del_route");

    assert!(installed.lock().await.get(&key).is_none(), "a local-locator entry must never be installed");

    drop(events_tx);
    sync_handle.await.unwrap().unwrap();
}
