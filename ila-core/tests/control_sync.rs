#![forbid(unsafe_code)]

//! Exercises the control daemon's ident+loc→map join end to end against
//! in-memory fakes.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ila_core::model::{Address, ChecksumMode, HookType, IdentKey, IdentType, IdentValue, LocKey, LocValue, MapKey, MapValue};
use ila_core::store::{Store, StoreOptions, Watch};
use ila_core::sync::run_control_sync;
use ila_core::IlaResult;
use tokio::sync::{mpsc, Mutex};

struct FakeStore<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    events_rx: Mutex<Option<mpsc::Receiver<K>>>,
}

#[async_trait]
impl<K, V> Store for FakeStore<K, V>
where
    K: Eq + std::hash::Hash + Send + Sync + Clone + 'static,
    V: Send + Sync + Clone + 'static,
{
    type Key = K;
    type Value = V;

    async fn configure(&mut self, _options: StoreOptions) -> IlaResult<()> {
        Ok(())
    }

    async fn start(&mut self) -> IlaResult<()> {
        Ok(())
    }

    async fn stop(&mut self) -> IlaResult<()> {
        Ok(())
    }

    async fn read(&self, key: &K) -> IlaResult<Option<V>> {
        Ok(self.data.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &K, value: &V) -> IlaResult<()> {
        self.data.lock().await.insert(key.clone(), value.clone());
        Ok(())
    }

    async fn delete(&self, key: &K) -> IlaResult<bool> {
        Ok(self.data.lock().await.remove(key).is_some())
    }

    async fn scan(&self) -> IlaResult<Vec<K>> {
        Ok(self.data.lock().await.keys().cloned().collect())
    }

    async fn watch_all(&self) -> IlaResult<Watch<K>> {
        let rx = self.events_rx.lock().await.take().expect("watch_all called twice");
        let task = tokio::spawn(std::future::pending::<()>());
        Ok(Watch::new(rx, task.abort_handle()))
    }

    async fn watch_one(&self, _key: K) -> IlaResult<Watch<()>> {
        unimplemented!()
    }
}

fn addr5() -> Address {
    Address::from_parts(0xaabb_0000_0000_0000, 5)
}

/// Scenario 3 (control-daemon half): `ident[42] = (addr, loc_num=7)` and
/// `loc[7] = L` joins into a derived *map* write, then scenario 4:
/// deleting `ident[42]` removes that derived entry via the last-known
/// address cache.
#[tokio::test]
async fn ident_loc_join_then_deletion() {
    let (ident_tx, ident_rx) = mpsc::channel(1);
    let (_loc_tx, loc_rx) = mpsc::channel::<LocKey>(1);

    let ident_key = IdentKey(42);
    let addr = addr5();

    let ident_store: FakeStore<IdentKey, IdentValue> =
        FakeStore { data: Arc::new(Mutex::new(HashMap::new())), events_rx: Mutex::new(Some(ident_rx)) };
    let ident_data = ident_store.data.clone();

    let mut loc_data_map = HashMap::new();
    loc_data_map.insert(LocKey(7), LocValue { locator: 0xaabb_0000_0000_0000 });
    let loc_store: FakeStore<LocKey, LocValue> =
        FakeStore { data: Arc::new(Mutex::new(loc_data_map)), events_rx: Mutex::new(Some(loc_rx)) };

    let map_store: FakeStore<MapKey, MapValue> =
        FakeStore { data: Arc::new(Mutex::new(HashMap::new())), events_rx: Mutex::new(Some(mpsc::channel(1).1)) };
    let map_data = map_store.data.clone();

    let sync_handle =
        tokio::spawn(async move { run_control_sync(&ident_store, &loc_store, &map_store).await });

    // ident[42] appears with loc_num=7 (scenario 3).
    ident_data.lock().await.insert(ident_key, IdentValue { addr, loc_num: 7 });
    ident_tx.send(ident_key).await.unwrap();

    // Poll until the join has landed; the synchronizer has no completion
    // signal of its own, so wait for the expected map write to appear.
    let expected = MapValue {
        loc: 0xaabb_0000_0000_0000,
        ifindex: 0,
        csum_mode: ChecksumMode::NeutralMapAuto,
        ident_type: IdentType::Luid,
        hook_type: HookType::RouteOutput,
    };
    wait_until(|| async { map_data.lock().await.get(&MapKey(addr)).copied() == Some(expected) }).await;

    // ident[42] is deleted; the synchronizer must find the derived map
    // entry via its last-known-address cache and remove it (scenario 4).
    ident_data.lock().await.remove(&ident_key);
    ident_tx.send(ident_key).await.unwrap();

    wait_until(|| async { map_data.lock().await.get(&MapKey(addr)).is_none() }).await;

    drop(ident_tx);
    sync_handle.await.unwrap().unwrap();
}

async fn wait_until<F, Fut>(mut predicate: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if predicate().await {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition was not met in time");
}
