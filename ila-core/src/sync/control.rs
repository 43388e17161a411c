use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::IlaResult;
use crate::model::{Address, IdentKey, LocKey, MapKey, MapValue};
use crate::store::Store;

/// Runs the control daemon's ident→loc→map join forever: scans *ident*
/// once, then reacts to every subsequent mutation.
///
/// `ident` keys drive the join; `loc` supplies the locator for a non-zero
/// `loc_num`; `map` receives the derived forwarding entry. A small cache of
/// the last-known address per identifier lets a deletion event (where the
/// row is already gone) still find the derived *map* entry to remove.
pub async fn run_control_sync<SI, SL, SM>(ident: &SI, loc: &SL, map: &SM) -> IlaResult<()>
where
    SI: Store<Key = IdentKey, Value = crate::model::IdentValue>,
    SL: Store<Key = LocKey, Value = crate::model::LocValue>,
    SM: Store<Key = MapKey, Value = MapValue>,
{
    let last_known: Mutex<HashMap<IdentKey, Address>> = Mutex::new(HashMap::new());

    let scanned = ident.scan().await?;
    for key in &scanned {
        visit(*key, ident, loc, map, &last_known).await;
    }

    let mut watch = ident.watch_all().await?;
    while let Some(key) = watch.events.recv().await {
        visit(key, ident, loc, map, &last_known).await;
    }
    Ok(())
}

async fn visit<SI, SL, SM>(
    key: IdentKey,
    ident: &SI,
    loc: &SL,
    map: &SM,
    last_known: &Mutex<HashMap<IdentKey, Address>>,
) where
    SI: Store<Key = IdentKey, Value = crate::model::IdentValue>,
    SL: Store<Key = LocKey, Value = crate::model::LocValue>,
    SM: Store<Key = MapKey, Value = MapValue>,
{
    match ident.read(&key).await {
        Ok(Some(ival)) => {
            last_known.lock().await.insert(key, ival.addr);
            if ival.loc_num == 0 {
                delete_map_entry(map, ival.addr).await;
                return;
            }
            match loc.read(&LocKey(ival.loc_num)).await {
                Ok(Some(lval)) => {
                    let map_key = MapKey(ival.addr);
                    let map_value = MapValue::derived(lval.locator);
                    if let Err(e) = map.write(&map_key, &map_value).await {
                        warn!(%e, ident = key.0, "failed to write derived map entry");
                    }
                }
                Ok(None) => {
                    debug!(ident = key.0, loc_num = ival.loc_num, "referenced locator missing, deleting map entry");
                    delete_map_entry(map, ival.addr).await;
                }
                Err(e) => {
                    warn!(%e, ident = key.0, "loc store read failed, retry on next event");
                }
            }
        }
        Ok(None) => {
            let addr = last_known.lock().await.remove(&key);
            match addr {
                Some(addr) => delete_map_entry(map, addr).await,
                None => debug!(ident = key.0, "ident missing, no prior address known"),
            }
        }
        Err(e) => {
            warn!(%e, ident = key.0, "ident store read failed, retry on next event");
        }
    }
}

async fn delete_map_entry<SM>(map: &SM, addr: Address)
where
    SM: Store<Key = MapKey, Value = MapValue>,
{
    if let Err(e) = map.delete(&MapKey(addr)).await {
        warn!(%e, %addr, "failed to delete derived map entry");
    }
}
