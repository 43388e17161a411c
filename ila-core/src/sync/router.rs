use tracing::warn;

use crate::error::IlaResult;
use crate::model::{MapKey, MapValue};
use crate::route::RouteInstaller;
use crate::store::Store;

/// Runs the forwarding daemon's map→route mirror forever: scans *map*
/// once, installing a route per entry, then reacts to every subsequent
/// mutation.
pub async fn run_router_sync<S, R>(map: &S, route: &R) -> IlaResult<()>
where
    S: Store<Key = MapKey, Value = MapValue>,
    R: RouteInstaller,
{
    let scanned = map.scan().await?;
    for key in &scanned {
        visit(*key, map, route).await;
    }

    let mut watch = map.watch_all().await?;
    while let Some(key) = watch.events.recv().await {
        visit(key, map, route).await;
    }
    Ok(())
}

async fn visit<S, R>(key: MapKey, map: &S, route: &R)
where
    S: Store<Key = MapKey, Value = MapValue>,
    R: RouteInstaller,
{
    match map.read(&key).await {
        Ok(Some(value)) => {
            if let Err(e) = route.set_route(key, value).await {
                warn!(%e, addr = %key.0, "failed to install route");
            }
        }
        Ok(None) => {
            if let Err(e) = route.del_route(key).await {
                warn!(%e, addr = %key.0, "failed to delete route for missing map entry");
            }
        }
        Err(e) => {
            warn!(%e, addr = %key.0, "map store read failed, retry on next event");
        }
    }
}
