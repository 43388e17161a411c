//! Turns decoded AMFP messages into store reads and route installs.

use tracing::warn;

use crate::amfp::wire::AmfpMessage;
use crate::error::IlaResult;
use crate::model::{Address, MapKey, MapValue};
use crate::route::RouteInstaller;
use crate::store::Store;

/// Answers a MAP_REQUEST by looking up every requested identifier in the
/// local *map* store. A missing entry gets a zeroed locator; a read error
/// is logged and also produces a zeroed locator rather than aborting the
/// whole reply.
pub async fn handle_map_request<S>(map: &S, identifiers: &[Address]) -> AmfpMessage
where
    S: Store<Key = MapKey, Value = MapValue>,
{
    let mut pairs = Vec::with_capacity(identifiers.len());
    for ident in identifiers {
        let locator = match map.read(&MapKey(*ident)).await {
            Ok(Some(value)) => ident.with_locator(value.loc),
            Ok(None) => Address::UNSPECIFIED,
            Err(e) => {
                warn!(%e, %ident, "map read failed answering MAP_REQUEST, replying with zeroed locator");
                Address::UNSPECIFIED
            }
        };
        pairs.push((*ident, locator));
    }
    AmfpMessage::map_info_reply(pairs)
}

/// Installs a route for every pair in an incoming MAP_INFO. A failed
/// install is logged; processing continues with the remaining pairs.
pub async fn handle_map_info<R>(route: &R, pairs: &[(Address, Address)]) -> IlaResult<()>
where
    R: RouteInstaller,
{
    for (ident, loc) in pairs {
        let key = MapKey(*ident);
        let value = MapValue::derived(loc.locator());
        if let Err(e) = route.set_route(key, value).await {
            warn!(%e, %ident, "failed to install route from MAP_INFO pair, continuing");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeMap(Mutex<Vec<(MapKey, MapValue)>>);

    #[async_trait]
    impl Store for FakeMap {
        type Key = MapKey;
        type Value = MapValue;

        async fn configure(&mut self, _: crate::store::StoreOptions) -> IlaResult<()> {
            Ok(())
        }
        async fn start(&mut self) -> IlaResult<()> {
            Ok(())
        }
        async fn stop(&mut self) -> IlaResult<()> {
            Ok(())
        }
        async fn read(&self, key: &Self::Key) -> IlaResult<Option<Self::Value>> {
            Ok(self.0.lock().unwrap().iter().find(|(k, _)| k == key).map(|(_, v)| *v))
        }
        async fn write(&self, _: &Self::Key, _: &Self::Value) -> IlaResult<()> {
            Ok(())
        }
        async fn delete(&self, _: &Self::Key) -> IlaResult<bool> {
            Ok(true)
        }
        async fn scan(&self) -> IlaResult<Vec<Self::Key>> {
            Ok(vec![])
        }
        async fn watch_all(&self) -> IlaResult<crate::store::Watch<Self::Key>> {
            unimplemented!()
        }
        async fn watch_one(&self, _: Self::Key) -> IlaResult<crate::store::Watch<()>> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn map_request_zeroes_unknown_identifier() {
        let map = FakeMap(Mutex::new(vec![]));
        let reply = handle_map_request(&map, &[Address::from_parts(0, 99)]).await;
        match reply {
            AmfpMessage::MapInfo { pairs, .. } => {
                assert_eq!(pairs[0].1, Address::UNSPECIFIED);
            }
            _ => panic!("expected MapInfo"),
        }
    }

    #[tokio::test]
    async fn map_request_fills_known_identifier() {
        let ident = Address::from_parts(0, 1);
        let map = FakeMap(Mutex::new(vec![(MapKey(ident), MapValue::derived(0xfe80))]));
        let reply = handle_map_request(&map, &[ident]).await;
        match reply {
            AmfpMessage::MapInfo { pairs, .. } => {
                assert_eq!(pairs[0].1.locator(), 0xfe80);
            }
            _ => panic!("expected MapInfo"),
        }
    }
}
