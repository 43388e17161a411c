//! The router's AMFP connection-slot table: up to 2^16 live peer
//! connections, indexed by the locator-id carried in their source address.

use std::collections::HashMap;

use tokio::io::WriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

use crate::amfp::wire::AmfpMessage;

/// A handle to a live connection's write side, used to push unsolicited
/// MAP_INFO (redirects) to a peer identified only by its locator-id.
pub struct ConnectionHandle {
    pub outbox: mpsc::Sender<AmfpMessage>,
}

/// Sparse table of connection slots. A `HashMap` rather than the original's
/// dense `[Option<_>; 65536]` array: Rust's hash map is already O(1)
/// amortized and a router rarely holds more than a few hundred live peers.
#[derive(Default)]
pub struct ConnectionSlots {
    slots: Mutex<HashMap<u16, ConnectionHandle>>,
}

impl ConnectionSlots {
    pub fn new() -> Self {
        ConnectionSlots { slots: Mutex::new(HashMap::new()) }
    }

    /// Installs a connection in `locator_id`'s slot. A connection already
    /// occupying the slot is replaced (and implicitly dropped/closed) —
    /// the newest accept always wins.
    pub async fn insert(&self, locator_id: u16, handle: ConnectionHandle) {
        self.slots.lock().await.insert(locator_id, handle);
    }

    pub async fn remove(&self, locator_id: u16) {
        self.slots.lock().await.remove(&locator_id);
    }

    pub async fn is_occupied(&self, locator_id: u16) -> bool {
        self.slots.lock().await.contains_key(&locator_id)
    }

    /// Sends `message` to the peer in `locator_id`'s slot, if any is live.
    pub async fn send(&self, locator_id: u16, message: AmfpMessage) -> bool {
        let slots = self.slots.lock().await;
        match slots.get(&locator_id) {
            Some(handle) => handle.outbox.send(message).await.is_ok(),
            None => false,
        }
    }
}

pub type ConnWriter = WriteHalf<TcpStream>;
