//! Kernel route-notification listener (router role only).
//!
//! Subscribes to a multicast netlink group that the kernel's ILA patch
//! uses to report packets forwarded without a mapping. For each
//! notification, looks up the source's locator-id and, if a forwarder is
//! connected in that slot, pushes it a redirect toward the destination's
//! real locator.

use netlink_sys::{protocols::NETLINK_ROUTE, SocketAddr, TokioSocket};
use nix::errno::Errno;
use tracing::{debug, warn};

use crate::amfp::{redirect_message, ConnectionSlots};
use crate::error::{IlaError, IlaResult};
use crate::model::{Address, MapKey, MapValue};
use crate::store::Store;

/// Out-of-tree multicast group the patched kernel reports unmapped
/// traffic on. Not a standard `RTNLGRP_*` value.
const RTNLGRP_ROUTE_NOTIFY: u32 = 1 << 30;

/// Custom netlink message type carrying a (source, destination) address
/// pair for a packet that had no ILA mapping.
const RTM_NOTIFYROUTE: u16 = 200;

const NLMSG_HDR_LEN: usize = 16;
const RECORD_LEN: usize = 32; // source + destination, 16 bytes each

/// Runs the notification loop forever. Socket errors other than EAGAIN or
/// ENOBUFS (or an EOF / malformed sender address) are fatal, per the
/// listener-fatal error taxonomy.
pub async fn run_notify_listener<S>(map: &S, slots: &ConnectionSlots) -> IlaResult<()>
where
    S: Store<Key = MapKey, Value = MapValue>,
{
    let mut socket = TokioSocket::new(NETLINK_ROUTE).map_err(|e| IlaError::Netlink(e.to_string()))?;
    socket
        .socket_mut()
        .bind(&SocketAddr::new(0, RTNLGRP_ROUTE_NOTIFY))
        .map_err(|e| IlaError::Netlink(e.to_string()))?;

    let mut buf = vec![0u8; 8192];
    loop {
        let (n, addr) = match socket.recv_from(&mut buf, 0).await {
            Ok(v) => v,
            Err(e) => match e.raw_os_error().map(Errno::from_raw) {
                Some(Errno::EAGAIN) | Some(Errno::EINTR) => continue,
                Some(Errno::ENOBUFS) => {
                    warn!("notification socket ENOBUFS, some notifications were dropped");
                    continue;
                }
                _ => return Err(IlaError::Netlink(format!("notification recv failed: {e}"))),
            },
        };
        if n == 0 {
            return Err(IlaError::Netlink("notification socket closed (EOF)".into()));
        }
        if addr.port_number() != 0 && addr.port_number() != RTNLGRP_ROUTE_NOTIFY {
            return Err(IlaError::Netlink("notification sender address mismatch".into()));
        }

        for record in parse_messages(&buf[..n]) {
            handle_notification(map, slots, record).await;
        }
    }
}

struct NotifyRecord {
    source: Address,
    destination: Address,
}

fn parse_messages(buf: &[u8]) -> Vec<NotifyRecord> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    while offset + NLMSG_HDR_LEN <= buf.len() {
        let len = u32::from_ne_bytes(buf[offset..offset + 4].try_into().unwrap()) as usize;
        let msg_type = u16::from_ne_bytes(buf[offset + 4..offset + 6].try_into().unwrap());
        if len < NLMSG_HDR_LEN || offset + len > buf.len() {
            break;
        }
        if msg_type == RTM_NOTIFYROUTE {
            let payload = &buf[offset + NLMSG_HDR_LEN..offset + len];
            if payload.len() >= RECORD_LEN {
                let mut source = [0u8; 16];
                let mut destination = [0u8; 16];
                source.copy_from_slice(&payload[..16]);
                destination.copy_from_slice(&payload[16..32]);
                out.push(NotifyRecord { source: Address(source), destination: Address(destination) });
            }
        }
        offset += len;
    }
    out
}

async fn handle_notification<S>(map: &S, slots: &ConnectionSlots, record: NotifyRecord)
where
    S: Store<Key = MapKey, Value = MapValue>,
{
    let src_value = match map.read(&MapKey(record.source)).await {
        Ok(Some(v)) => v,
        Ok(None) => {
            debug!(source = %record.source, "no map entry for notification source, dropping");
            return;
        }
        Err(e) => {
            warn!(%e, source = %record.source, "map read failed for notification source");
            return;
        }
    };
    let locator_id = record.source.with_locator(src_value.loc).redirect_locator_id();

    let dst_value = match map.read(&MapKey(record.destination)).await {
        Ok(Some(v)) => v,
        Ok(None) => return,
        Err(e) => {
            warn!(%e, destination = %record.destination, "map read failed for notification destination");
            return;
        }
    };

    if !slots.is_occupied(locator_id).await {
        debug!(locator_id, "no AMFP connection for redirect target, dropping");
        return;
    }

    let locator_half = record.destination.with_locator(dst_value.loc);
    let sent = slots.send(locator_id, redirect_message(record.destination, locator_half)).await;
    if !sent {
        warn!(locator_id, "failed to push redirect, connection vanished concurrently");
    }
}
