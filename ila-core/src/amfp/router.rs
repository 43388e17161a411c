//! The router side of AMFP: accepts forwarder connections on `[::]:5555`
//! and answers MAP_REQUEST / applies MAP_INFO against the local stores.

use std::sync::Arc;

use socket2::{Domain, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::connections::{ConnectionHandle, ConnectionSlots};
use super::framer::Framer;
use super::handlers::{handle_map_info, handle_map_request};
use super::wire::AmfpMessage;
use crate::error::{IlaError, IlaResult};
use crate::model::{Address, MapKey, MapValue};
use crate::route::RouteInstaller;
use crate::store::Store;

const AMFP_PORT: u16 = 5555;

fn reuseaddr_listener() -> IlaResult<std::net::TcpListener> {
    let socket = Socket::new(Domain::IPV6, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    socket.set_only_v6(true)?;
    let addr: std::net::SocketAddr = ([0u16, 0, 0, 0, 0, 0, 0, 0], AMFP_PORT).into();
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// Runs the router's accept loop forever. An error here is listener-fatal
/// per the AMFP error taxonomy: it terminates the whole reactor, since an
/// accept loop that cannot accept can no longer serve its purpose.
pub async fn run_router<S, R>(map: Arc<S>, route: Arc<R>, slots: Arc<ConnectionSlots>) -> IlaResult<()>
where
    S: Store<Key = MapKey, Value = MapValue> + 'static,
    R: RouteInstaller + 'static,
{
    let std_listener = reuseaddr_listener()?;
    let listener = TcpListener::from_std(std_listener)?;
    info!(port = AMFP_PORT, "AMFP router listening");

    loop {
        let (stream, peer) = listener
            .accept()
            .await
            .map_err(|e| IlaError::AmfpProtocol(format!("accept failed: {e}")))?;

        let locator_id = match peer.ip() {
            std::net::IpAddr::V6(v6) => {
                let octets = v6.octets();
                u16::from_be_bytes([octets[2], octets[3]])
            }
            std::net::IpAddr::V4(_) => {
                warn!(%peer, "rejecting AF_INET AMFP connection, only IPv6 peers are supported");
                continue;
            }
        };

        let (tx, rx) = mpsc::channel(64);
        slots.insert(locator_id, ConnectionHandle { outbox: tx }).await;

        let map = map.clone();
        let route = route.clone();
        let slots = slots.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, map.as_ref(), route.as_ref(), rx).await {
                warn!(%e, locator_id, "AMFP connection closed");
            }
            slots.remove(locator_id).await;
        });
    }
}

async fn serve_connection<S, R>(
    mut stream: tokio::net::TcpStream,
    map: &S,
    route: &R,
    mut outbox: mpsc::Receiver<AmfpMessage>,
) -> IlaResult<()>
where
    S: Store<Key = MapKey, Value = MapValue>,
    R: RouteInstaller,
{
    let (mut read_half, mut write_half) = stream.split();
    let mut framer = Framer::new();
    let mut buf = [0u8; 4096];

    loop {
        tokio::select! {
            read = read_half.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    return Ok(());
                }
                framer.push(&buf[..n]);
                while let Some(frame) = framer.next_frame()? {
                    let message = AmfpMessage::decode(&frame)?;
                    if let Some(reply) = dispatch(map, route, message).await? {
                        write_half.write_all(&reply.encode()).await?;
                    }
                }
            }
            Some(outgoing) = outbox.recv() => {
                write_half.write_all(&outgoing.encode()).await?;
            }
        }
    }
}

async fn dispatch<S, R>(map: &S, route: &R, message: AmfpMessage) -> IlaResult<Option<AmfpMessage>>
where
    S: Store<Key = MapKey, Value = MapValue>,
    R: RouteInstaller,
{
    match message {
        AmfpMessage::MapRequest { identifiers, .. } => {
            Ok(Some(handle_map_request(map, &identifiers).await))
        }
        AmfpMessage::MapInfo { pairs, .. } => {
            handle_map_info(route, &pairs).await?;
            Ok(None)
        }
        AmfpMessage::ExtMapInfo | AmfpMessage::LocatorUnreachable => Ok(None),
    }
}

/// Builds the redirect message pushed to a forwarder when the notification
/// listener sees traffic for a destination it should instead be sending to
/// the router directly.
pub fn redirect_message(dest: Address, locator: Address) -> AmfpMessage {
    AmfpMessage::redirect(dest, locator)
}
