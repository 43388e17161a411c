//! The forwarder side of AMFP: dials a fixed set of routers and installs
//! whatever MAP_INFO they send.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{info, warn};

use super::framer::Framer;
use super::handlers::handle_map_info;
use super::wire::AmfpMessage;
use crate::error::IlaResult;
use crate::route::RouteInstaller;

/// Hard cap on configured router addresses, matching the original's fixed
/// `router_addrs[10]` array.
pub const MAX_ROUTERS: usize = 10;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Dials every configured router and keeps each connection alive with
/// exponential backoff on failure. Unlike the original (which has no
/// reconnection logic at all), this retries indefinitely — a forwarder
/// that never recovers from a transient drop is permanently partitioned
/// from its router, which defeats the point of a mobility control plane.
pub async fn run_forwarder<R>(routers: Vec<SocketAddr>, route: Arc<R>) -> IlaResult<()>
where
    R: RouteInstaller + 'static,
{
    let mut tasks = Vec::new();
    for addr in routers.into_iter().take(MAX_ROUTERS) {
        let route = route.clone();
        tasks.push(tokio::spawn(async move { dial_loop(addr, route.as_ref()).await }));
    }
    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}

async fn dial_loop<R>(addr: SocketAddr, route: &R)
where
    R: RouteInstaller,
{
    let mut backoff = INITIAL_BACKOFF;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                info!(%addr, "connected to AMFP router");
                backoff = INITIAL_BACKOFF;
                if let Err(e) = serve(stream, route).await {
                    warn!(%e, %addr, "AMFP router connection lost");
                }
            }
            Err(e) => {
                warn!(%e, %addr, backoff_secs = backoff.as_secs(), "failed to connect to AMFP router, retrying");
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
    }
}

async fn serve<R>(mut stream: TcpStream, route: &R) -> IlaResult<()>
where
    R: RouteInstaller,
{
    let mut framer = Framer::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        framer.push(&buf[..n]);
        while let Some(frame) = framer.next_frame()? {
            match AmfpMessage::decode(&frame)? {
                AmfpMessage::MapInfo { pairs, .. } => handle_map_info(route, &pairs).await?,
                AmfpMessage::MapRequest { .. }
                | AmfpMessage::ExtMapInfo
                | AmfpMessage::LocatorUnreachable => {}
            }
        }
        let _ = stream.flush().await;
    }
}
