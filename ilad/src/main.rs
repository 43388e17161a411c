#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use ila_core::amfp::{run_forwarder, run_router, ConnectionSlots};
use ila_core::config::{self, AmfpOpts, DbOpts, LogLevel, RouteOpts};
use ila_core::model::{MapKey, MapValue};
use ila_core::notify::run_notify_listener;
use ila_core::route::{NetlinkRouteInstaller, RouteInstaller};
use ila_core::store::{RedisStore, Store};
use ila_core::sync::run_router_sync;
use ila_core::telemetry::init_tracing;
use tracing::{error, info};

const DEFAULT_HOST: &str = "::1";
const DEFAULT_MAP_PORT: u16 = 6379;

/// ILA forwarding daemon: mirrors *map* into kernel routes (router mode)
/// or dials upstream routers for mappings (forwarder mode).
#[derive(Parser, Debug)]
#[command(author, version, about = "ILA forwarding daemon")]
struct Cli {
    /// Background the process after startup.
    #[arg(short = 'd', long)]
    daemonize: bool,

    /// Write logs to this file instead of stderr.
    #[arg(short = 'L', long, value_name = "FILE")]
    logfile: Option<PathBuf>,

    /// Minimum severity to log.
    #[arg(short = 'l', long, value_name = "LEVEL")]
    loglevel: Option<String>,

    /// `host=H,port=P` for the *map* store (router mode only).
    #[arg(short = 'D', long, value_name = "OPTS", default_value = "")]
    dbopts: String,

    /// `dev=IF,via=ADDR,local-locator=LOC`.
    #[arg(short = 'R', long, value_name = "OPTS")]
    routeopts: String,

    /// `router=ADDR[,router=ADDR...]` (forwarder mode only).
    #[arg(short = 'A', long, value_name = "OPTS", default_value = "")]
    amfpopts: String,

    /// Run as a router: serve AMFP, watch *map*, install routes.
    #[arg(short = 'r', long, conflicts_with = "forwarder")]
    router: bool,

    /// Run as a forwarder: dial configured routers for MAP_INFO.
    #[arg(short = 'f', long, conflicts_with = "router")]
    forwarder: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = cli.loglevel.as_deref().map(|s| s.parse::<LogLevel>());
    let level = match level {
        Some(Ok(l)) => Some(l),
        Some(Err(e)) => {
            eprintln!("invalid --loglevel: {e}");
            std::process::exit(-1);
        }
        None => None,
    };
    init_tracing(level);

    if let Err(e) = run(cli).await {
        error!(%e, "ilad failed to start");
        std::process::exit(-1);
    }
}

async fn run(cli: Cli) -> ila_core::IlaResult<()> {
    if !cli.router && !cli.forwarder {
        return Err(ila_core::IlaError::Config("one of -r/--router or -f/--forwarder is required".into()));
    }

    if cli.daemonize {
        config::daemonize()?;
    }

    let route_opts = RouteOpts::parse(&cli.routeopts)?;
    let mut route: NetlinkRouteInstaller = NetlinkRouteInstaller::new();
    route.init().await?;
    route.configure(route_opts.into_route_config()).await?;
    route.start().await?;
    let route = Arc::new(route);

    if cli.router {
        run_as_router(cli, route).await
    } else {
        run_as_forwarder(cli, route).await
    }
}

async fn run_as_router(cli: Cli, route: Arc<NetlinkRouteInstaller>) -> ila_core::IlaResult<()> {
    let db_opts = DbOpts::parse(&cli.dbopts, DEFAULT_HOST, DEFAULT_MAP_PORT)?;
    let mut map_store: RedisStore<MapKey, MapValue> = RedisStore::new();
    map_store.configure(db_opts.into_store_options()).await?;
    map_store.start().await?;
    let map_store = Arc::new(map_store);
    let slots = Arc::new(ConnectionSlots::new());

    info!("ilad running in router mode");

    let sync_map = map_store.clone();
    let sync_route = route.clone();
    let sync_task = tokio::spawn(async move { run_router_sync(sync_map.as_ref(), sync_route.as_ref()).await });

    let amfp_map = map_store.clone();
    let amfp_route = route.clone();
    let amfp_slots = slots.clone();
    let amfp_task = tokio::spawn(async move { run_router(amfp_map, amfp_route, amfp_slots).await });

    let notify_map = map_store.clone();
    let notify_slots = slots.clone();
    let notify_task =
        tokio::spawn(async move { run_notify_listener(notify_map.as_ref(), notify_slots.as_ref()).await });

    tokio::select! {
        res = sync_task => res.map_err(|e| ila_core::IlaError::Route(e.to_string()))?,
        res = amfp_task => res.map_err(|e| ila_core::IlaError::AmfpProtocol(e.to_string()))?,
        res = notify_task => res.map_err(|e| ila_core::IlaError::Netlink(e.to_string()))?,
    }
}

async fn run_as_forwarder(cli: Cli, route: Arc<NetlinkRouteInstaller>) -> ila_core::IlaResult<()> {
    let amfp_opts = AmfpOpts::parse(&cli.amfpopts)?;
    if amfp_opts.routers.is_empty() {
        return Err(ila_core::IlaError::Config("forwarder mode requires at least one -A router=ADDR".into()));
    }
    info!(routers = amfp_opts.routers.len(), "ilad running in forwarder mode");
    run_forwarder(amfp_opts.routers, route).await
}
