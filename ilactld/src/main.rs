#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use ila_core::config::{self, DbOpts, LogLevel};
use ila_core::model::{IdentKey, IdentValue, LocKey, LocValue, MapKey, MapValue};
use ila_core::store::{RedisStore, Store};
use ila_core::sync::run_control_sync;
use ila_core::telemetry::init_tracing;
use tracing::{error, info};

const DEFAULT_HOST: &str = "::1";
const DEFAULT_MAP_PORT: u16 = 6379;
const DEFAULT_IDENT_PORT: u16 = 6380;
const DEFAULT_LOC_PORT: u16 = 6381;

/// ILA control daemon: joins the *ident* and *loc* stores into derived
/// *map* entries.
#[derive(Parser, Debug)]
#[command(author, version, about = "ILA control daemon")]
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

    /// `host=H,port=P` for the *map* store (default port 6379).
    #[arg(short = 'M', long, value_name = "OPTS", default_value = "")]
    mapopts: String,

    /// `host=H,port=P` for the *ident* store (default port 6380).
    #[arg(short = 'I', long, value_name = "OPTS", default_value = "")]
    identopts: String,

    /// `host=H,port=P` for the *loc* store (default port 6381).
    #[arg(short = 'O', long, value_name = "OPTS", default_value = "")]
    locopts: String,
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
        error!(%e, "ilactld failed to start");
        std::process::exit(-1);
    }
}

async fn run(cli: Cli) -> ila_core::IlaResult<()> {
    if cli.daemonize {
        config::daemonize()?;
    }

    let map_opts = DbOpts::parse(&cli.mapopts, DEFAULT_HOST, DEFAULT_MAP_PORT)?;
    let ident_opts = DbOpts::parse(&cli.identopts, DEFAULT_HOST, DEFAULT_IDENT_PORT)?;
    let loc_opts = DbOpts::parse(&cli.locopts, DEFAULT_HOST, DEFAULT_LOC_PORT)?;

    let mut map_store: RedisStore<MapKey, MapValue> = RedisStore::new();
    map_store.configure(map_opts.into_store_options()).await?;
    map_store.start().await?;

    let mut ident_store: RedisStore<IdentKey, IdentValue> = RedisStore::new();
    ident_store.configure(ident_opts.into_store_options()).await?;
    ident_store.start().await?;

    let mut loc_store: RedisStore<LocKey, LocValue> = RedisStore::new();
    loc_store.configure(loc_opts.into_store_options()).await?;
    loc_store.start().await?;

    info!("ilactld started, joining ident+loc into map");
    run_control_sync(&ident_store, &loc_store, &map_store).await
}
