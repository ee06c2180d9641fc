#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use celestial_core::{NewEvent, Store};
use celestial_server::config::{Overrides, ServerConfig};
use celestial_server::http::AppState;
use celestial_server::{server, telemetry, version};
use clap::{Args, Parser, Subcommand};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "celestialtree",
    version,
    about = "CelestialTree: in-memory causal event DAG over HTTP",
    long_about = None
)]
struct Cli {
    /// Read configuration from this TOML file instead of the per-user one.
    #[arg(long, global = true, env = "CELESTIAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    flags: ServeFlags,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve,
    /// Print the effective configuration as TOML and exit.
    Config,
}

#[derive(Args, Debug)]
struct ServeFlags {
    /// Listen host.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Listen port.
    #[arg(long = "http-port", global = true)]
    http_port: Option<u16>,

    /// Full listen address `host:port`; wins over --host/--http-port.
    #[arg(long = "http-addr", global = true)]
    http_addr: Option<String>,

    /// Events buffered per subscriber before deliveries are dropped.
    #[arg(long = "subscriber-capacity", global = true)]
    subscriber_capacity: Option<usize>,

    /// Start with an empty ledger instead of a genesis event.
    #[arg(long = "no-genesis", global = true)]
    no_genesis: bool,
}

impl From<ServeFlags> for Overrides {
    fn from(flags: ServeFlags) -> Self {
        Self {
            host: flags.host,
            http_port: flags.http_port,
            http_addr: flags.http_addr,
            subscriber_capacity: flags.subscriber_capacity,
            no_genesis: flags.no_genesis,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?.with_overrides(cli.flags.into());
    telemetry::init_tracing(&config.log.clone().with_env())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Serve => serve(&config),
    }
}

fn serve(config: &ServerConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let store = Store::with_config(&config.store);
    if config.genesis {
        let genesis = store
            .emit(NewEvent::new("genesis").with_message(config.genesis_message.clone()))
            .context("genesis failed")?;
        info!(id = genesis.id, "genesis emitted");
    }

    info!(
        "{} {}({}) built at {}",
        version::NAME,
        version::VERSION,
        version::GIT_COMMIT,
        version::BUILD_TIME
    );

    let state = Arc::new(AppState::new(store));
    runtime
        .block_on(server::run(config, state))
        .context("http server failed")
}
