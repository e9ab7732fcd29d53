//! sdvd: the SDV fleet orchestrator daemon.
//!
//! Loads the fleet, optionally replays the service journal, and serves the
//! dashboard API.
//!
//! # Usage
//!
//! ```text
//! sdvd serve --port 5000 --config fleet.toml --data-dir /var/lib/sdv
//! sdvd check --config fleet.toml
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sdv_core::{FleetConfig, default_fleet};
use sdv_orchestrator::Orchestrator;
use sdv_state::StateStore;

const DEFAULT_LOG_FILTER: &str = "info,sdvd=debug,sdv=debug";

#[derive(Parser)]
#[command(name = "sdvd", about = "SDV fleet orchestrator daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the orchestrator and serve the HTTP API.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Address to bind.
        #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
        bind: IpAddr,

        /// Fleet file. The built-in fleet is used when absent.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Directory for the service journal. Without it, state lives only
        /// as long as the process.
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Validate a fleet file and print a summary.
    Check {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Serve {
            port,
            bind,
            config,
            data_dir,
        } => serve(SocketAddr::new(bind, port), config.as_deref(), data_dir.as_deref()).await,
        Command::Check { config } => check(&config),
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_fleet(path: Option<&Path>) -> anyhow::Result<FleetConfig> {
    match path {
        Some(path) if path.exists() => {
            let config = FleetConfig::from_file(path)?;
            info!(path = %path.display(), "fleet file loaded");
            Ok(config)
        }
        Some(path) => {
            warn!(path = %path.display(), "fleet file not found, using built-in fleet");
            Ok(default_fleet())
        }
        None => Ok(default_fleet()),
    }
}

async fn serve(
    addr: SocketAddr,
    config: Option<&Path>,
    data_dir: Option<&Path>,
) -> anyhow::Result<()> {
    info!("SDV orchestrator starting");

    let fleet = load_fleet(config)?;
    let orchestrator = match data_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let db_path = dir.join("sdv.redb");
            let journal = StateStore::open(&db_path)?;
            info!(path = %db_path.display(), "service journal opened");
            Orchestrator::with_journal(&fleet, journal)?
        }
        None => Orchestrator::new(&fleet)?,
    };
    let router = sdv_api::build_router(Arc::new(orchestrator));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("SDV orchestrator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn check(path: &Path) -> anyhow::Result<()> {
    let fleet = FleetConfig::from_file(path)?;
    let orchestrator = Orchestrator::new(&fleet)?;

    println!("{}: ok", path.display());
    println!("placement strategy: {}", orchestrator.strategy_name());
    println!("nodes:");
    for node in orchestrator.list_nodes() {
        println!(
            "  {:<12} {:<14} cpu={} memory={}MB gpu={} bandwidth={}Mbps",
            node.id,
            node.domain.label(),
            node.total_cpu,
            node.total_memory,
            node.has_gpu,
            node.network_bandwidth
        );
    }
    println!("templates:");
    for template in orchestrator.list_templates() {
        let req = template.requirements;
        println!(
            "  {:<18} cpu={} memory={}MB gpu={} bandwidth={}Mbps",
            template.key,
            req.cpu_cores,
            req.memory_mb,
            req.gpu_required,
            req.network_bandwidth_mbps
        );
    }
    Ok(())
}
