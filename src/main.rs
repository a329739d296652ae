use anyhow::{Context, Result};
use clap::Parser;
use pypsa_explorer::config::{Config, DEFAULT_CONFIG_PATH};
use pypsa_explorer::registry::{NetworkRegistry, NetworkRequest};
use pypsa_explorer::{api, app::AppState, telemetry};
use std::path::PathBuf;
use tracing::{info, warn};

/// Interactive dashboard for PyPSA energy system networks.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Networks to load, as PATH or PATH:LABEL. The bundled demo network is
    /// used when none are given.
    #[arg(value_name = "PATH[:LABEL]")]
    networks: Vec<String>,

    /// Address to bind, overrides the config file.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides the config file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Verbose logging.
    #[arg(long, default_value_t = true, overrides_with = "no_debug")]
    debug: bool,

    /// Quiet logging.
    #[arg(long = "no-debug", overrides_with = "debug")]
    no_debug: bool,

    /// Config file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

impl Cli {
    fn debug_logging(&self) -> bool {
        self.debug && !self.no_debug
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let debug_logging = cli.debug_logging();
    telemetry::init_tracing(debug_logging);

    let mut cfg = Config::load_from(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        cfg.server.host = host;
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    let requests: Vec<NetworkRequest> = cli.networks.iter().map(|arg| NetworkRequest::parse(arg)).collect();
    let registry = tokio::task::spawn_blocking(move || NetworkRegistry::from_requests(&requests))
        .await
        .context("network loading task failed")?
        .context("failed to load networks")?;
    info!(networks = ?registry.list_labels(), "networks loaded");

    let state = AppState::new(cfg.clone(), registry);
    let app = api::router(state, &cfg);

    let addr = cfg.server.socket_addr()?;
    if cfg.server.host == "0.0.0.0" {
        warn!("binding to 0.0.0.0, the dashboard is reachable from the network");
    }
    info!(%addr, debug = debug_logging, "starting PyPSA Explorer");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(telemetry::shutdown_signal())
        .await?;

    warn!("shutdown complete");
    Ok(())
}
