use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trafficlens_core::loading::{NetworkAsset, load_network};
use trafficlens_core::source::{MockNetwork, MockSource, SnapshotSource};
use trafficlens_server::{
    AppState, HttpBridge, RequestLimits, ServerConfig, StreamSettings, bridge_router, router,
};

/// Live traffic telemetry relay
#[derive(clap::Parser, Debug)]
#[command(name = "trafficlens-server", version, about, propagate_version = true)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the live stream, the state endpoint and the network geometry
    Serve(ServeArgs),

    /// Serve `GET /state` from the built-in random-walk network
    Bridge(BridgeArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Address to listen on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Base URL of the snapshot bridge
    #[arg(long)]
    bridge_url: Option<String>,

    /// Relay period in milliseconds
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Network geometry asset (`.json` or `.geojson`)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    network: Option<PathBuf>,

    /// Use the built-in random-walk network instead of the bridge
    #[arg(long)]
    mock: bool,

    /// Seed for `--mock`
    #[arg(long, requires = "mock")]
    seed: Option<u64>,
}

#[derive(clap::Args, Debug)]
struct BridgeArgs {
    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:5001")]
    listen: SocketAddr,

    /// Fixed random seed, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

impl ServeArgs {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(url) = &self.bridge_url {
            config.bridge_url.clone_from(url);
        }
        if let Some(ms) = self.poll_interval_ms {
            config.poll_interval_ms = ms;
        }
        if let Some(path) = &self.network {
            config.network_path = Some(path.clone());
        }
    }
}

fn mock_source(seed: Option<u64>) -> MockSource {
    let network = match seed {
        Some(seed) => MockNetwork::seeded(seed),
        None => MockNetwork::from_entropy(),
    };
    MockSource::new(network)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = ServerConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            config.validate().context("invalid configuration")?;

            let network = match &config.network_path {
                Some(path) => {
                    let geometry = load_network(path).with_context(|| {
                        format!("loading network geometry from {}", path.display())
                    })?;
                    info!(
                        edges = geometry.len(),
                        path = %path.display(),
                        "Loaded network geometry"
                    );
                    Some(Arc::new(NetworkAsset::from(&geometry)))
                }
                None => None,
            };

            if args.mock {
                info!("Relaying from the built-in mock network");
                serve(Arc::new(mock_source(args.seed)), network, &config).await
            } else {
                let bridge = HttpBridge::new(&config.bridge_url, config.request_timeout())
                    .context("creating bridge client")?;
                info!(url = bridge.state_url(), "Relaying from bridge");
                serve(Arc::new(bridge), network, &config).await
            }
        }
        Commands::Bridge(args) => {
            let source = Arc::new(mock_source(args.seed));
            let app = bridge_router(source, RequestLimits::from(&config));
            let listener = TcpListener::bind(args.listen)
                .await
                .with_context(|| format!("binding {}", args.listen))?;
            info!("Mock bridge listening on http://{}/state", args.listen);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("bridge server failed")
        }
    }
}

async fn serve<S>(
    source: Arc<S>,
    network: Option<Arc<NetworkAsset>>,
    config: &ServerConfig,
) -> Result<()>
where
    S: SnapshotSource + 'static,
{
    let shutdown = CancellationToken::new();
    let state = AppState {
        source,
        network,
        stream: StreamSettings::from(config),
        shutdown: shutdown.clone(),
    };
    let app = router(state, RequestLimits::from(config));

    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("binding {}", config.listen))?;
    info!(
        poll_interval_ms = config.poll_interval_ms,
        "Listening on http://{}",
        config.listen
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // end open streams so the server can drain
            shutdown.cancel();
        })
        .await
        .context("server failed")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
