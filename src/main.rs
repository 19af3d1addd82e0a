use std::num::NonZeroUsize;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use trafficlens::client::{self, Client};
use trafficlens::{TerminalRenderer, frame_period, run_frames};
use trafficlens_core::pipeline::DEFAULT_HISTORY_CAPACITY;
use trafficlens_core::{LivePipeline, MapView, PipelineConfig, ProjectionParams, Viewport};

/// Live traffic telemetry in the terminal
#[derive(clap::Parser, Debug)]
#[command(name = "trafficlens", version, about, propagate_version = true)]
struct Cli {
    /// Base URL of the trafficlens server
    #[arg(short, long, global = true, default_value = "http://127.0.0.1:3000")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Follow the live stream
    Watch(WatchArgs),

    /// Poll the state endpoint instead of streaming
    Poll(PollArgs),
}

#[derive(clap::Args, Debug)]
struct WatchArgs {
    /// Delay before reconnecting a dropped stream, in milliseconds
    #[arg(long, default_value_t = 2000)]
    reconnect_ms: u64,

    #[command(flatten)]
    display: DisplayArgs,
}

#[derive(clap::Args, Debug)]
struct PollArgs {
    /// Polling period in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    #[command(flatten)]
    display: DisplayArgs,
}

#[derive(clap::Args, Debug)]
struct DisplayArgs {
    /// Maximum applies per second
    #[arg(long, default_value_t = 20.0)]
    ceiling_hz: f64,

    /// Trend points kept
    #[arg(long, default_value_t = DEFAULT_HISTORY_CAPACITY)]
    history: NonZeroUsize,

    /// Display refresh rate
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    #[arg(long, default_value_t = 1000.0)]
    width: f64,

    #[arg(long, default_value_t = 700.0)]
    height: f64,

    /// Fraction of the network bounds added around the map; negative crops
    #[arg(long, default_value_t = -0.1, allow_negative_numbers = true)]
    padding: f64,

    /// Edge whose metrics are shown next to the summary
    #[arg(long)]
    follow: Option<String>,

    /// Timeout for one-shot requests, in milliseconds
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,
}

impl DisplayArgs {
    fn pipeline(&self) -> Result<LivePipeline> {
        let pipeline = LivePipeline::new(PipelineConfig {
            ceiling_hz: self.ceiling_hz,
            history_capacity: self.history,
        })?;
        Ok(pipeline)
    }

    fn projection(&self) -> ProjectionParams {
        ProjectionParams {
            viewport: Viewport::new(self.width, self.height),
            padding: self.padding,
            ..ProjectionParams::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let display = match &cli.command {
        Commands::Watch(args) => &args.display,
        Commands::Poll(args) => &args.display,
    };
    let frame = frame_period(display.fps).context("--fps must be a positive number")?;
    ensure!(
        display.width > 0.0 && display.height > 0.0,
        "viewport must be positive"
    );

    let client = Client::new(&cli.server, Duration::from_millis(display.timeout_ms))
        .context("creating HTTP client")?;
    let pipeline = client::shared(display.pipeline().context("invalid pipeline settings")?);

    let mut map = MapView::new(display.projection()).context("invalid map settings")?;
    match client.fetch_network().await {
        Ok(geometry) => {
            info!(edges = geometry.len(), "Loaded network geometry");
            map.set_geometry(Some(geometry))
                .context("projecting network geometry")?;
        }
        Err(err) => warn!(error = %err, "Network geometry unavailable, map stays loading"),
    }
    let mut renderer = TerminalRenderer::new(map, display.follow.clone());

    let frames = run_frames(&pipeline, frame, None, |live| {
        println!("{}", renderer.render(live));
    });

    match &cli.command {
        Commands::Watch(args) => {
            let reconnect = Duration::from_millis(args.reconnect_ms);
            tokio::select! {
                () = client::watch(&client, pipeline.clone(), reconnect) => {}
                _ = frames => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
        Commands::Poll(args) => {
            ensure!(args.interval_ms > 0, "--interval-ms must be positive");
            let period = Duration::from_millis(args.interval_ms);
            tokio::select! {
                () = client::poll(&client, pipeline.clone(), period) => {}
                _ = frames => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }
    }

    let stats = client::lock(&pipeline).stats();
    info!(
        offered = stats.offered,
        applied = stats.applied,
        superseded = stats.superseded,
        "Stopped"
    );
    Ok(())
}
