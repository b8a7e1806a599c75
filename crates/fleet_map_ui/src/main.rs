mod app;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fleet_map::config::{default_config_path, load_surface_config, SurfaceConfig};
use fleet_map::source::{ReplaySource, SnapshotSource};

use ui::app_shell::{run, Launch};

#[derive(Debug, Parser)]
#[command(name = "fleet_map_ui", about = "Live map of drivers and rides")]
struct Args {
    /// Map configuration file. Defaults to fleet_map.json in the working directory.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Replay captured snapshots from a JSON file instead of polling a backend.
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Start the replay over when it reaches the end.
    #[arg(long)]
    loop_replay: bool,
    /// Dashboard backend base URL serving /drivers and /rides.
    #[cfg(feature = "http")]
    #[arg(long)]
    endpoint: Option<String>,
    /// Seconds between snapshot fetches.
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fleet_map::reconcile=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(args: &Args) -> Result<SurfaceConfig, String> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path().map_err(|error| error.to_string())?,
    };
    load_surface_config(&path).map_err(|error| error.to_string())
}

fn build_source(args: &Args) -> Result<Box<dyn SnapshotSource>, String> {
    if let Some(path) = &args.replay {
        let source = ReplaySource::from_file(path).map_err(|error| error.to_string())?;
        return Ok(Box::new(source.looping(args.loop_replay)));
    }
    #[cfg(feature = "http")]
    if let Some(endpoint) = &args.endpoint {
        let source = fleet_map::source::http::HttpSnapshotSource::new(endpoint)
            .map_err(|error| error.to_string())?;
        return Ok(Box::new(source));
    }
    Err("no snapshot source: pass --replay <file> or --endpoint <url>".to_string())
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let launch = load_config(&args).and_then(|config| {
        Ok(Launch {
            config,
            source: build_source(&args)?,
            interval: Duration::from_secs(args.interval_secs),
        })
    });
    let launch = match launch {
        Ok(launch) => launch,
        Err(error) => {
            tracing::error!(%error, "startup.failed");
            return ExitCode::FAILURE;
        }
    };

    match run(launch) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "viewer.failed");
            ExitCode::FAILURE
        }
    }
}
