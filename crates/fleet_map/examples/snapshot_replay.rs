//! Replay a captured snapshot file through a recording surface and report surface churn.
//!
//! Run with: cargo run -p fleet_map --example snapshot_replay -- path/to/snapshots.json

use std::path::PathBuf;
use std::process::ExitCode;

use fleet_map::config::{default_config_path, load_surface_config};
use fleet_map::session::MapSession;
use fleet_map::source::{ReplaySource, SnapshotSource, SourceError};
use fleet_map::test_helpers::RecordingSurface;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(path) = std::env::args().nth(1).map(PathBuf::from) else {
        eprintln!("usage: snapshot_replay <snapshots.json>");
        return ExitCode::FAILURE;
    };

    match run(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("replay failed: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_surface_config(&default_config_path()?)?;
    let mut source = ReplaySource::from_file(&path)?;
    let mut session = MapSession::open(RecordingSurface::new(), config)?;

    println!("--- Snapshot replay ({} snapshots) ---", source.len());
    println!(
        "{:>5} {:>8} {:>8} {:>8} {:>8} {:>9} {:>8} {:>7}",
        "cycle", "created", "updated", "same", "removed", "invalid", "failed", "calls"
    );
    loop {
        let snapshot = match source.fetch() {
            Ok(snapshot) => snapshot,
            Err(SourceError::Exhausted) => break,
            Err(error) => return Err(error.into()),
        };
        session.surface_mut().clear_calls();
        let report = session.apply(&snapshot)?;
        println!(
            "{:>5} {:>8} {:>8} {:>8} {:>8} {:>9} {:>8} {:>7}",
            session.cycles(),
            report.created,
            report.updated,
            report.unchanged,
            report.removed,
            report.skipped_invalid,
            report.failures.len(),
            session.surface().total_calls()
        );
    }

    let live = session.registry().len();
    session.close()?;
    println!(
        "Closed session: {} overlays removed, {} handles left live",
        live,
        session.surface().live_handles()
    );
    Ok(())
}
