use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

const DEFAULT_FIXTURE: &str = "crates/fleet_map/fixtures/douala_snapshots.json";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the fleet map workspace",
    long_about = "A unified CLI for running the map viewer, snapshot replays, benchmarks,\n\
                  and CI checks in the fleet map workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch the map viewer
    Ui {
        /// Replay captured snapshots instead of polling a backend
        #[arg(long)]
        replay: Option<String>,
        /// Dashboard backend base URL
        #[arg(long, env = "FLEET_MAP_ENDPOINT")]
        endpoint: Option<String>,
    },
    /// Replay a snapshot file headless and print per-cycle churn
    Replay {
        #[arg(default_value = DEFAULT_FIXTURE)]
        file: String,
    },
    /// Run the fleet_map test suite
    Test,
    /// Run Criterion benchmarks
    Bench,
    /// Compare benchmarks: stash changes, create baseline, restore, compare
    BenchCompare,
    /// Run CI checks (fmt, clippy, tests, examples, benchmarks)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Replay the bundled fixture
    Examples,
    /// Run benchmarks
    Bench,
    /// Run check + examples + bench
    All,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn git(args: &[&str]) -> ExitStatus {
    eprintln!("+ git {}", args.join(" "));
    Command::new("git")
        .args(args)
        .status()
        .expect("failed to execute git")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_git(args: &[&str]) {
    let status = git(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_replay(file: &str) {
    run_cargo(&[
        "run",
        "-p",
        "fleet_map",
        "--example",
        "snapshot_replay",
        "--",
        file,
    ]);
}

fn run_bench(extra: &[&str]) {
    let mut args = vec!["bench", "--package", "fleet_map", "--bench", "reconcile"];
    if !extra.is_empty() {
        args.push("--");
        args.extend_from_slice(extra);
    }
    run_cargo(&args);
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test fleet_map");
    run_cargo(&["test", "-p", "fleet_map", "--all-features"]);

    step("Test fleet_map_ui");
    run_cargo(&["test", "-p", "fleet_map_ui"]);

    step("Build fleet_map without test helpers");
    run_cargo(&["build", "-p", "fleet_map", "--no-default-features", "--lib"]);
}

fn ci_examples() {
    step("Replay bundled fixture");
    run_replay(DEFAULT_FIXTURE);
}

fn ci_bench() {
    step("Run benchmarks");
    run_bench(&[]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ui { replay, endpoint } => {
            let mut args = vec!["run", "-p", "fleet_map_ui", "--"];
            if let Some(replay) = replay.as_deref() {
                args.extend_from_slice(&["--replay", replay, "--loop-replay"]);
            }
            if let Some(endpoint) = endpoint.as_deref() {
                args.extend_from_slice(&["--endpoint", endpoint]);
            }
            if replay.is_none() && endpoint.is_none() {
                args.extend_from_slice(&["--replay", DEFAULT_FIXTURE, "--loop-replay"]);
            }
            run_cargo(&args);
        }
        Commands::Replay { file } => run_replay(&file),
        Commands::Test => {
            run_cargo(&["test", "-p", "fleet_map", "-p", "fleet_map_ui"]);
        }
        Commands::Bench => run_bench(&[]),
        Commands::BenchCompare => {
            let baseline_dir = Path::new("target/criterion");
            if baseline_dir.exists() {
                step("Removing existing benchmark data");
                std::fs::remove_dir_all(baseline_dir).expect("failed to remove target/criterion");
            }

            step("Stashing current changes");
            run_git(&[
                "stash",
                "push",
                "-m",
                "Temporary stash for benchmark comparison",
            ]);

            step("Running benchmark to create baseline");
            run_bench(&["--save-baseline", "main"]);

            step("Reapplying changes");
            run_git(&["stash", "pop"]);

            step("Running benchmark comparing against baseline");
            run_bench(&["--baseline", "main"]);

            eprintln!("\nDone! Check the output above to see performance comparison.");
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Examples => ci_examples(),
                CiJob::Bench => ci_bench(),
                CiJob::All => {
                    ci_check();
                    ci_examples();
                    ci_bench();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
