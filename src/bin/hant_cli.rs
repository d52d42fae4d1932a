use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hant_tracker::audio::NullAudioOutput;
use hant_tracker::engine::{RunController, SharedInput, StubTimeSource};
use hant_tracker::{compare_runs, telemetry, AppConfig, RunResult, TickOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "hant_cli",
    about = "Simulation and comparison harness for the noise tracking core"
)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted)
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a scripted listener through the tracking loop and print the result
    Simulate {
        /// Noise level the listener accepts (dB)
        #[arg(long, default_value_t = 60.0)]
        target: f64,
        /// Uniform judgement noise around the target (+/- dB)
        #[arg(long, default_value_t = 1.0)]
        jitter: f64,
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Stop the run manually after this many seconds
        #[arg(long)]
        stop_after: Option<f64>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write the telemetry snapshot (JSON) after the run
        #[arg(long)]
        telemetry_out: Option<PathBuf>,
    },
    /// Compare two saved results (Test A, Test B)
    Compare {
        #[arg(long)]
        a: PathBuf,
        #[arg(long)]
        b: PathBuf,
    },
    /// Build a result from manually measured levels
    Manual {
        /// Most comfortable speech level (dB)
        #[arg(long)]
        mcl: f64,
        /// Background noise level accepted (dB)
        #[arg(long)]
        bnl: f64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    hant_tracker::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => load_config(&path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Simulate {
            target,
            jitter,
            seed,
            stop_after,
            output,
            telemetry_out,
        } => {
            let listener = Listener {
                target,
                jitter,
                seed,
                stop_after,
            };
            run_simulate(&config, listener, output, telemetry_out)
        }
        Commands::Compare { a, b } => run_compare(&a, &b),
        Commands::Manual { mcl, bnl, output } => {
            let result = RunResult::from_manual_levels(mcl, bnl);
            emit_result(&result, output)?;
            Ok(ExitCode::from(0))
        }
    }
}

/// Scripted listener driving a simulated run
struct Listener {
    target: f64,
    jitter: f64,
    seed: u64,
    stop_after: Option<f64>,
}

fn run_simulate(
    config: &AppConfig,
    listener: Listener,
    output: Option<PathBuf>,
    telemetry_out: Option<PathBuf>,
) -> Result<ExitCode> {
    let Listener {
        target,
        jitter,
        seed,
        stop_after,
    } = listener;
    let mut telemetry_rx = telemetry::hub().collector().subscribe();

    let input = SharedInput::new();
    let mut controller = RunController::new(
        config.tracking.clone(),
        NullAudioOutput,
        Arc::new(input.clone()),
        Arc::new(StubTimeSource::new(config.tracking.tick_interval_ms)),
    )
    .context("creating tracking run")?;
    controller.start().context("starting tracking run")?;

    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = jitter.abs();
    let result = loop {
        let snapshot = controller.live_snapshot();
        if stop_after.is_some_and(|limit| snapshot.elapsed_seconds >= limit) {
            break controller
                .manual_stop()
                .context("run finished before the manual stop")?;
        }

        let judgement = if jitter > 0.0 {
            rng.gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        input.set_held(snapshot.level + judgement > target);

        if let TickOutcome::Finished(result) = controller.poll()? {
            break *result;
        }
    };

    let stabilization = result
        .meta
        .stabilization_speed()
        .map_or("Stabilization unknown", |speed| speed.description());
    info!(
        "score {:.1} dB, {}, {}, {}",
        result.score.instantaneous,
        result.stability_label(),
        stabilization,
        result.prognosis().description()
    );
    emit_result(&result, output)?;

    if let Some(path) = telemetry_out {
        let mut streamed = 0usize;
        loop {
            match telemetry_rx.try_recv() {
                Ok(_) => streamed += 1,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("telemetry stream lagged, {skipped} events skipped")
                }
                Err(_) => break,
            }
        }
        let snapshot = telemetry::hub().snapshot();
        info!(
            "telemetry: {} events ({} streamed), {} reversals, {} debounced",
            snapshot.total_events,
            streamed,
            snapshot.counts.reversals,
            snapshot.counts.debounced_reversals
        );
        let json = serde_json::to_string_pretty(&snapshot).context("serializing telemetry")?;
        fs::write(&path, json).with_context(|| format!("writing telemetry to {}", path.display()))?;
    }
    Ok(ExitCode::from(0))
}

/// An explicit config path must exist and parse
fn load_config(path: &Path) -> Result<AppConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config {}", path.display()))?;
    config
        .tracking
        .validate()
        .with_context(|| format!("validating config {}", path.display()))?;
    info!("loaded configuration from {}", path.display());
    Ok(config)
}

fn run_compare(a: &Path, b: &Path) -> Result<ExitCode> {
    let result_a = read_result(a)?;
    let result_b = read_result(b)?;
    let report = compare_runs(&result_a, &result_b);

    let payload = ComparePayload {
        score_a: result_a.score.instantaneous,
        score_b: result_b.score.instantaneous,
        message: report.message(),
        report,
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(0))
}

fn read_result(path: &Path) -> Result<RunResult> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn emit_result(result: &RunResult, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparePayload {
    score_a: f64,
    score_b: f64,
    message: String,
    report: hant_tracker::SignificanceReport,
}
