//! tg-feedback: command line front-end for the theta/gamma pipeline
//!
//! # Usage
//!
//! ```bash
//! # 30 s of synthetic theta-dominant signal, printing the ratio once per second
//! tg-feedback simulate --seconds 30
//!
//! # Same, recorded to a session file
//! tg-feedback simulate --seconds 60 --record session.tgs
//!
//! # Replay a recorded session tick by tick
//! tg-feedback replay session.tgs
//!
//! # Print or export the effective configuration
//! tg-feedback config --export effective.toml
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use theta_gamma_core::config::{ConfigLoader, PipelineConfig, ProcessingMode};
use theta_gamma_core::hal::{ReplaySource, SignalSource, SineComponent, SyntheticBoard, SyntheticConfig};
use theta_gamma_core::processing::{Orchestrator, TickClock, TickOutcome, TickOutput};
use theta_gamma_core::utils::MonotonicTimeProvider;
use theta_gamma_core::recording::{SessionHeader, SessionRecorder};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "tg-feedback")]
#[command(author, version, about = "Theta/gamma neurofeedback pipeline", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (defaults and environment overrides still apply)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the synthetic board through the pipeline
    Simulate {
        /// Seconds of signal to process
        #[arg(short, long, default_value = "30")]
        seconds: u32,

        /// Record the session to this file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Estimator: time_domain or time_frequency
        #[arg(short, long)]
        mode: Option<ProcessingMode>,

        /// Pace ticks with the wall clock and a generator thread
        #[arg(long)]
        realtime: bool,

        /// Gamma tone amplitude in µV next to the 20 µV theta tone
        #[arg(long, default_value = "5.0")]
        gamma_uv: f64,

        /// Add 50 Hz mains hum of this amplitude in µV
        #[arg(long)]
        hum_uv: Option<f64>,
    },

    /// Replay a recorded session
    Replay {
        path: PathBuf,

        /// Tick interval in milliseconds (defaults to the configured one)
        #[arg(long)]
        tick_ms: Option<u32>,
    },

    /// Print the effective configuration
    Config {
        /// Write it to this file instead
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("tg-feedback v{}", env!("CARGO_PKG_VERSION"));

    let mut loader = match &cli.config {
        Some(path) => ConfigLoader::with_paths(vec![path.clone()]),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("loading configuration")?;

    match cli.command {
        Commands::Simulate {
            seconds,
            record,
            mode,
            realtime,
            gamma_uv,
            hum_uv,
        } => {
            let mut config = config;
            if let Some(mode) = mode {
                config.processing.mode = mode;
            }
            let board = SyntheticConfig {
                sampling_rate_hz: config.signal.sampling_rate_hz,
                board_channels: config.signal.channel_count,
                components: vec![SineComponent::new(6.0, 20.0), SineComponent::new(40.0, gamma_uv)],
                mains_hum: hum_uv.map(|uv| SineComponent::new(50.0, uv)),
                ..Default::default()
            };
            run_simulation(config, board, seconds, record, realtime)
        }
        Commands::Replay { path, tick_ms } => run_replay(config, path, tick_ms),
        Commands::Config { export } => match export {
            Some(path) => {
                loader.export_config(&path)?;
                info!(path = %path.display(), "Configuration exported");
                Ok(())
            }
            None => {
                println!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        },
    }
}

fn run_simulation(
    config: PipelineConfig,
    board: SyntheticConfig,
    seconds: u32,
    record: Option<PathBuf>,
    realtime: bool,
) -> anyhow::Result<()> {
    let tick = Duration::from_millis(config.signal.tick_interval_ms as u64);
    let ticks_per_second = (1000 / config.signal.tick_interval_ms).max(1) as u64;

    let mut orchestrator = Orchestrator::new(config.clone())?;
    if realtime {
        orchestrator = orchestrator.with_clock(TickClock::Wall(Arc::new(MonotonicTimeProvider::new())));
    }
    let mut state = orchestrator.new_state()?;
    if let Some(path) = record {
        orchestrator.attach_recorder(SessionRecorder::new(
            path,
            SessionHeader::from_config(&config),
            config.recording.save_interval_seconds,
        ));
    } else if config.recording.enabled {
        orchestrator.attach_recorder(SessionRecorder::for_config(&config));
    }

    let channels = config.signal.channel_count;
    let mut source = if realtime {
        SyntheticBoard::realtime(board, channels)?
    } else {
        SyntheticBoard::stepped(board, channels, config.signal.samples_per_tick())?
    };
    orchestrator.check_source(&source.info())?;

    let target_samples = seconds as u64 * config.signal.sampling_rate_hz as u64;
    let started = Instant::now();
    let mut updates = 0u64;
    while state.samples_ingested() < target_samples {
        if let TickOutcome::Updated(output) = orchestrator.tick(&mut state, &mut source)? {
            updates += 1;
            if updates % ticks_per_second == 0 {
                print_tick(&output);
            }
        }
        if realtime {
            std::thread::sleep(tick);
        }
    }

    source.stop();
    orchestrator.finish()?;
    if let Some(recorder) = orchestrator.recorder() {
        info!(path = %recorder.path().display(), "Session recorded");
    }
    info!(
        ticks = state.tick_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Simulation complete"
    );
    Ok(())
}

fn run_replay(mut config: PipelineConfig, path: PathBuf, tick_ms: Option<u32>) -> anyhow::Result<()> {
    let tick_ms = tick_ms.unwrap_or(config.signal.tick_interval_ms);
    let mut source = ReplaySource::open(&path, tick_ms)?;

    let header = source.header().clone();
    config.signal.sampling_rate_hz = header.sampling_rate_hz;
    config.signal.channel_count = header.channel_count;
    config.signal.window_seconds = header.window_seconds;
    config.signal.tick_interval_ms = tick_ms;
    config.processing.mode = header.mode;
    config.bands.theta = header.theta_band;
    config.bands.gamma = header.gamma_band;

    let mut orchestrator = Orchestrator::new(config)?;
    let mut state = orchestrator.new_state()?;
    orchestrator.check_source(&source.info())?;

    loop {
        match orchestrator.tick(&mut state, &mut source)? {
            TickOutcome::Updated(output) => print_tick(&output),
            TickOutcome::Idle => {}
            TickOutcome::Complete => break,
        }
    }

    info!(ticks = state.tick_count(), "Replay complete");
    Ok(())
}

fn print_tick(output: &TickOutput) {
    println!(
        "tick {:>6}  t={:>8.2}s  ratio={:.4}  channels={}/{}",
        output.tick,
        output.timestamp_s,
        output.global_ratio,
        output.analyzed_channels(),
        output.channels.len()
    );
}
