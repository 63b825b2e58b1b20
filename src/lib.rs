//! Theta-Gamma-Core: real-time theta/gamma band ratio estimation for EEG neurofeedback
//!
//! The crate turns multi-channel EEG samples into one control value per tick:
//! the median across channels of `theta / (theta + gamma)` band power.
//!
//! - Signal source abstraction with synthetic, replay and scripted sources
//! - Fixed-capacity per-channel rolling windows
//! - Zero-phase Butterworth filter bank with mains notch
//! - Two band estimators: band-pass + Hilbert envelope, or complex Morlet wavelet
//! - Median aggregation with a rolling ratio history
//! - Binary session recording and replay
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use theta_gamma_core::config::PipelineConfig;
//! use theta_gamma_core::hal::{SyntheticBoard, SyntheticConfig};
//! use theta_gamma_core::processing::{Orchestrator, TickOutcome};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default();
//!     let mut orchestrator = Orchestrator::new(config.clone())?;
//!     let mut state = orchestrator.new_state()?;
//!
//!     let mut board = SyntheticBoard::stepped(
//!         SyntheticConfig::default(),
//!         config.signal.channel_count,
//!         config.signal.samples_per_tick(),
//!     )?;
//!
//!     for _ in 0..200 {
//!         if let TickOutcome::Updated(output) = orchestrator.tick(&mut state, &mut board)? {
//!             println!("t={:.2}s ratio={:.3}", output.timestamp_s, output.global_ratio);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod processing;
pub mod recording;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{BandDefinition, PipelineConfig, ProcessingMode};
pub use error::{TgError, TgResult};
pub use hal::{SampleBatch, SignalSource, SourcePoll};
pub use processing::{
    compute_ratio, ChannelResult, Orchestrator, PipelineState, TickClock, TickOutcome, TickOutput,
};
pub use utils::time::{current_timestamp_nanos, TimeProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    let mut features = vec![
        "Zero-phase Butterworth filter bank".to_string(),
        "Complex Morlet wavelet analysis".to_string(),
        "Median channel aggregation".to_string(),
        "Session recording and replay".to_string(),
    ];
    if cfg!(feature = "parallel") {
        features.push("Parallel channel processing".to_string());
    }

    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Real-time theta/gamma band ratio estimation for EEG neurofeedback".to_string(),
        features,
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}
