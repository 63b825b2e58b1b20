// src/config/mod.rs
//! Pipeline configuration management

pub mod constants;
pub mod loader;
pub mod processing_config;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};
pub use processing_config::*;

use crate::error::{TgError, TgResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Complete pipeline configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub bands: BandsConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

/// Acquisition and windowing settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SignalConfig {
    #[serde(default = "defaults::sampling_rate_hz")]
    pub sampling_rate_hz: u32,

    #[serde(default = "defaults::channel_count")]
    pub channel_count: usize,

    #[serde(default = "defaults::window_seconds")]
    pub window_seconds: u32,

    #[serde(default = "defaults::tick_interval_ms")]
    pub tick_interval_ms: u32,
}

/// Theta and gamma band edges
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BandsConfig {
    #[serde(default = "defaults::theta")]
    pub theta: BandDefinition,

    #[serde(default = "defaults::gamma")]
    pub gamma: BandDefinition,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AggregationConfig {
    #[serde(default = "defaults::history_seconds")]
    pub history_seconds: f64,
}

/// Session recording settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RecordingConfig {
    #[serde(default = "defaults::recording_enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::recording_directory")]
    pub directory: PathBuf,

    #[serde(default = "defaults::save_interval_seconds")]
    pub save_interval_seconds: u32,
}

/// Default value providers using constants
mod defaults {
    use super::BandDefinition;
    use crate::config::constants::*;
    use std::path::PathBuf;

    pub fn sampling_rate_hz() -> u32 { signal::DEFAULT_SAMPLING_RATE_HZ }
    pub fn channel_count() -> usize { signal::DEFAULT_CHANNEL_COUNT }
    pub fn window_seconds() -> u32 { signal::DEFAULT_WINDOW_SECONDS }
    pub fn tick_interval_ms() -> u32 { signal::DEFAULT_TICK_INTERVAL_MS }

    pub fn theta() -> BandDefinition { BandDefinition::theta() }
    pub fn gamma() -> BandDefinition { BandDefinition::gamma() }

    pub fn history_seconds() -> f64 { aggregation::DEFAULT_HISTORY_SECONDS }

    pub fn recording_enabled() -> bool { false }
    pub fn recording_directory() -> PathBuf { PathBuf::from(recording::DEFAULT_DIRECTORY) }
    pub fn save_interval_seconds() -> u32 { recording::DEFAULT_SAVE_INTERVAL_SECONDS }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: defaults::sampling_rate_hz(),
            channel_count: defaults::channel_count(),
            window_seconds: defaults::window_seconds(),
            tick_interval_ms: defaults::tick_interval_ms(),
        }
    }
}

impl Default for BandsConfig {
    fn default() -> Self {
        Self {
            theta: defaults::theta(),
            gamma: defaults::gamma(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            history_seconds: defaults::history_seconds(),
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::recording_enabled(),
            directory: defaults::recording_directory(),
            save_interval_seconds: defaults::save_interval_seconds(),
        }
    }
}

impl SignalConfig {
    pub fn sample_rate(&self) -> f64 {
        self.sampling_rate_hz as f64
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate() / 2.0
    }

    /// Ring buffer capacity per channel
    pub fn window_capacity(&self) -> usize {
        self.sampling_rate_hz as usize * self.window_seconds as usize
    }

    /// Samples per channel delivered by one fixed-size replay tick
    pub fn samples_per_tick(&self) -> usize {
        ((self.sampling_rate_hz as u64 * self.tick_interval_ms as u64) / 1000).max(1) as usize
    }
}

/// Configuration utility functions
impl PipelineConfig {
    /// Validate configuration consistency, collecting every violation
    pub fn validate_consistency(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let s = &self.signal;

        if !signal::SUPPORTED_SAMPLING_RATES_HZ.contains(&s.sampling_rate_hz) {
            errors.push(format!(
                "Sampling rate {} Hz not supported (expected one of {:?})",
                s.sampling_rate_hz,
                signal::SUPPORTED_SAMPLING_RATES_HZ
            ));
        }
        if !signal::SUPPORTED_CHANNEL_COUNTS.contains(&s.channel_count) {
            errors.push(format!(
                "Channel count {} not supported (expected one of {:?})",
                s.channel_count,
                signal::SUPPORTED_CHANNEL_COUNTS
            ));
        }
        if !signal::SUPPORTED_WINDOW_SECONDS.contains(&s.window_seconds) {
            errors.push(format!(
                "Window of {} s not supported (expected one of {:?})",
                s.window_seconds,
                signal::SUPPORTED_WINDOW_SECONDS
            ));
        }
        if s.tick_interval_ms < signal::MIN_TICK_INTERVAL_MS || s.tick_interval_ms > signal::MAX_TICK_INTERVAL_MS {
            errors.push(format!(
                "Tick interval must be {}-{} ms, got {}",
                signal::MIN_TICK_INTERVAL_MS,
                signal::MAX_TICK_INTERVAL_MS,
                s.tick_interval_ms
            ));
        }

        for (name, band) in [("theta", &self.bands.theta), ("gamma", &self.bands.gamma)] {
            if !(band.low_hz > 0.0 && band.low_hz < band.high_hz) {
                errors.push(format!("{} band {} must satisfy 0 < low < high", name, band));
            } else if band.clamped_to(s.sample_rate()).is_none() {
                errors.push(format!(
                    "{} band {} is empty below {:.1} Hz at {} Hz sampling",
                    name,
                    band,
                    bands::MAX_EDGE_NYQUIST_FRACTION * s.nyquist_hz(),
                    s.sampling_rate_hz
                ));
            }
        }

        if let Err(reason) = validate_processing_config(&self.processing) {
            errors.push(reason);
        }

        let nyquist = s.nyquist_hz();
        if self.processing.filters.highpass_cutoff_hz >= nyquist {
            errors.push(format!(
                "Highpass cutoff ({} Hz) must be less than Nyquist frequency ({} Hz)",
                self.processing.filters.highpass_cutoff_hz, nyquist
            ));
        }
        let notch = &self.processing.filters.notch;
        if notch.enabled && notch.frequency_hz >= nyquist {
            errors.push(format!(
                "Notch filter frequency ({} Hz) must be less than Nyquist frequency ({} Hz)",
                notch.frequency_hz, nyquist
            ));
        }
        if self.processing.wavelet.min_frequency_hz >= nyquist {
            errors.push(format!(
                "Wavelet grid starts at {} Hz, at or above Nyquist ({} Hz)",
                self.processing.wavelet.min_frequency_hz, nyquist
            ));
        }

        if self.aggregation.history_seconds <= 0.0 {
            errors.push("History length must be positive".to_string());
        }
        if self.recording.save_interval_seconds == 0 {
            errors.push("Recording save interval must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and convert violations into a single configuration error
    pub fn validate(&self) -> TgResult<()> {
        self.validate_consistency()
            .map_err(|errors| TgError::configuration("pipeline", errors.join("; ")))
    }

    /// Theta and gamma bands as used for filter design and wavelet band rows.
    ///
    /// Upper edges at or above 0.95 x Nyquist are clamped with a warning.
    pub fn effective_bands(&self) -> TgResult<(BandDefinition, BandDefinition)> {
        let fs = self.signal.sample_rate();
        let clamp = |name: &str, band: &BandDefinition| -> TgResult<BandDefinition> {
            let clamped = band.clamped_to(fs).ok_or_else(|| {
                TgError::configuration(
                    "bands",
                    format!("{} band {} is empty at {} Hz sampling", name, band, fs),
                )
            })?;
            if clamped.high_hz < band.high_hz {
                warn!(
                    band = name,
                    requested_hz = band.high_hz,
                    clamped_hz = clamped.high_hz,
                    "Band upper edge clamped below Nyquist"
                );
            }
            Ok(clamped)
        };

        Ok((clamp("theta", &self.bands.theta)?, clamp("gamma", &self.bands.gamma)?))
    }

    /// Get configuration summary
    pub fn get_summary(&self) -> ConfigSummary {
        ConfigSummary {
            sampling_rate_hz: self.signal.sampling_rate_hz,
            channel_count: self.signal.channel_count,
            window_seconds: self.signal.window_seconds,
            tick_interval_ms: self.signal.tick_interval_ms,
            mode: self.processing.mode,
            window_capacity: self.signal.window_capacity(),
            recording: self.recording.enabled,
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub sampling_rate_hz: u32,
    pub channel_count: usize,
    pub window_seconds: u32,
    pub tick_interval_ms: u32,
    pub mode: ProcessingMode,
    pub window_capacity: usize,
    pub recording: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = PipelineConfig::default();
        assert_eq!(config.signal.sampling_rate_hz, signal::DEFAULT_SAMPLING_RATE_HZ);
        assert_eq!(config.signal.channel_count, signal::DEFAULT_CHANNEL_COUNT);
        assert_eq!(config.signal.window_capacity(), 2500);
        assert!(config.validate_consistency().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = PipelineConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: PipelineConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.signal.sampling_rate_hz, deserialized.signal.sampling_rate_hz);
        assert_eq!(config.bands.gamma, deserialized.bands.gamma);
        assert_eq!(config.processing.mode, deserialized.processing.mode);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [signal]
            sampling_rate_hz = 125

            [processing]
            mode = "butterworth"
            "#,
        )
        .unwrap();

        assert_eq!(config.signal.sampling_rate_hz, 125);
        assert_eq!(config.signal.channel_count, signal::DEFAULT_CHANNEL_COUNT);
        assert_eq!(config.processing.mode, ProcessingMode::TimeDomain);
        assert_eq!(config.processing.filters.bandpass_order, filters::DEFAULT_BANDPASS_ORDER);
    }

    #[test]
    fn test_config_validation_collects_all_errors() {
        let mut config = PipelineConfig::default();
        config.signal.sampling_rate_hz = 300;
        config.signal.channel_count = 6;
        config.signal.window_seconds = 7;

        let errors = config.validate_consistency().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_gamma_clamped_at_low_rate() {
        let mut config = PipelineConfig::default();
        config.signal.sampling_rate_hz = 125;
        assert!(config.validate_consistency().is_ok());

        let (theta, gamma) = config.effective_bands().unwrap();
        assert_eq!(theta, BandDefinition::theta());
        assert!((gamma.high_hz - 0.95 * 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_band_rejected() {
        let mut config = PipelineConfig::default();
        config.signal.sampling_rate_hz = 125;
        config.bands.gamma = BandDefinition::new(70.0, 100.0);

        assert!(config.validate_consistency().is_err());
        assert!(matches!(
            config.effective_bands(),
            Err(TgError::Configuration { .. })
        ));
    }

    #[test]
    fn test_inverted_band_rejected() {
        let mut config = PipelineConfig::default();
        config.bands.theta = BandDefinition::new(8.0, 4.0);
        assert!(config.validate_consistency().is_err());
    }

    #[test]
    fn test_samples_per_tick() {
        let config = PipelineConfig::default();
        assert_eq!(config.signal.samples_per_tick(), 20);
    }

    #[test]
    fn test_summary() {
        let summary = PipelineConfig::default().get_summary();
        assert_eq!(summary.window_capacity, 2500);
        assert_eq!(summary.mode, ProcessingMode::TimeFrequency);
        assert!(!summary.recording);
    }
}
