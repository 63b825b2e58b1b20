// src/config/processing_config.rs
//! Signal processing configuration structures

use crate::config::constants::{aggregation, bands, filters, wavelet};
use serde::{Deserialize, Serialize};

/// Estimator used by every channel for the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Butterworth band-pass + Hilbert envelope
    #[serde(alias = "butterworth")]
    TimeDomain,
    /// Complex Morlet wavelet decomposition
    #[serde(alias = "wavelet")]
    TimeFrequency,
}

impl ProcessingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::TimeDomain => "time_domain",
            ProcessingMode::TimeFrequency => "time_frequency",
        }
    }
}

impl std::fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "time_domain" | "time-domain" | "butterworth" => Ok(ProcessingMode::TimeDomain),
            "time_frequency" | "time-frequency" | "wavelet" => Ok(ProcessingMode::TimeFrequency),
            other => Err(format!("unknown processing mode '{}'", other)),
        }
    }
}

/// Closed frequency interval in Hz
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl BandDefinition {
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    pub const fn theta() -> Self {
        Self::new(bands::THETA_LOW_HZ, bands::THETA_HIGH_HZ)
    }

    pub const fn gamma() -> Self {
        Self::new(bands::GAMMA_LOW_HZ, bands::GAMMA_HIGH_HZ)
    }

    pub fn contains(&self, frequency_hz: f64) -> bool {
        frequency_hz >= self.low_hz && frequency_hz <= self.high_hz
    }

    pub fn width_hz(&self) -> f64 {
        self.high_hz - self.low_hz
    }

    /// Band usable for filter design at `sample_rate_hz`.
    ///
    /// The upper edge is clamped below Nyquist; `None` when nothing is left.
    pub fn clamped_to(&self, sample_rate_hz: f64) -> Option<BandDefinition> {
        let max_edge = bands::MAX_EDGE_NYQUIST_FRACTION * sample_rate_hz / 2.0;
        let high_hz = self.high_hz.min(max_edge);
        if self.low_hz > 0.0 && self.low_hz < high_hz {
            Some(BandDefinition::new(self.low_hz, high_hz))
        } else {
            None
        }
    }
}

impl std::fmt::Display for BandDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} Hz", self.low_hz, self.high_hz)
    }
}

/// Complete channel processing configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProcessingConfig {
    pub mode: ProcessingMode,
    /// Fraction of the analysis window that must be filled
    pub min_fill_ratio: f64,
    pub ratio_epsilon: f64,
    /// Process channels on the rayon pool (requires the `parallel` feature)
    pub parallel_channels: bool,
    pub detail: DetailSelection,
    pub filters: FilterConfig,
    pub wavelet: WaveletConfig,
}

/// Filter bank configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FilterConfig {
    pub highpass_cutoff_hz: f64,
    pub highpass_order: usize,
    pub bandpass_order: usize,
    pub notch: NotchConfig,
    pub smoothing: SmoothingConfig,
}

/// Mains interference notch
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NotchConfig {
    pub enabled: bool,
    pub frequency_hz: f64,
    pub quality: f64,
}

/// Savitzky-Golay smoothing appended to preprocessing
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SmoothingConfig {
    pub enabled: bool,
    pub window: usize,
    pub polynomial_order: usize,
}

/// Frequency grid spacing for the wavelet analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencySpacing {
    Linear,
    Logarithmic,
}

/// Wavelet analyzer configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WaveletConfig {
    pub min_frequency_hz: f64,
    pub max_frequency_hz: f64,
    pub frequency_count: usize,
    pub spacing: FrequencySpacing,
    pub bandwidth: f64,
    pub center_frequency: f64,
}

/// Which channels carry envelope / spectrogram detail in their results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailSelection {
    All,
    None,
    Channels(Vec<usize>),
}

impl DetailSelection {
    pub fn includes(&self, channel: usize) -> bool {
        match self {
            DetailSelection::All => true,
            DetailSelection::None => false,
            DetailSelection::Channels(channels) => channels.contains(&channel),
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::TimeFrequency,
            filters: FilterConfig::default(),
            wavelet: WaveletConfig::default(),
            min_fill_ratio: aggregation::DEFAULT_MIN_FILL_RATIO,
            ratio_epsilon: aggregation::DEFAULT_RATIO_EPSILON,
            parallel_channels: true,
            detail: DetailSelection::All,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            highpass_cutoff_hz: filters::DEFAULT_HIGHPASS_CUTOFF_HZ,
            highpass_order: filters::DEFAULT_HIGHPASS_ORDER,
            bandpass_order: filters::DEFAULT_BANDPASS_ORDER,
            notch: NotchConfig::default(),
            smoothing: SmoothingConfig::default(),
        }
    }
}

impl Default for NotchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency_hz: filters::DEFAULT_NOTCH_FREQUENCY_HZ,
            quality: filters::DEFAULT_NOTCH_QUALITY,
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        // Off by default: a 21-point cubic fit rolls off well inside the gamma band
        Self {
            enabled: false,
            window: filters::DEFAULT_SMOOTHING_WINDOW,
            polynomial_order: filters::DEFAULT_SMOOTHING_POLY_ORDER,
        }
    }
}

impl Default for WaveletConfig {
    fn default() -> Self {
        Self {
            min_frequency_hz: wavelet::DEFAULT_MIN_FREQUENCY_HZ,
            max_frequency_hz: wavelet::DEFAULT_MAX_FREQUENCY_HZ,
            frequency_count: wavelet::DEFAULT_FREQUENCY_COUNT,
            spacing: FrequencySpacing::Logarithmic,
            bandwidth: wavelet::DEFAULT_BANDWIDTH,
            center_frequency: wavelet::DEFAULT_CENTER_FREQUENCY,
        }
    }
}

/// Validate processing configuration on its own (no sampling rate context)
pub fn validate_processing_config(config: &ProcessingConfig) -> Result<(), String> {
    let f = &config.filters;
    if f.highpass_cutoff_hz <= 0.0 {
        return Err("Highpass cutoff frequency must be positive".to_string());
    }
    if f.highpass_order == 0 || f.highpass_order > filters::MAX_FILTER_ORDER {
        return Err(format!("Highpass order must be 1-{}", filters::MAX_FILTER_ORDER));
    }
    if f.bandpass_order == 0 || f.bandpass_order > filters::MAX_FILTER_ORDER {
        return Err(format!("Bandpass order must be 1-{}", filters::MAX_FILTER_ORDER));
    }

    if f.notch.enabled && (f.notch.frequency_hz <= 0.0 || f.notch.quality <= 0.0) {
        return Err("Notch frequency and quality must be positive".to_string());
    }

    if f.smoothing.enabled {
        if f.smoothing.window % 2 == 0 || f.smoothing.window < 3 {
            return Err("Smoothing window must be odd and at least 3".to_string());
        }
        if f.smoothing.polynomial_order >= f.smoothing.window {
            return Err("Smoothing polynomial order must be below the window length".to_string());
        }
    }

    let w = &config.wavelet;
    if w.min_frequency_hz <= 0.0 || w.max_frequency_hz <= w.min_frequency_hz {
        return Err("Wavelet frequency range must be positive and increasing".to_string());
    }
    if w.frequency_count < wavelet::MIN_FREQUENCY_COUNT || w.frequency_count > wavelet::MAX_FREQUENCY_COUNT {
        return Err(format!(
            "Wavelet frequency count must be {}-{}",
            wavelet::MIN_FREQUENCY_COUNT,
            wavelet::MAX_FREQUENCY_COUNT
        ));
    }
    if w.bandwidth <= 0.0 || w.center_frequency <= 0.0 {
        return Err("Wavelet bandwidth and center frequency must be positive".to_string());
    }

    if !(config.min_fill_ratio > 0.0 && config.min_fill_ratio <= 1.0) {
        return Err("Minimum fill ratio must be in (0, 1]".to_string());
    }
    if config.ratio_epsilon <= 0.0 {
        return Err("Ratio epsilon must be positive".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ProcessingConfig::default();
        assert!(validate_processing_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_filter_config() {
        let mut config = ProcessingConfig::default();
        config.filters.highpass_cutoff_hz = 0.0;
        assert!(validate_processing_config(&config).is_err());

        let mut config = ProcessingConfig::default();
        config.filters.bandpass_order = 0;
        assert!(validate_processing_config(&config).is_err());
    }

    #[test]
    fn test_invalid_smoothing_config() {
        let mut config = ProcessingConfig::default();
        config.filters.smoothing.enabled = true;
        config.filters.smoothing.window = 20;
        assert!(validate_processing_config(&config).is_err());

        config.filters.smoothing.window = 5;
        config.filters.smoothing.polynomial_order = 5;
        assert!(validate_processing_config(&config).is_err());
    }

    #[test]
    fn test_mode_aliases() {
        let mode: ProcessingMode = toml::Value::String("wavelet".into()).try_into().unwrap();
        assert_eq!(mode, ProcessingMode::TimeFrequency);
        assert_eq!("butterworth".parse::<ProcessingMode>().unwrap(), ProcessingMode::TimeDomain);
        assert!("fourier".parse::<ProcessingMode>().is_err());
    }

    #[test]
    fn test_band_clamping() {
        let gamma = BandDefinition::gamma();
        assert_eq!(gamma.clamped_to(250.0), Some(gamma));

        let clamped = gamma.clamped_to(125.0).unwrap();
        assert!(clamped.high_hz < 62.5);
        assert_eq!(clamped.low_hz, 30.0);

        assert!(BandDefinition::new(70.0, 100.0).clamped_to(125.0).is_none());
    }

    #[test]
    fn test_detail_selection() {
        assert!(DetailSelection::All.includes(7));
        assert!(!DetailSelection::None.includes(0));
        assert!(DetailSelection::Channels(vec![2]).includes(2));
        assert!(!DetailSelection::Channels(vec![2]).includes(3));
    }

    #[test]
    fn test_config_serialization() {
        let config = ProcessingConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: ProcessingConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.mode, deserialized.mode);
        assert_eq!(config.filters.highpass_cutoff_hz, deserialized.filters.highpass_cutoff_hz);
        assert_eq!(config.wavelet.frequency_count, deserialized.wavelet.frequency_count);
    }
}
