// src/processing/features/mod.rs
//! Band power estimation strategies
//!
//! Two estimators produce the same [`BandEstimate`] from a preprocessed
//! channel window:
//! - [`TimeDomainEstimator`]: zero-phase Butterworth band-pass, gain
//!   correction, Hilbert envelope, power = mean(envelope^2)
//! - [`TimeFrequencyEstimator`]: one Morlet transform, envelope and power
//!   read from the rows inside each band

pub mod wavelets;

use crate::config::{BandDefinition, ProcessingConfig, ProcessingMode};
use crate::error::{TgError, TgResult};
use crate::processing::filter_bank::BandFilter;
use crate::processing::spectral::AnalyticPlan;
use crate::utils::stats::mean_square;

pub use wavelets::{frequency_grid, Spectrogram, WaveletAnalyzer};

/// Power and envelope of one band over one window
#[derive(Debug, Clone, PartialEq)]
pub struct BandSeries {
    pub power: f64,
    pub envelope: Vec<f64>,
    /// Band-filtered signal (time-domain estimator only)
    pub filtered: Option<Vec<f64>>,
}

/// Estimator output for one channel window
#[derive(Debug, Clone, PartialEq)]
pub struct BandEstimate {
    pub theta: BandSeries,
    pub gamma: BandSeries,
    pub spectrogram: Option<Spectrogram>,
}

/// Strategy computing theta and gamma band series from a preprocessed window
pub trait BandEstimator: Send + Sync {
    fn mode(&self) -> ProcessingMode;

    fn estimate(&self, window: &[f64]) -> TgResult<BandEstimate>;
}

/// Build the estimator selected by `config.mode`; bands must already be clamped.
///
/// FFT plans are sized for `window_capacity`, the length of a full channel window.
pub fn build_estimator(
    config: &ProcessingConfig,
    theta: BandDefinition,
    gamma: BandDefinition,
    sample_rate: f64,
    window_capacity: usize,
) -> TgResult<Box<dyn BandEstimator>> {
    Ok(match config.mode {
        ProcessingMode::TimeDomain => Box::new(TimeDomainEstimator::new(
            BandFilter::new(theta, config.filters.bandpass_order, sample_rate)?,
            BandFilter::new(gamma, config.filters.bandpass_order, sample_rate)?,
            window_capacity,
        )),
        ProcessingMode::TimeFrequency => Box::new(TimeFrequencyEstimator::new(
            WaveletAnalyzer::new(&config.wavelet, sample_rate, window_capacity)?,
            theta,
            gamma,
        )?),
    })
}

/// Butterworth band-pass followed by the Hilbert envelope
#[derive(Debug, Clone)]
pub struct TimeDomainEstimator {
    theta: BandFilter,
    gamma: BandFilter,
    hilbert: AnalyticPlan,
}

impl TimeDomainEstimator {
    pub fn new(theta: BandFilter, gamma: BandFilter, window_capacity: usize) -> Self {
        Self {
            theta,
            gamma,
            hilbert: AnalyticPlan::new(window_capacity),
        }
    }

    pub fn theta_filter(&self) -> &BandFilter {
        &self.theta
    }

    pub fn gamma_filter(&self) -> &BandFilter {
        &self.gamma
    }

    /// Length the envelope FFTs are planned for
    pub fn window_capacity(&self) -> usize {
        self.hilbert.len()
    }

    fn band_series(&self, filter: &BandFilter, window: &[f64]) -> BandSeries {
        let filtered = filter.apply(window);
        let envelope = self.hilbert.envelope(&filtered);
        BandSeries {
            power: mean_square(&envelope).unwrap_or(0.0),
            envelope,
            filtered: Some(filtered),
        }
    }
}

impl BandEstimator for TimeDomainEstimator {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::TimeDomain
    }

    fn estimate(&self, window: &[f64]) -> TgResult<BandEstimate> {
        Ok(BandEstimate {
            theta: self.band_series(&self.theta, window),
            gamma: self.band_series(&self.gamma, window),
            spectrogram: None,
        })
    }
}

/// Morlet spectrogram read out per band
#[derive(Debug)]
pub struct TimeFrequencyEstimator {
    analyzer: WaveletAnalyzer,
    theta: BandDefinition,
    gamma: BandDefinition,
}

impl TimeFrequencyEstimator {
    /// Fails when either band has no row on the analyzer's grid
    pub fn new(analyzer: WaveletAnalyzer, theta: BandDefinition, gamma: BandDefinition) -> TgResult<Self> {
        for (name, band) in [("theta", &theta), ("gamma", &gamma)] {
            if analyzer.rows_in(band) == 0 {
                return Err(TgError::configuration(
                    "wavelet",
                    format!("{} band {} has no frequency on the wavelet grid", name, band),
                ));
            }
        }

        Ok(Self {
            analyzer,
            theta,
            gamma,
        })
    }

    pub fn analyzer(&self) -> &WaveletAnalyzer {
        &self.analyzer
    }

    fn band_series(spectrogram: &Spectrogram, band: &BandDefinition) -> BandSeries {
        BandSeries {
            power: spectrogram.band_power(band),
            envelope: spectrogram.band_envelope(band),
            filtered: None,
        }
    }
}

impl BandEstimator for TimeFrequencyEstimator {
    fn mode(&self) -> ProcessingMode {
        ProcessingMode::TimeFrequency
    }

    fn estimate(&self, window: &[f64]) -> TgResult<BandEstimate> {
        let spectrogram = self.analyzer.transform(window);
        Ok(BandEstimate {
            theta: Self::band_series(&spectrogram, &self.theta),
            gamma: Self::band_series(&spectrogram, &self.gamma),
            spectrogram: Some(spectrogram),
        })
    }
}
