// src/processing/filter_bank.rs
//! Filter bank: preprocessing chain, band extraction and envelopes
//!
//! The free functions design and apply a filter in one call. [`Preprocessor`]
//! and [`BandFilter`] design once at session start and are what the channel
//! processor and the time-domain estimator hold.

use crate::config::constants::filters::GAIN_CHECK_POINTS;
use crate::config::{BandDefinition, FilterConfig};
use crate::error::TgResult;
use crate::processing::filters::{
    butterworth_highpass, iir_notch, savgol_smooth, sosfiltfilt, stable_bandpass, SosFilter,
};
use crate::processing::spectral;
use crate::utils::stats::median;
use tracing::debug;

/// Zero-phase Butterworth high-pass
pub fn high_pass(x: &[f64], cutoff_hz: f64, order: usize, sample_rate: f64) -> TgResult<Vec<f64>> {
    let filter = butterworth_highpass(order, cutoff_hz, sample_rate)?;
    Ok(sosfiltfilt(filter.sections(), x))
}

/// Zero-phase Butterworth band-pass, order capped for bands near Nyquist
pub fn band_pass(x: &[f64], low_hz: f64, high_hz: f64, order: usize, sample_rate: f64) -> TgResult<Vec<f64>> {
    let filter = stable_bandpass(order, low_hz, high_hz, sample_rate)?;
    Ok(sosfiltfilt(filter.sections(), x))
}

/// Zero-phase mains notch
pub fn notch(x: &[f64], frequency_hz: f64, quality: f64, sample_rate: f64) -> TgResult<Vec<f64>> {
    let filter = iir_notch(frequency_hz, quality, sample_rate)?;
    Ok(sosfiltfilt(filter.sections(), x))
}

/// Savitzky-Golay smoothing; input shorter than the window is returned as is
pub fn smooth(x: &[f64], window: usize, polynomial_order: usize) -> TgResult<Vec<f64>> {
    savgol_smooth(x, window, polynomial_order)
}

/// Default preprocessing chain: 0.5 Hz high-pass then 50 Hz notch
pub fn preprocess(x: &[f64], sample_rate: f64) -> TgResult<Vec<f64>> {
    Preprocessor::new(&FilterConfig::default(), sample_rate)?.apply(x)
}

/// Instantaneous amplitude of the whole window
pub fn envelope(x: &[f64]) -> Vec<f64> {
    spectral::envelope(x)
}

/// Median forward-backward gain in dB of the band-pass design across `[low, high]`
pub fn check_band_gain(low_hz: f64, high_hz: f64, order: usize, sample_rate: f64) -> TgResult<f64> {
    let filter = stable_bandpass(order, low_hz, high_hz, sample_rate)?;
    Ok(passband_gain_db(&filter, low_hz, high_hz, sample_rate))
}

fn passband_gain_db(filter: &SosFilter, low_hz: f64, high_hz: f64, sample_rate: f64) -> f64 {
    let step = (high_hz - low_hz) / (GAIN_CHECK_POINTS - 1) as f64;
    let gains: Vec<f64> = (0..GAIN_CHECK_POINTS)
        .map(|i| filter.zero_phase_gain_db(low_hz + step * i as f64, sample_rate))
        .collect();
    median(&gains).unwrap_or(0.0)
}

/// High-pass + notch (+ optional smoothing), designed once
#[derive(Debug, Clone)]
pub struct Preprocessor {
    highpass: SosFilter,
    notch: Option<SosFilter>,
    smoothing: Option<(usize, usize)>,
}

impl Preprocessor {
    pub fn new(config: &FilterConfig, sample_rate: f64) -> TgResult<Self> {
        let highpass = butterworth_highpass(config.highpass_order, config.highpass_cutoff_hz, sample_rate)?;
        let notch = if config.notch.enabled {
            Some(iir_notch(config.notch.frequency_hz, config.notch.quality, sample_rate)?)
        } else {
            None
        };
        let smoothing = config
            .smoothing
            .enabled
            .then_some((config.smoothing.window, config.smoothing.polynomial_order));

        Ok(Self {
            highpass,
            notch,
            smoothing,
        })
    }

    pub fn apply(&self, x: &[f64]) -> TgResult<Vec<f64>> {
        let mut y = sosfiltfilt(self.highpass.sections(), x);
        if let Some(notch) = &self.notch {
            y = sosfiltfilt(notch.sections(), &y);
        }
        if let Some((window, order)) = self.smoothing {
            y = savgol_smooth(&y, window, order)?;
        }
        Ok(y)
    }

    pub fn has_notch(&self) -> bool {
        self.notch.is_some()
    }
}

/// Band-pass design with its passband gain correction
#[derive(Debug, Clone)]
pub struct BandFilter {
    band: BandDefinition,
    filter: SosFilter,
    gain_db: f64,
    amplitude_correction: f64,
}

impl BandFilter {
    pub fn new(band: BandDefinition, order: usize, sample_rate: f64) -> TgResult<Self> {
        let filter = stable_bandpass(order, band.low_hz, band.high_hz, sample_rate)?;
        let gain_db = passband_gain_db(&filter, band.low_hz, band.high_hz, sample_rate);
        let amplitude_correction = 10f64.powf(gain_db / 20.0);

        debug!(
            band = %band,
            order = filter.order(),
            gain_db,
            "Band-pass designed"
        );

        Ok(Self {
            band,
            filter,
            gain_db,
            amplitude_correction,
        })
    }

    /// Zero-phase band-pass divided by the median passband gain
    pub fn apply(&self, x: &[f64]) -> Vec<f64> {
        let mut y = sosfiltfilt(self.filter.sections(), x);
        for v in &mut y {
            *v /= self.amplitude_correction;
        }
        y
    }

    pub fn band(&self) -> BandDefinition {
        self.band
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    pub fn order(&self) -> usize {
        self.filter.order()
    }
}
