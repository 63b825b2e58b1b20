// src/processing/channel_processor.rs
//! Per-channel analysis: preprocess, estimate band powers, form the ratio

use crate::config::constants::aggregation::NEUTRAL_RATIO;
use crate::config::{DetailSelection, PipelineConfig, ProcessingMode};
use crate::error::{TgError, TgResult};
use crate::processing::features::{build_estimator, BandEstimate, BandEstimator, Spectrogram};
use crate::processing::filter_bank::Preprocessor;
use tracing::debug;

/// Theta share of the summed band power, in [0, 1]
///
/// Both powers at zero give exactly the neutral 0.5.
pub fn compute_ratio(theta_power: f64, gamma_power: f64, epsilon: f64) -> f64 {
    if !theta_power.is_finite() || !gamma_power.is_finite() {
        return NEUTRAL_RATIO;
    }
    let theta = theta_power.max(0.0);
    let gamma = gamma_power.max(0.0);
    if theta == 0.0 && gamma == 0.0 {
        return NEUTRAL_RATIO;
    }
    (theta / (theta + gamma + epsilon)).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Analyzed,
    /// Window not yet filled or unusable; the channel contributes a neutral ratio
    InsufficientData,
}

/// Envelopes and intermediate series kept for display
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDetail {
    pub theta_envelope: Vec<f64>,
    pub gamma_envelope: Vec<f64>,
    pub theta_filtered: Option<Vec<f64>>,
    pub gamma_filtered: Option<Vec<f64>>,
    pub spectrogram: Option<Spectrogram>,
}

impl From<BandEstimate> for ChannelDetail {
    fn from(estimate: BandEstimate) -> Self {
        Self {
            theta_envelope: estimate.theta.envelope,
            gamma_envelope: estimate.gamma.envelope,
            theta_filtered: estimate.theta.filtered,
            gamma_filtered: estimate.gamma.filtered,
            spectrogram: estimate.spectrogram,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelResult {
    pub channel: usize,
    pub theta_power: f64,
    pub gamma_power: f64,
    pub ratio: f64,
    pub status: ChannelStatus,
    pub detail: Option<ChannelDetail>,
}

impl ChannelResult {
    pub fn neutral(channel: usize) -> Self {
        Self {
            channel,
            theta_power: 0.0,
            gamma_power: 0.0,
            ratio: NEUTRAL_RATIO,
            status: ChannelStatus::InsufficientData,
            detail: None,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.status == ChannelStatus::Analyzed
    }
}

/// Analysis chain shared by every channel; filters and wavelet grid are
/// designed once in [`ChannelProcessor::new`]
pub struct ChannelProcessor {
    preprocessor: Preprocessor,
    estimator: Box<dyn BandEstimator>,
    window_capacity: usize,
    min_samples: usize,
    ratio_epsilon: f64,
    detail: DetailSelection,
}

impl std::fmt::Debug for ChannelProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelProcessor")
            .field("mode", &self.estimator.mode())
            .field("window_capacity", &self.window_capacity)
            .field("min_samples", &self.min_samples)
            .field("detail", &self.detail)
            .finish()
    }
}

impl ChannelProcessor {
    pub fn new(config: &PipelineConfig) -> TgResult<Self> {
        let sample_rate = config.signal.sample_rate();
        let (theta, gamma) = config.effective_bands()?;

        let window_capacity = config.signal.window_capacity();
        let preprocessor = Preprocessor::new(&config.processing.filters, sample_rate)?;
        let estimator = build_estimator(&config.processing, theta, gamma, sample_rate, window_capacity)?;

        let fill = config.processing.min_fill_ratio;
        if !(fill > 0.0 && fill <= 1.0) {
            return Err(TgError::configuration(
                "processing",
                format!("minimum fill ratio {} outside (0, 1]", fill),
            ));
        }
        // Zero-phase filtering needs at least 2 samples, whatever the ratio
        let min_samples = ((config.processing.min_fill_ratio * window_capacity as f64).ceil() as usize).max(2);

        Ok(Self {
            preprocessor,
            estimator,
            window_capacity,
            min_samples,
            ratio_epsilon: config.processing.ratio_epsilon,
            detail: config.processing.detail.clone(),
        })
    }

    pub fn mode(&self) -> ProcessingMode {
        self.estimator.mode()
    }

    /// Samples a window needs before it is analyzed
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn window_capacity(&self) -> usize {
        self.window_capacity
    }

    /// Analyze one chronological channel window.
    ///
    /// Short or non-finite windows come back neutral with
    /// [`ChannelStatus::InsufficientData`] instead of an error.
    pub fn process(&self, channel: usize, window: &[f64]) -> TgResult<ChannelResult> {
        match self.check_window(channel, window) {
            Ok(()) => {}
            Err(err @ (TgError::InsufficientData { .. } | TgError::InvalidData { .. })) => {
                debug!(channel, error = %err, "Channel contributes neutral ratio");
                return Ok(ChannelResult::neutral(channel));
            }
            Err(err) => return Err(err),
        }

        let cleaned = self.preprocessor.apply(window)?;
        let estimate = self.estimator.estimate(&cleaned)?;

        let theta_power = estimate.theta.power;
        let gamma_power = estimate.gamma.power;
        let ratio = compute_ratio(theta_power, gamma_power, self.ratio_epsilon);

        Ok(ChannelResult {
            channel,
            theta_power,
            gamma_power,
            ratio,
            status: ChannelStatus::Analyzed,
            detail: self.detail.includes(channel).then(|| ChannelDetail::from(estimate)),
        })
    }

    fn check_window(&self, channel: usize, window: &[f64]) -> TgResult<()> {
        if window.len() < self.min_samples {
            return Err(TgError::InsufficientData {
                channel,
                available: window.len(),
                required: self.min_samples,
            });
        }
        if let Some(index) = window.iter().position(|v| !v.is_finite()) {
            return Err(TgError::invalid_data(
                "channel window",
                format!("channel {} has a non-finite sample at {}", channel, index),
            ));
        }
        Ok(())
    }
}
