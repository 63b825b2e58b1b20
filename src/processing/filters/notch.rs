// src/processing/filters/notch.rs
//! Second-order notch for mains interference removal

use super::{BandType, Biquad, SosFilter};
use crate::error::{TgError, TgResult};
use std::f64::consts::PI;

/// Notch at `frequency_hz` with -3 dB bandwidth `frequency_hz / quality`.
///
/// The zeros sit on the unit circle, so the stopband centre is fully removed.
pub fn iir_notch(frequency_hz: f64, quality: f64, sample_rate: f64) -> TgResult<SosFilter> {
    let nyquist = sample_rate / 2.0;
    if !(frequency_hz > 0.0 && frequency_hz < nyquist) {
        return Err(TgError::configuration(
            "notch",
            format!("notch frequency {} Hz outside (0, {}) Hz", frequency_hz, nyquist),
        ));
    }
    if !(quality > 0.0) {
        return Err(TgError::configuration("notch", "quality factor must be positive"));
    }

    let w0 = PI * frequency_hz / nyquist;
    let bandwidth = w0 / quality;

    let beta = (bandwidth / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);
    let cos_w0 = w0.cos();

    let section = Biquad::new(
        [gain, -2.0 * gain * cos_w0, gain],
        [1.0, -2.0 * gain * cos_w0, 2.0 * gain - 1.0],
    );
    Ok(SosFilter::new(vec![section], 2, BandType::Bandstop))
}
