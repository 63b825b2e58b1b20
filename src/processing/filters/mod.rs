// src/processing/filters/mod.rs
//! Digital filters for EEG signal processing
//!
//! Every IIR design is stored as cascaded second-order sections and applied
//! zero-phase (forward-backward), so band envelopes stay aligned in time with
//! the raw window.

pub mod iir;
pub mod notch;
pub mod savgol;
pub mod zero_phase;

pub use iir::*;
pub use notch::*;
pub use savgol::*;
pub use zero_phase::*;

use crate::config::constants::filters::MAX_POLE_RADIUS;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandType {
    Highpass,
    Bandpass,
    Bandstop,
}

/// One second-order section, `a[0]` normalized to 1.
///
/// First-order sections carry `b[2] == a[2] == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    pub const fn new(b: [f64; 3], a: [f64; 3]) -> Self {
        Self { b, a }
    }

    /// Complex response at `omega` radians/sample
    pub fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let den = self.a[0] + z1 * self.a[1] + z2 * self.a[2];
        num / den
    }

    /// Roots of `z^2 + a1 z + a2`
    pub fn poles(&self) -> [Complex64; 2] {
        let a1 = Complex64::new(self.a[1], 0.0);
        let a2 = Complex64::new(self.a[2], 0.0);
        let disc = (a1 * a1 - a2 * 4.0).sqrt();
        [(-a1 + disc) / 2.0, (-a1 - disc) / 2.0]
    }

    /// Gain at DC
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    pub fn is_finite(&self) -> bool {
        self.b.iter().chain(self.a.iter()).all(|c| c.is_finite())
    }

    fn scale_numerator(&mut self, k: f64) {
        for b in &mut self.b {
            *b *= k;
        }
    }
}

/// Cascade of second-order sections with the order it was designed at
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    sections: Vec<Biquad>,
    order: usize,
    band_type: BandType,
}

impl SosFilter {
    pub fn new(sections: Vec<Biquad>, order: usize, band_type: BandType) -> Self {
        Self {
            sections,
            order,
            band_type,
        }
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn band_type(&self) -> BandType {
        self.band_type
    }

    /// Complex response of the cascade at `frequency_hz`
    pub fn response(&self, frequency_hz: f64, sample_rate: f64) -> Complex64 {
        let omega = 2.0 * PI * frequency_hz / sample_rate;
        self.response_at(omega)
    }

    pub(crate) fn response_at(&self, omega: f64) -> Complex64 {
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(omega))
    }

    /// Amplitude gain of a forward-backward pass, `|H(f)|^2`, in dB
    pub fn zero_phase_gain_db(&self, frequency_hz: f64, sample_rate: f64) -> f64 {
        let gain = self.response(frequency_hz, sample_rate).norm_sqr();
        20.0 * gain.max(f64::MIN_POSITIVE).log10()
    }

    /// All poles strictly inside the unit circle and coefficients finite
    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(|s| {
            s.is_finite()
                && s.poles()
                    .iter()
                    .all(|p| p.is_finite() && p.norm() < MAX_POLE_RADIUS)
        })
    }

    pub fn max_pole_radius(&self) -> f64 {
        self.sections
            .iter()
            .flat_map(|s| s.poles())
            .map(|p| p.norm())
            .fold(0.0, f64::max)
    }

    /// Scale the overall gain so that `|H(omega)| == 1`, spread evenly over sections
    pub(crate) fn normalize_at(&mut self, omega: f64) {
        let magnitude = self.response_at(omega).norm();
        if !(magnitude.is_finite() && magnitude > 0.0) || self.sections.is_empty() {
            return;
        }
        let per_section = magnitude.recip().powf(1.0 / self.sections.len() as f64);
        for section in &mut self.sections {
            section.scale_numerator(per_section);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_biquad_identity_response() {
        let identity = Biquad::new([1.0, 0.0, 0.0], [1.0, 0.0, 0.0]);
        let h = identity.response(1.3);
        assert!((h.re - 1.0).abs() < 1e-12 && h.im.abs() < 1e-12);
        assert_eq!(identity.dc_gain(), 1.0);
    }

    #[test]
    fn test_biquad_poles() {
        // (z - 0.5)(z - 0.25) = z^2 - 0.75 z + 0.125
        let section = Biquad::new([1.0, 0.0, 0.0], [1.0, -0.75, 0.125]);
        let mut radii: Vec<f64> = section.poles().iter().map(|p| p.norm()).collect();
        radii.sort_by(f64::total_cmp);
        assert!((radii[0] - 0.25).abs() < 1e-12);
        assert!((radii[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unstable_section_detected() {
        let filter = SosFilter::new(
            vec![Biquad::new([1.0, 0.0, 0.0], [1.0, -2.1, 1.1])],
            2,
            BandType::Bandpass,
        );
        assert!(!filter.is_stable());
        assert!(filter.max_pole_radius() > 1.0);
    }

    #[test]
    fn test_normalize_at_dc() {
        let mut filter = SosFilter::new(
            vec![Biquad::new([1.0, 1.0, 0.0], [1.0, -0.5, 0.0])],
            1,
            BandType::Highpass,
        );
        filter.normalize_at(0.0);
        assert!((filter.response_at(0.0).norm() - 1.0).abs() < 1e-12);
    }
}
