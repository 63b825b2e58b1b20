// src/processing/filters/iir.rs
//! Butterworth IIR design as second-order sections

use super::{BandType, Biquad, SosFilter};
use crate::config::constants::filters::{HIGH_BAND_NYQUIST_FRACTION, HIGH_BAND_ORDER_CAP, MAX_FILTER_ORDER};
use crate::error::{TgError, TgResult};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;
use tracing::warn;

/// Imaginary parts below this are treated as real poles
const REAL_POLE_TOLERANCE: f64 = 1e-10;

/// Butterworth high-pass
pub fn butterworth_highpass(order: usize, cutoff_hz: f64, sample_rate: f64) -> TgResult<SosFilter> {
    validate_order(order)?;
    if !(cutoff_hz > 0.0 && cutoff_hz < sample_rate / 2.0) {
        return Err(TgError::configuration(
            "filters",
            format!("high-pass cutoff {} Hz outside (0, {}) Hz", cutoff_hz, sample_rate / 2.0),
        ));
    }

    let fs2 = 2.0 * sample_rate;
    let warped = prewarp(cutoff_hz, sample_rate);

    let z_poles: Vec<Complex64> = analog_prototype(order)
        .into_iter()
        .map(|p| bilinear(warped / p, fs2))
        .collect();

    let sections = group_sections(&z_poles, [1.0, -2.0, 1.0], [1.0, -1.0, 0.0]);
    let mut filter = SosFilter::new(sections, order, BandType::Highpass);
    filter.normalize_at(PI);
    Ok(filter)
}

/// Butterworth band-pass of prototype order `order` (the cascade has `order` sections)
pub fn butterworth_bandpass(order: usize, low_hz: f64, high_hz: f64, sample_rate: f64) -> TgResult<SosFilter> {
    validate_order(order)?;
    if !(low_hz > 0.0 && low_hz < high_hz && high_hz < sample_rate / 2.0) {
        return Err(TgError::configuration(
            "filters",
            format!(
                "band-pass edges {}-{} Hz invalid below Nyquist {} Hz",
                low_hz,
                high_hz,
                sample_rate / 2.0
            ),
        ));
    }

    let fs2 = 2.0 * sample_rate;
    let w1 = prewarp(low_hz, sample_rate);
    let w2 = prewarp(high_hz, sample_rate);
    let bw = w2 - w1;
    let w0 = (w1 * w2).sqrt();

    let mut z_poles = Vec::with_capacity(2 * order);
    for p in analog_prototype(order) {
        let pb = p * bw;
        let root = (pb * pb - 4.0 * w0 * w0).sqrt();
        z_poles.push(bilinear((pb + root) / 2.0, fs2));
        z_poles.push(bilinear((pb - root) / 2.0, fs2));
    }

    // Zeros at z = 1 and z = -1 in every section
    let sections = group_sections(&z_poles, [1.0, 0.0, -1.0], [1.0, 0.0, -1.0]);
    let mut filter = SosFilter::new(sections, order, BandType::Bandpass);
    filter.normalize_at(2.0 * (w0 / fs2).atan());
    Ok(filter)
}

/// Band-pass design with the order rules used by the filter bank.
///
/// Bands reaching above 0.6 x Nyquist are capped at order 3. An unstable
/// design is retried at decreasing order; order 1 failing is fatal.
pub fn stable_bandpass(order: usize, low_hz: f64, high_hz: f64, sample_rate: f64) -> TgResult<SosFilter> {
    let nyquist = sample_rate / 2.0;
    let mut effective = order;
    if high_hz > HIGH_BAND_NYQUIST_FRACTION * nyquist && effective > HIGH_BAND_ORDER_CAP {
        effective = HIGH_BAND_ORDER_CAP;
    }

    loop {
        let filter = butterworth_bandpass(effective, low_hz, high_hz, sample_rate)?;
        if filter.is_stable() {
            if effective != order {
                warn!(
                    low_hz,
                    high_hz,
                    requested = order,
                    effective,
                    "Band-pass order reduced"
                );
            }
            return Ok(filter);
        }

        if effective == 1 {
            return Err(TgError::FilterInstability {
                low_hz,
                high_hz,
                order: 1,
                reason: format!("pole radius {:.12} at order 1", filter.max_pole_radius()),
            });
        }

        warn!(
            low_hz,
            high_hz,
            order = effective,
            radius = filter.max_pole_radius(),
            "Unstable band-pass design, retrying at lower order"
        );
        effective -= 1;
    }
}

fn validate_order(order: usize) -> TgResult<()> {
    if order == 0 || order > MAX_FILTER_ORDER {
        return Err(TgError::configuration(
            "filters",
            format!("filter order must be 1-{}, got {}", MAX_FILTER_ORDER, order),
        ));
    }
    Ok(())
}

/// Analog frequency for the bilinear transform at `2 * fs`
fn prewarp(frequency_hz: f64, sample_rate: f64) -> f64 {
    2.0 * sample_rate * (PI * frequency_hz / sample_rate).tan()
}

/// Unit-cutoff Butterworth low-pass poles
fn analog_prototype(order: usize) -> Vec<Complex64> {
    let n = order as f64;
    (0..order)
        .map(|k| {
            let theta = PI * (2.0 * k as f64 + n + 1.0) / (2.0 * n);
            Complex64::from_polar(1.0, theta)
        })
        .collect()
}

fn bilinear(s: Complex64, fs2: f64) -> Complex64 {
    (fs2 + s) / (fs2 - s)
}

/// Build sections from z-plane poles.
///
/// Each conjugate pair becomes one section, real poles are paired up; an odd
/// real pole left over gets a first-order section.
fn group_sections(poles: &[Complex64], pair_numerator: [f64; 3], single_numerator: [f64; 3]) -> Vec<Biquad> {
    let mut sections = Vec::with_capacity(poles.len().div_ceil(2));
    let mut real_poles = Vec::new();

    for p in poles {
        if p.im > REAL_POLE_TOLERANCE {
            sections.push(Biquad::new(pair_numerator, [1.0, -2.0 * p.re, p.norm_sqr()]));
        } else if p.im.abs() <= REAL_POLE_TOLERANCE {
            real_poles.push(p.re);
        }
    }

    let mut pairs = real_poles.chunks_exact(2);
    for pair in &mut pairs {
        sections.push(Biquad::new(pair_numerator, [1.0, -(pair[0] + pair[1]), pair[0] * pair[1]]));
    }
    if let [r] = pairs.remainder() {
        sections.push(Biquad::new(single_numerator, [1.0, -r, 0.0]));
    }

    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gain_db(filter: &SosFilter, f: f64, fs: f64) -> f64 {
        20.0 * filter.response(f, fs).norm().log10()
    }

    #[test]
    fn test_highpass_shape() {
        let filter = butterworth_highpass(4, 0.5, 250.0).unwrap();
        assert_eq!(filter.sections().len(), 2);
        assert!(filter.is_stable());

        assert!(gain_db(&filter, 10.0, 250.0).abs() < 0.01);
        assert!((gain_db(&filter, 0.5, 250.0) + 3.01).abs() < 0.1);
        assert!(gain_db(&filter, 0.05, 250.0) < -60.0);
    }

    #[test]
    fn test_odd_order_highpass_has_first_order_section() {
        let filter = butterworth_highpass(3, 1.0, 250.0).unwrap();
        assert_eq!(filter.sections().len(), 2);
        assert!(filter.sections().iter().any(|s| s.a[2] == 0.0 && s.b[2] == 0.0));
        assert!(filter.is_stable());
    }

    #[test]
    fn test_bandpass_theta() {
        let filter = butterworth_bandpass(6, 4.0, 8.0, 250.0).unwrap();
        assert_eq!(filter.sections().len(), 6);
        assert!(filter.is_stable());

        // Unit gain at the geometric center, -3 dB at the edges
        assert!(gain_db(&filter, (4.0f64 * 8.0).sqrt(), 250.0).abs() < 0.05);
        assert!((gain_db(&filter, 4.0, 250.0) + 3.01).abs() < 0.2);
        assert!((gain_db(&filter, 8.0, 250.0) + 3.01).abs() < 0.2);
        assert!(gain_db(&filter, 40.0, 250.0) < -60.0);
        assert!(filter.response(0.0, 250.0).norm() < 1e-9);
    }

    #[test]
    fn test_bandpass_gamma_odd_order() {
        let filter = butterworth_bandpass(3, 30.0, 100.0, 250.0).unwrap();
        assert_eq!(filter.sections().len(), 3);
        assert!(filter.is_stable());
        assert!(gain_db(&filter, 6.0, 250.0) < -30.0);
    }

    #[test]
    fn test_stable_bandpass_caps_high_band() {
        let gamma = stable_bandpass(6, 30.0, 100.0, 250.0).unwrap();
        assert_eq!(gamma.order(), HIGH_BAND_ORDER_CAP);

        let theta = stable_bandpass(6, 4.0, 8.0, 250.0).unwrap();
        assert_eq!(theta.order(), 6);
    }

    #[test]
    fn test_invalid_designs_rejected() {
        assert!(butterworth_highpass(0, 0.5, 250.0).is_err());
        assert!(butterworth_highpass(4, 200.0, 250.0).is_err());
        assert!(butterworth_bandpass(4, 8.0, 4.0, 250.0).is_err());
        assert!(butterworth_bandpass(4, 30.0, 130.0, 250.0).is_err());
        assert!(butterworth_bandpass(MAX_FILTER_ORDER + 1, 4.0, 8.0, 250.0).is_err());
    }
}
