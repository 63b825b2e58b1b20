// src/processing/spectral.rs
//! FFT helpers: analytic signal and envelope

use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::sync::Arc;

/// Forward and inverse FFT plans for analytic signals of one length.
///
/// Built once per session for the full window length; shorter inputs (a
/// window that is still filling) are planned per call.
#[derive(Clone)]
pub struct AnalyticPlan {
    len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for AnalyticPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticPlan").field("len", &self.len).finish()
    }
}

impl AnalyticPlan {
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::<f64>::new();
        Self {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Analytic signal of `x` (one-sided spectrum doubled)
    pub fn analytic_signal(&self, x: &[f64]) -> Vec<Complex64> {
        if x.is_empty() {
            return Vec::new();
        }
        if x.len() != self.len {
            return AnalyticPlan::new(x.len()).analytic_signal(x);
        }

        let n = self.len;
        let mut buffer: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        self.forward.process(&mut buffer);

        let half = n / 2;
        for (k, bin) in buffer.iter_mut().enumerate() {
            let weight = if k == 0 || (n % 2 == 0 && k == half) {
                1.0
            } else if k < n.div_ceil(2) {
                2.0
            } else {
                0.0
            };
            *bin *= weight;
        }

        self.inverse.process(&mut buffer);
        let scale = 1.0 / n as f64;
        for bin in &mut buffer {
            *bin *= scale;
        }
        buffer
    }

    /// Instantaneous amplitude: magnitude of the analytic signal
    pub fn envelope(&self, x: &[f64]) -> Vec<f64> {
        self.analytic_signal(x).iter().map(|c| c.norm()).collect()
    }
}

/// Analytic signal of `x` via the FFT, planned for this call
pub fn analytic_signal(x: &[f64]) -> Vec<Complex64> {
    AnalyticPlan::new(x.len()).analytic_signal(x)
}

/// Instantaneous amplitude: magnitude of the analytic signal
pub fn envelope(x: &[f64]) -> Vec<f64> {
    analytic_signal(x).iter().map(|c| c.norm()).collect()
}

/// Single-sided amplitude spectrum, bins `0..=n/2`, with their frequencies
pub fn amplitude_spectrum(x: &[f64], sample_rate: f64) -> (Vec<f64>, Vec<f64>) {
    let n = x.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    fft.process(&mut buffer);

    let bins = n / 2 + 1;
    let frequencies = (0..bins).map(|k| k as f64 * sample_rate / n as f64).collect();
    let amplitudes = buffer
        .iter()
        .take(bins)
        .enumerate()
        .map(|(k, c)| {
            let one_sided = if k == 0 || (n % 2 == 0 && k == n / 2) { 1.0 } else { 2.0 };
            one_sided * c.norm() / n as f64
        })
        .collect();
    (frequencies, amplitudes)
}
