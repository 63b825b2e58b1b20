// src/processing/features/wavelets.rs
//! Complex Morlet continuous wavelet transform
//!
//! The mother wavelet is `psi(t) = exp(-t^2 / B) * exp(j 2 pi C t)`. Each
//! frequency row uses scale `s = C * fs / f` (in samples) and a kernel
//! normalized by `1 / s`, so that a sinusoid of amplitude `A` shows up with
//! power close to `A^2` in the row matching its frequency, whatever the scale.
//!
//! Rows are computed in the frequency domain: one forward FFT of the
//! zero-padded window, then one inverse FFT per row after multiplying by the
//! analytic kernel spectrum `2 * exp(-pi^2 * B * (s * nu - C)^2)`.

use crate::config::constants::wavelet::KERNEL_SUPPORT;
use crate::config::{BandDefinition, FrequencySpacing, WaveletConfig};
use crate::error::{TgError, TgResult};
use crate::utils::stats::percentile;
use ndarray::{Array2, Axis};
use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::debug;

/// Time-frequency power of one channel window
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    pub frequencies_hz: Vec<f64>,
    /// Power, frequency rows x time columns
    pub power: Array2<f64>,
}

impl Spectrogram {
    pub fn n_frequencies(&self) -> usize {
        self.power.nrows()
    }

    pub fn n_times(&self) -> usize {
        self.power.ncols()
    }

    /// Row indices whose frequency lies in `band` (inclusive)
    pub fn band_rows(&self, band: &BandDefinition) -> Vec<usize> {
        self.frequencies_hz
            .iter()
            .enumerate()
            .filter(|(_, f)| band.contains(**f))
            .map(|(i, _)| i)
            .collect()
    }

    /// Root mean square across the band's rows, per time step
    pub fn band_envelope(&self, band: &BandDefinition) -> Vec<f64> {
        let rows = self.band_rows(band);
        if rows.is_empty() {
            return vec![0.0; self.n_times()];
        }

        let selected = self.power.select(Axis(0), &rows);
        selected
            .mean_axis(Axis(0))
            .map(|mean| mean.iter().map(|p| p.sqrt()).collect())
            .unwrap_or_else(|| vec![0.0; self.n_times()])
    }

    /// Mean power over the band's rows and all time steps
    pub fn band_power(&self, band: &BandDefinition) -> f64 {
        let rows = self.band_rows(band);
        if rows.is_empty() || self.n_times() == 0 {
            return 0.0;
        }
        self.power.select(Axis(0), &rows).mean().unwrap_or(0.0)
    }

    /// Display levels at the given percentiles of all power values
    pub fn level_range(&self, low_pct: f64, high_pct: f64) -> (f64, f64) {
        let values: Vec<f64> = self.power.iter().copied().collect();
        let low = percentile(&values, low_pct).unwrap_or(0.0);
        let high = percentile(&values, high_pct).unwrap_or(0.0);
        (low, high)
    }
}

/// FFT plans and kernel spectra for one padded length
struct TransformPlan {
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    /// Kernel spectrum per frequency row
    kernels: Array2<f64>,
}

impl TransformPlan {
    fn len(&self) -> usize {
        self.kernels.ncols()
    }
}

/// Morlet analyzer with a fixed frequency grid.
///
/// Every window up to `max_window` samples is zero padded to the same
/// transform length, so one set of FFT plans and kernel spectra serves the
/// whole session, including the ticks where the window is still filling.
pub struct WaveletAnalyzer {
    sample_rate: f64,
    frequencies_hz: Vec<f64>,
    scales: Vec<f64>,
    bandwidth: f64,
    center_frequency: f64,
    padding: usize,
    max_window: usize,
    plan: TransformPlan,
}

impl std::fmt::Debug for WaveletAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveletAnalyzer")
            .field("sample_rate", &self.sample_rate)
            .field("frequencies", &self.frequencies_hz.len())
            .field("bandwidth", &self.bandwidth)
            .field("center_frequency", &self.center_frequency)
            .field("max_window", &self.max_window)
            .field("transform_len", &self.plan.len())
            .finish()
    }
}

impl WaveletAnalyzer {
    /// Design the grid and the transform for windows of at most `max_window` samples
    pub fn new(config: &WaveletConfig, sample_rate: f64, max_window: usize) -> TgResult<Self> {
        let frequencies_hz: Vec<f64> = frequency_grid(config)
            .into_iter()
            .filter(|&f| f < sample_rate / 2.0)
            .collect();

        if frequencies_hz.is_empty() {
            return Err(TgError::configuration(
                "wavelet",
                format!("no grid frequency below Nyquist at {} Hz", sample_rate),
            ));
        }
        if max_window == 0 {
            return Err(TgError::configuration("wavelet", "maximum window length must be non-zero"));
        }

        let scales: Vec<f64> = frequencies_hz
            .iter()
            .map(|f| config.center_frequency * sample_rate / f)
            .collect();
        let max_scale = scales.iter().copied().fold(0.0, f64::max);
        let padding = (KERNEL_SUPPORT * config.bandwidth.sqrt() * max_scale).ceil() as usize;

        let plan = build_plan(&scales, config.bandwidth, config.center_frequency, max_window + padding);

        debug!(
            rows = frequencies_hz.len(),
            padding,
            transform_len = plan.len(),
            "Wavelet grid prepared"
        );

        Ok(Self {
            sample_rate,
            frequencies_hz,
            scales,
            bandwidth: config.bandwidth,
            center_frequency: config.center_frequency,
            padding,
            max_window,
            plan,
        })
    }

    pub fn frequencies_hz(&self) -> &[f64] {
        &self.frequencies_hz
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Longest window served by the session transform
    pub fn max_window(&self) -> usize {
        self.max_window
    }

    /// Padded FFT length shared by every window up to [`Self::max_window`]
    pub fn transform_len(&self) -> usize {
        self.plan.len()
    }

    /// Number of grid rows falling in `band`
    pub fn rows_in(&self, band: &BandDefinition) -> usize {
        self.frequencies_hz.iter().filter(|f| band.contains(**f)).count()
    }

    /// Power decomposition of one window.
    ///
    /// Windows longer than [`Self::max_window`] get a transform planned for
    /// that call only.
    pub fn transform(&self, x: &[f64]) -> Spectrogram {
        let n = x.len();
        let rows = self.frequencies_hz.len();
        let mut power = Array2::<f64>::zeros((rows, n));
        if n == 0 {
            return Spectrogram {
                frequencies_hz: self.frequencies_hz.clone(),
                power,
            };
        }

        let oversized;
        let plan = if n <= self.max_window {
            &self.plan
        } else {
            debug!(window = n, max_window = self.max_window, "Window exceeds the session transform");
            oversized = build_plan(&self.scales, self.bandwidth, self.center_frequency, n + self.padding);
            &oversized
        };
        let len = plan.len();

        let mut spectrum: Vec<Complex64> = x.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        spectrum.resize(len, Complex64::new(0.0, 0.0));
        plan.forward.process(&mut spectrum);

        let scale = 1.0 / len as f64;
        let mut row_buffer = vec![Complex64::new(0.0, 0.0); len];
        for (r, kernel) in plan.kernels.outer_iter().enumerate() {
            for ((out, bin), k) in row_buffer.iter_mut().zip(&spectrum).zip(kernel.iter()) {
                *out = bin * *k;
            }
            plan.inverse.process(&mut row_buffer);

            for (p, c) in power.row_mut(r).iter_mut().zip(&row_buffer[..n]) {
                *p = (c * scale).norm_sqr();
            }
        }

        Spectrogram {
            frequencies_hz: self.frequencies_hz.clone(),
            power,
        }
    }
}

fn build_plan(scales: &[f64], bandwidth: f64, center_frequency: f64, len: usize) -> TransformPlan {
    let mut planner = FftPlanner::<f64>::new();
    TransformPlan {
        forward: planner.plan_fft_forward(len),
        inverse: planner.plan_fft_inverse(len),
        kernels: kernel_spectra(scales, bandwidth, center_frequency, len),
    }
}

fn kernel_spectra(scales: &[f64], bandwidth: f64, center_frequency: f64, len: usize) -> Array2<f64> {
    let mut kernels = Array2::<f64>::zeros((scales.len(), len));
    for (mut row, &s) in kernels.outer_iter_mut().zip(scales) {
        for (k, value) in row.iter_mut().enumerate() {
            // Signed normalized frequency, cycles per sample
            let nu = if k <= len / 2 {
                k as f64 / len as f64
            } else {
                (k as f64 - len as f64) / len as f64
            };
            let offset = s * nu - center_frequency;
            *value = 2.0 * (-PI * PI * bandwidth * offset * offset).exp();
        }
    }
    kernels
}

/// Configured grid before the Nyquist cut
pub fn frequency_grid(config: &WaveletConfig) -> Vec<f64> {
    let count = config.frequency_count.max(2);
    let (lo, hi) = (config.min_frequency_hz, config.max_frequency_hz);
    (0..count)
        .map(|i| {
            let t = i as f64 / (count - 1) as f64;
            match config.spacing {
                FrequencySpacing::Linear => lo + (hi - lo) * t,
                FrequencySpacing::Logarithmic => lo * (hi / lo).powf(t),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amplitude: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    fn nearest_row(spec: &Spectrogram, freq: f64) -> usize {
        spec.frequencies_hz
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1 - freq).abs().total_cmp(&(b.1 - freq).abs()))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn test_log_grid() {
        let grid = frequency_grid(&WaveletConfig::default());
        assert_eq!(grid.len(), 64);
        assert!((grid[0] - 1.0).abs() < 1e-12);
        assert!((grid[63] - 100.0).abs() < 1e-9);
        assert!(grid.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_linear_grid() {
        let config = WaveletConfig {
            spacing: FrequencySpacing::Linear,
            frequency_count: 100,
            ..Default::default()
        };
        let grid = frequency_grid(&config);
        assert!((grid[1] - grid[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_grid_dropped_above_nyquist() {
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), 125.0, 1250).unwrap();
        assert!(analyzer.frequencies_hz().iter().all(|&f| f < 62.5));
        assert!(analyzer.frequencies_hz().len() < 64);
    }

    #[test]
    fn test_sine_power_in_matching_row() {
        let fs = 250.0;
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), fs, 2500).unwrap();

        for (freq, amplitude) in [(6.0, 2.0), (40.0, 1.0)] {
            let spec = analyzer.transform(&sine(freq, amplitude, fs, 2500));
            let row = nearest_row(&spec, freq);

            // Mid-window power, away from the zero-padded edges
            let mid = spec.power[[row, 1250]];
            assert!(
                (mid / (amplitude * amplitude) - 1.0).abs() < 0.1,
                "{} Hz row power {}",
                freq,
                mid
            );
        }
    }

    #[test]
    fn test_band_power_separates_theta_and_gamma() {
        let fs = 250.0;
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), fs, 2500).unwrap();
        let spec = analyzer.transform(&sine(6.0, 1.0, fs, 2500));

        let theta = spec.band_power(&BandDefinition::theta());
        let gamma = spec.band_power(&BandDefinition::gamma());
        assert!(theta > 0.1);
        assert!(gamma < theta * 1e-2);

        let env = spec.band_envelope(&BandDefinition::theta());
        assert_eq!(env.len(), 2500);
        assert!(env[1250] > 0.3);
    }

    #[test]
    fn test_empty_band_and_window() {
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), 250.0, 2500).unwrap();
        let spec = analyzer.transform(&[]);
        assert_eq!(spec.n_times(), 0);
        assert_eq!(spec.band_power(&BandDefinition::theta()), 0.0);

        let spec = analyzer.transform(&sine(6.0, 1.0, 250.0, 500));
        let nowhere = BandDefinition::new(200.0, 300.0);
        assert_eq!(spec.band_power(&nowhere), 0.0);
        assert_eq!(spec.band_envelope(&nowhere), vec![0.0; 500]);
    }

    #[test]
    fn test_level_range() {
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), 250.0, 2500).unwrap();
        let spec = analyzer.transform(&sine(10.0, 1.0, 250.0, 1000));
        let (low, high) = spec.level_range(5.0, 95.0);
        assert!(low >= 0.0);
        assert!(high > low);
    }

    #[test]
    fn test_filling_windows_share_one_transform() {
        let fs = 250.0;
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), fs, 3750).unwrap();
        let transform_len = analyzer.transform_len();
        assert!(transform_len > 3750);

        // Window lengths seen while a 15 s window fills in 5-sample blocks
        for n in (3000..=3750).step_by(125) {
            let spec = analyzer.transform(&sine(6.0, 2.0, fs, n));
            assert_eq!(spec.n_times(), n);
            assert_eq!(analyzer.transform_len(), transform_len);

            let row = nearest_row(&spec, 6.0);
            let mid = spec.power[[row, n / 2]];
            assert!((mid / 4.0 - 1.0).abs() < 0.15, "window {}: power {}", n, mid);
        }
    }

    #[test]
    fn test_shorter_window_matches_exact_padding() {
        let fs = 250.0;
        let x = sine(6.0, 1.0, fs, 1000);
        let session = WaveletAnalyzer::new(&WaveletConfig::default(), fs, 2500).unwrap();
        let exact = WaveletAnalyzer::new(&WaveletConfig::default(), fs, 1000).unwrap();

        let a = session.transform(&x);
        let b = exact.transform(&x);
        let row = nearest_row(&a, 6.0);
        for t in [100, 500, 900] {
            let (pa, pb) = (a.power[[row, t]], b.power[[row, t]]);
            assert!((pa - pb).abs() < 1e-3 * pb, "t={}: {} vs {}", t, pa, pb);
        }
    }

    #[test]
    fn test_oversized_window_still_transformed() {
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), 250.0, 500).unwrap();
        let transform_len = analyzer.transform_len();
        let spec = analyzer.transform(&sine(6.0, 1.0, 250.0, 800));
        assert_eq!(spec.n_times(), 800);
        assert!(spec.band_power(&BandDefinition::theta()) > 0.1);
        assert_eq!(analyzer.transform_len(), transform_len);
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = WaveletAnalyzer::new(&WaveletConfig::default(), 250.0, 0);
        assert!(matches!(result, Err(TgError::Configuration { .. })));
    }

    #[test]
    fn test_repeated_transform_is_deterministic() {
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), 250.0, 2500).unwrap();
        let x = sine(6.0, 1.0, 250.0, 600);
        assert_eq!(analyzer.transform(&x), analyzer.transform(&x));
    }
}
