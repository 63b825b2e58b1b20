// src/config/constants.rs
//! System-wide configuration constants

/// Acquisition and windowing constants
pub mod signal {
    pub const DEFAULT_SAMPLING_RATE_HZ: u32 = 250;
    pub const DEFAULT_CHANNEL_COUNT: usize = 8;
    pub const DEFAULT_WINDOW_SECONDS: u32 = 10;
    pub const DEFAULT_TICK_INTERVAL_MS: u32 = 80;

    /// Recognized configuration options
    pub const SUPPORTED_SAMPLING_RATES_HZ: &[u32] = &[125, 250];
    pub const SUPPORTED_CHANNEL_COUNTS: &[usize] = &[4, 8, 16];
    pub const SUPPORTED_WINDOW_SECONDS: &[u32] = &[5, 10, 15];

    pub const MIN_TICK_INTERVAL_MS: u32 = 10;
    pub const MAX_TICK_INTERVAL_MS: u32 = 1000;
}

/// Frequency band defaults
pub mod bands {
    pub const THETA_LOW_HZ: f64 = 4.0;
    pub const THETA_HIGH_HZ: f64 = 8.0;
    pub const GAMMA_LOW_HZ: f64 = 30.0;
    pub const GAMMA_HIGH_HZ: f64 = 100.0;

    /// Upper band edges are clamped to this fraction of Nyquist for design
    pub const MAX_EDGE_NYQUIST_FRACTION: f64 = 0.95;
}

/// Filter bank constants
pub mod filters {
    pub const DEFAULT_HIGHPASS_CUTOFF_HZ: f64 = 0.5;
    pub const DEFAULT_HIGHPASS_ORDER: usize = 4;
    pub const DEFAULT_BANDPASS_ORDER: usize = 6;
    pub const MAX_FILTER_ORDER: usize = 10;

    /// Above this fraction of Nyquist the band-pass order is capped
    pub const HIGH_BAND_NYQUIST_FRACTION: f64 = 0.6;
    pub const HIGH_BAND_ORDER_CAP: usize = 3;

    pub const DEFAULT_NOTCH_FREQUENCY_HZ: f64 = 50.0;
    pub const DEFAULT_NOTCH_QUALITY: f64 = 30.0;

    pub const DEFAULT_SMOOTHING_WINDOW: usize = 21;
    pub const DEFAULT_SMOOTHING_POLY_ORDER: usize = 3;

    /// Pole radius above which a design is considered unstable
    pub const MAX_POLE_RADIUS: f64 = 1.0 - 1e-9;

    /// Frequency points used by the passband gain check
    pub const GAIN_CHECK_POINTS: usize = 256;
}

/// Wavelet analyzer constants
pub mod wavelet {
    pub const DEFAULT_MIN_FREQUENCY_HZ: f64 = 1.0;
    pub const DEFAULT_MAX_FREQUENCY_HZ: f64 = 100.0;
    pub const DEFAULT_FREQUENCY_COUNT: usize = 64;
    pub const MIN_FREQUENCY_COUNT: usize = 8;
    pub const MAX_FREQUENCY_COUNT: usize = 256;

    /// Complex Morlet bandwidth (B) and center frequency (C)
    pub const DEFAULT_BANDWIDTH: f64 = 1.5;
    pub const DEFAULT_CENTER_FREQUENCY: f64 = 1.0;

    /// Kernel support in units of sqrt(B) * scale
    pub const KERNEL_SUPPORT: f64 = 3.5;
}

/// Channel processing and aggregation constants
pub mod aggregation {
    pub const DEFAULT_RATIO_EPSILON: f64 = 1e-12;
    pub const NEUTRAL_RATIO: f64 = 0.5;
    pub const DEFAULT_MIN_FILL_RATIO: f64 = 0.8;
    pub const DEFAULT_HISTORY_SECONDS: f64 = 30.0;
}

/// Session recording constants
pub mod recording {
    pub const DEFAULT_DIRECTORY: &str = "recordings";
    pub const DEFAULT_SAVE_INTERVAL_SECONDS: u32 = 15;
    pub const SESSION_FILE_EXTENSION: &str = "tgs";
    pub const SESSION_MAGIC: &[u8; 8] = b"TGSESS02";
    pub const SESSION_FORMAT_VERSION: u32 = 2;
}

/// Configuration file locations
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/theta-gamma/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/theta-gamma";
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
    pub const LOCAL_CONFIG_FILE: &str = "theta-gamma.toml";
    pub const ENV_PREFIX: &str = "TG_";
}
