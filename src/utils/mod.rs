//! Common utilities shared across the pipeline
//!
//! - time providers used for wall-clock tick timestamps
//! - order statistics (median, percentile) used by aggregation and display levels

pub mod stats;
pub mod time;

pub use stats::{mean_square, median, percentile};
pub use time::{current_timestamp_nanos, MockTimeProvider, MonotonicTimeProvider, TimeProvider};
