// src/error.rs
//! Unified error handling for the theta/gamma pipeline
//!
//! Every fallible operation in the crate returns [`TgResult`]. Errors are split
//! into two groups:
//!
//! - recoverable conditions that the pipeline absorbs locally (a channel whose
//!   window is not yet filled degrades to a neutral contribution),
//! - session-level failures (configuration, unstable filter design, lost signal
//!   source) that stop the session before or between ticks.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the whole crate
#[derive(Debug, Error)]
pub enum TgError {
    /// Configuration rejected at session start
    #[error("[CONFIG] Configuration error in {component}: {reason}")]
    Configuration { component: String, reason: String },

    /// Filter design outside the numerically stable range, even after order reduction
    #[error("[FILTER] Unstable design for {low_hz}-{high_hz} Hz at order {order}: {reason}")]
    FilterInstability {
        low_hz: f64,
        high_hz: f64,
        order: usize,
        reason: String,
    },

    /// Window shorter than the minimum analysis length
    #[error("[DATA] Channel {channel}: {available} samples available, {required} required")]
    InsufficientData {
        channel: usize,
        available: usize,
        required: usize,
    },

    /// Malformed input data
    #[error("[DATA] Invalid {data_type}: {reason}")]
    InvalidData { data_type: String, reason: String },

    /// Signal source failed to start or disconnected
    #[error("[SOURCE] Signal source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    /// Orchestrator invoked after a fatal source failure
    #[error("[PIPELINE] Session halted after source failure")]
    SessionHalted,

    /// Re-entrant tick on a shared orchestrator
    #[error("[PIPELINE] A tick is already in progress")]
    TickInProgress,

    /// Corrupt or incompatible session file
    #[error("[SESSION] Invalid session file {path}: {reason}")]
    SessionFormat { path: PathBuf, reason: String },

    #[error("[IO] {operation} failed: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for pipeline operations
pub type TgResult<T> = Result<T, TgError>;

impl TgError {
    pub fn configuration(component: &str, reason: impl Into<String>) -> Self {
        TgError::Configuration {
            component: component.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_data(data_type: &str, reason: impl Into<String>) -> Self {
        TgError::InvalidData {
            data_type: data_type.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        TgError::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn session_format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        TgError::SessionFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error ends the session.
    ///
    /// Insufficient data and busy ticks are transient; everything tied to the
    /// source, the configuration or the filter design is not.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            TgError::InsufficientData { .. } | TgError::TickInProgress | TgError::InvalidData { .. }
        )
    }
}

/// Convenience trait for attaching an operation name to IO results
pub trait IntoTgError<T> {
    fn tg_io(self, operation: &str) -> TgResult<T>;
}

impl<T> IntoTgError<T> for Result<T, std::io::Error> {
    fn tg_io(self, operation: &str) -> TgResult<T> {
        self.map_err(|err| TgError::io(operation, err))
    }
}
