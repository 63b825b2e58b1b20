// src/hal/traits.rs
//! Core HAL trait for EEG signal sources

use crate::error::TgResult;
use crate::hal::types::{SourceInfo, SourcePoll};

/// Anything the orchestrator can pull samples from.
///
/// `pull_available_samples` must not block: a realtime source returns whatever
/// arrived since the previous call (possibly an empty batch), a finite source
/// returns [`SourcePoll::Exhausted`] once it has delivered everything. A lost
/// device is reported as `TgError::SourceUnavailable`.
pub trait SignalSource: Send {
    /// Get source information
    fn info(&self) -> SourceInfo;

    /// Drain samples available right now
    fn pull_available_samples(&mut self) -> TgResult<SourcePoll>;

    /// Stop acquisition and release resources; idempotent
    fn stop(&mut self);
}

impl<S: SignalSource + ?Sized> SignalSource for Box<S> {
    fn info(&self) -> SourceInfo {
        (**self).info()
    }

    fn pull_available_samples(&mut self) -> TgResult<SourcePoll> {
        (**self).pull_available_samples()
    }

    fn stop(&mut self) {
        (**self).stop()
    }
}
