// src/hal/manual.rs
//! Scripted source: batches queued by the caller

use crate::error::{TgError, TgResult};
use crate::hal::traits::SignalSource;
use crate::hal::types::{SampleBatch, SourceInfo, SourceKind, SourcePoll};
use std::collections::VecDeque;

enum Scripted {
    Batch(SampleBatch),
    Failure(String),
}

/// Source fed by [`ManualSource::push`]; returns empty batches when the
/// queue is drained until [`ManualSource::finish`] is called
pub struct ManualSource {
    info: SourceInfo,
    queue: VecDeque<Scripted>,
    finished: bool,
}

impl ManualSource {
    pub fn new(sampling_rate_hz: u32, channel_count: usize) -> Self {
        Self {
            info: SourceInfo {
                name: "manual".to_string(),
                kind: SourceKind::Manual,
                sampling_rate_hz,
                channel_count,
            },
            queue: VecDeque::new(),
            finished: false,
        }
    }

    pub fn push(&mut self, batch: SampleBatch) {
        self.queue.push_back(Scripted::Batch(batch));
    }

    /// Queue a source loss after the batches already queued
    pub fn fail_next(&mut self, reason: &str) {
        self.queue.push_back(Scripted::Failure(reason.to_string()));
    }

    /// Report exhaustion once the queue is drained
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl SignalSource for ManualSource {
    fn info(&self) -> SourceInfo {
        self.info.clone()
    }

    fn pull_available_samples(&mut self) -> TgResult<SourcePoll> {
        match self.queue.pop_front() {
            Some(Scripted::Batch(batch)) => Ok(SourcePoll::Samples(batch)),
            Some(Scripted::Failure(reason)) => Err(TgError::SourceUnavailable { reason }),
            None if self.finished => Ok(SourcePoll::Exhausted),
            None => Ok(SourcePoll::Samples(SampleBatch::empty(self.info.channel_count))),
        }
    }

    fn stop(&mut self) {
        self.queue.clear();
        self.finished = true;
    }
}
