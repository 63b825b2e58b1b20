// src/hal/replay.rs
//! Replay of a recorded session in fixed-size chunks

use crate::error::{TgError, TgResult};
use crate::hal::traits::SignalSource;
use crate::hal::types::{SampleBatch, SourceInfo, SourceKind, SourcePoll};
use crate::recording::{read_session, SessionData, SessionHeader};
use std::path::Path;
use tracing::info;

pub struct ReplaySource {
    name: String,
    data: SessionData,
    chunk_size: usize,
    cursor: usize,
    stopped: bool,
}

impl ReplaySource {
    pub fn new(data: SessionData, chunk_size: usize) -> TgResult<Self> {
        if chunk_size == 0 {
            return Err(TgError::configuration("replay", "chunk size must be positive"));
        }
        Ok(Self {
            name: "replay".to_string(),
            data,
            chunk_size,
            cursor: 0,
            stopped: false,
        })
    }

    /// Chunks matching what a realtime board delivers per tick
    pub fn for_tick_interval(data: SessionData, tick_interval_ms: u32) -> TgResult<Self> {
        let chunk = (data.header.sampling_rate_hz as usize * tick_interval_ms as usize / 1000).max(1);
        Self::new(data, chunk)
    }

    pub fn open(path: &Path, tick_interval_ms: u32) -> TgResult<Self> {
        let data = read_session(path)?;
        info!(
            path = %path.display(),
            seconds = data.duration_seconds(),
            channels = data.header.channel_count,
            "Session loaded for replay"
        );
        let mut source = Self::for_tick_interval(data, tick_interval_ms)?;
        source.name = path.display().to_string();
        Ok(source)
    }

    pub fn header(&self) -> &SessionHeader {
        &self.data.header
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Samples per channel already delivered
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.data.samples_per_channel() - self.cursor
    }
}

impl SignalSource for ReplaySource {
    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name.clone(),
            kind: SourceKind::Replay,
            sampling_rate_hz: self.data.header.sampling_rate_hz,
            channel_count: self.data.header.channel_count,
        }
    }

    fn pull_available_samples(&mut self) -> TgResult<SourcePoll> {
        if self.stopped || self.remaining() == 0 {
            return Ok(SourcePoll::Exhausted);
        }

        let end = (self.cursor + self.chunk_size).min(self.data.samples_per_channel());
        let channels = self
            .data
            .channels
            .iter()
            .map(|channel| channel[self.cursor..end].to_vec())
            .collect();
        self.cursor = end;
        Ok(SourcePoll::Samples(SampleBatch::new(channels)))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
