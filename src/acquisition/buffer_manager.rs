// src/acquisition/buffer_manager.rs
//! Buffer management for multi-channel EEG acquisition

use crate::acquisition::ring_buffer::ChannelRingBuffer;
use crate::config::SignalConfig;
use crate::error::{TgError, TgResult};
use crate::hal::SampleBatch;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Buffer configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BufferConfig {
    pub channel_count: usize,
    /// Samples retained per channel
    pub window_capacity: usize,
}

impl BufferConfig {
    pub fn from_signal(signal: &SignalConfig) -> Self {
        Self {
            channel_count: signal.channel_count,
            window_capacity: signal.window_capacity(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self::from_signal(&SignalConfig::default())
    }
}

/// Buffer utilization metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferMetrics {
    /// Samples accepted per channel since creation or reset
    pub samples_ingested: u64,
    /// Samples pushed out of the windows per channel
    pub samples_evicted: u64,
    pub batches_ingested: u64,
    /// Fill level of the shortest window (0.0 to 1.0)
    pub min_fill_ratio: f64,
}

/// One ring buffer per channel, fed from source batches
#[derive(Debug, Clone)]
pub struct BufferManager {
    channels: Vec<ChannelRingBuffer>,
    config: BufferConfig,

    samples_ingested: u64,
    samples_evicted: u64,
    batches_ingested: u64,
}

impl BufferManager {
    /// Create new buffer manager
    pub fn new(config: BufferConfig) -> TgResult<Self> {
        if config.channel_count == 0 {
            return Err(TgError::configuration("buffers", "channel count must be positive"));
        }

        let channels = (0..config.channel_count)
            .map(|_| ChannelRingBuffer::new(config.window_capacity))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| TgError::configuration("buffers", e.to_string()))?;

        Ok(Self {
            channels,
            config,
            samples_ingested: 0,
            samples_evicted: 0,
            batches_ingested: 0,
        })
    }

    /// Append a batch to every channel window.
    ///
    /// The batch must carry exactly one vector per configured channel, all of
    /// the same length. Returns the number of samples appended per channel.
    pub fn ingest(&mut self, batch: &SampleBatch) -> TgResult<usize> {
        if batch.channel_count() != self.channels.len() {
            return Err(TgError::invalid_data(
                "sample batch",
                format!(
                    "expected {} channels, got {}",
                    self.channels.len(),
                    batch.channel_count()
                ),
            ));
        }
        if !batch.is_rectangular() {
            return Err(TgError::invalid_data(
                "sample batch",
                "channels carry different sample counts",
            ));
        }

        let samples = batch.samples_per_channel();
        if samples == 0 {
            return Ok(0);
        }

        let mut evicted = 0;
        for (ring, block) in self.channels.iter_mut().zip(&batch.channels) {
            evicted = ring.extend_from_slice(block);
        }

        self.samples_ingested += samples as u64;
        self.samples_evicted += evicted as u64;
        self.batches_ingested += 1;

        trace!(samples, evicted, "Batch ingested");
        Ok(samples)
    }

    /// Chronological copy of one channel window
    pub fn snapshot(&self, channel: usize) -> TgResult<Vec<f64>> {
        self.channels
            .get(channel)
            .map(ChannelRingBuffer::snapshot)
            .ok_or_else(|| {
                TgError::invalid_data(
                    "channel index",
                    format!("{} out of range (0..{})", channel, self.channels.len()),
                )
            })
    }

    /// Chronological copies of every channel window, indexed by channel
    pub fn snapshots(&self) -> Vec<Vec<f64>> {
        self.channels.iter().map(ChannelRingBuffer::snapshot).collect()
    }

    pub fn channel(&self, channel: usize) -> Option<&ChannelRingBuffer> {
        self.channels.get(channel)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn window_capacity(&self) -> usize {
        self.config.window_capacity
    }

    /// Whether every window has been filled at least once
    pub fn is_primed(&self) -> bool {
        self.channels.iter().all(ChannelRingBuffer::is_primed)
    }

    /// Get current buffer metrics
    pub fn get_metrics(&self) -> BufferMetrics {
        BufferMetrics {
            samples_ingested: self.samples_ingested,
            samples_evicted: self.samples_evicted,
            batches_ingested: self.batches_ingested,
            min_fill_ratio: self
                .channels
                .iter()
                .map(ChannelRingBuffer::fill_ratio)
                .fold(1.0, f64::min),
        }
    }

    /// Reset all buffers and metrics
    pub fn reset(&mut self) {
        for ring in &mut self.channels {
            ring.clear();
        }
        self.samples_ingested = 0;
        self.samples_evicted = 0;
        self.batches_ingested = 0;
    }

    /// Get configuration
    pub fn config(&self) -> &BufferConfig {
        &self.config
    }
}
