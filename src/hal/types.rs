// src/hal/types.rs
//! Core types for EEG signal sources

use serde::{Deserialize, Serialize};

/// Block of samples pulled from a source, one vector per channel.
///
/// All channels carry the same number of samples.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBatch {
    pub channels: Vec<Vec<f64>>,
}

impl SampleBatch {
    pub fn new(channels: Vec<Vec<f64>>) -> Self {
        Self { channels }
    }

    /// Batch of `channel_count` channels with no samples
    pub fn empty(channel_count: usize) -> Self {
        Self {
            channels: vec![Vec::new(); channel_count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel (0 when the batch has no channels)
    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.samples_per_channel() == 0
    }

    /// Whether every channel carries the same number of samples
    pub fn is_rectangular(&self) -> bool {
        let expected = self.samples_per_channel();
        self.channels.iter().all(|c| c.len() == expected)
    }
}

/// Kind of signal source behind the trait object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Synthetic,
    Replay,
    Manual,
    Hardware,
}

/// Source description reported at session start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    pub kind: SourceKind,
    pub sampling_rate_hz: u32,
    pub channel_count: usize,
}

/// Result of one poll of a source
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePoll {
    /// Samples that arrived since the last poll (possibly none)
    Samples(SampleBatch),
    /// Finite source finished; no more samples will arrive
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_shape() {
        let batch = SampleBatch::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(batch.channel_count(), 2);
        assert_eq!(batch.samples_per_channel(), 2);
        assert!(batch.is_rectangular());
        assert!(!batch.is_empty());

        let ragged = SampleBatch::new(vec![vec![1.0], vec![]]);
        assert!(!ragged.is_rectangular());
    }

    #[test]
    fn test_empty_batch() {
        let batch = SampleBatch::empty(8);
        assert_eq!(batch.channel_count(), 8);
        assert!(batch.is_empty());
        assert!(SampleBatch::default().is_empty());
    }
}
