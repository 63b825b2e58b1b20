// src/acquisition/ring_buffer.rs
//! Fixed-capacity per-channel sample window

/// Overwrite-oldest ring buffer holding the most recent `capacity` samples
/// of one channel.
///
/// Storage is allocated once at construction; pushing never reallocates.
#[derive(Debug, Clone)]
pub struct ChannelRingBuffer {
    buffer: Vec<f64>,
    capacity: usize,
    /// Index of the next write
    head: usize,
    len: usize,
}

/// Ring buffer error types
#[derive(Debug, PartialEq)]
pub enum RingBufferError {
    InvalidCapacity,
}

impl std::fmt::Display for RingBufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingBufferError::InvalidCapacity => write!(f, "Invalid buffer capacity (must be non-zero)"),
        }
    }
}

impl std::error::Error for RingBufferError {}

impl ChannelRingBuffer {
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 {
            return Err(RingBufferError::InvalidCapacity);
        }

        Ok(Self {
            buffer: vec![0.0; capacity],
            capacity,
            head: 0,
            len: 0,
        })
    }

    /// Append one sample; returns `true` when an older sample was evicted
    #[inline]
    pub fn push(&mut self, sample: f64) -> bool {
        self.buffer[self.head] = sample;
        self.head = (self.head + 1) % self.capacity;

        if self.len == self.capacity {
            true
        } else {
            self.len += 1;
            false
        }
    }

    /// Append samples in order; returns the number of evicted samples
    pub fn extend_from_slice(&mut self, samples: &[f64]) -> usize {
        // Only the tail of an oversized block can survive
        let skipped = samples.len().saturating_sub(self.capacity);
        let mut evicted = skipped;
        for &sample in &samples[skipped..] {
            if self.push(sample) {
                evicted += 1;
            }
        }
        evicted
    }

    /// Chronological copy of the window, oldest first
    pub fn snapshot(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.len);
        self.copy_into(&mut out);
        out
    }

    /// Write the chronological window into `out`, reusing its allocation
    pub fn copy_into(&self, out: &mut Vec<f64>) {
        out.clear();
        let start = (self.head + self.capacity - self.len) % self.capacity;
        if start + self.len <= self.capacity {
            out.extend_from_slice(&self.buffer[start..start + self.len]);
        } else {
            out.extend_from_slice(&self.buffer[start..]);
            out.extend_from_slice(&self.buffer[..self.head]);
        }
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<f64> {
        if self.len == 0 {
            None
        } else {
            Some(self.buffer[(self.head + self.capacity - 1) % self.capacity])
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the window has been completely filled at least once
    pub fn is_primed(&self) -> bool {
        self.len == self.capacity
    }

    /// Fill level (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len as f64 / self.capacity as f64
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}
