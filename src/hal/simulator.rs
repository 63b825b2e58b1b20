// src/hal/simulator.rs
//! Synthetic EEG board
//!
//! Each board channel is a sum of sinusoids plus white Gaussian noise and an
//! optional mains hum. The board either runs a generator thread that produces
//! a block every `block_ms` (realtime) or produces a fixed chunk on every pull
//! (stepped, fully deterministic for a given seed).

use crate::error::{TgError, TgResult};
use crate::hal::channel_map::ChannelMap;
use crate::hal::traits::SignalSource;
use crate::hal::types::{SampleBatch, SourceInfo, SourceKind, SourcePoll};
use crossbeam::channel::{bounded, Receiver, TryRecvError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

/// Blocks the generator thread may run ahead of the consumer
const REALTIME_QUEUE_BLOCKS: usize = 256;

/// Phase offset between neighbouring channels
const CHANNEL_PHASE_STEP_RAD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SineComponent {
    pub frequency_hz: f64,
    pub amplitude_uv: f64,
}

impl SineComponent {
    pub const fn new(frequency_hz: f64, amplitude_uv: f64) -> Self {
        Self {
            frequency_hz,
            amplitude_uv,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub sampling_rate_hz: u32,
    pub board_channels: usize,
    pub components: Vec<SineComponent>,
    pub noise_std_uv: f64,
    pub mains_hum: Option<SineComponent>,
    pub dc_offset_uv: f64,
    pub seed: u64,
    /// Generation period of the realtime board
    pub block_ms: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 250,
            board_channels: 8,
            components: vec![SineComponent::new(6.0, 20.0), SineComponent::new(40.0, 5.0)],
            noise_std_uv: 2.0,
            mains_hum: None,
            dc_offset_uv: 0.0,
            seed: 7,
            block_ms: 20,
        }
    }
}

impl SyntheticConfig {
    /// Single tone of `frequency_hz` on every channel, light noise
    pub fn tone(sampling_rate_hz: u32, board_channels: usize, frequency_hz: f64, amplitude_uv: f64) -> Self {
        Self {
            sampling_rate_hz,
            board_channels,
            components: vec![SineComponent::new(frequency_hz, amplitude_uv)],
            noise_std_uv: 0.5,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> TgResult<()> {
        if self.sampling_rate_hz == 0 || self.board_channels == 0 {
            return Err(TgError::configuration(
                "synthetic board",
                "sampling rate and channel count must be positive",
            ));
        }
        if self.noise_std_uv < 0.0 || !self.noise_std_uv.is_finite() {
            return Err(TgError::configuration("synthetic board", "noise level must be non-negative"));
        }
        if self.block_ms == 0 {
            return Err(TgError::configuration("synthetic board", "block period must be positive"));
        }
        let nyquist = self.sampling_rate_hz as f64 / 2.0;
        if let Some(c) = self
            .components
            .iter()
            .chain(self.mains_hum.iter())
            .find(|c| c.frequency_hz <= 0.0 || c.frequency_hz >= nyquist)
        {
            return Err(TgError::configuration(
                "synthetic board",
                format!("component at {} Hz outside (0, {}) Hz", c.frequency_hz, nyquist),
            ));
        }
        Ok(())
    }

    fn block_samples(&self) -> usize {
        (self.sampling_rate_hz as usize * self.block_ms as usize / 1000).max(1)
    }
}

/// Seeded sample generator shared by both board modes
pub struct SignalGenerator {
    config: SyntheticConfig,
    rng: StdRng,
    sample_index: u64,
}

impl SignalGenerator {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            sample_index: 0,
        }
    }

    /// Next `n` samples of every board channel
    pub fn next_block(&mut self, n: usize) -> Vec<Vec<f64>> {
        let fs = self.config.sampling_rate_hz as f64;
        let mut channels = vec![Vec::with_capacity(n); self.config.board_channels];

        for offset in 0..n as u64 {
            let t = (self.sample_index + offset) as f64 / fs;
            for (ch, samples) in channels.iter_mut().enumerate() {
                let phase = ch as f64 * CHANNEL_PHASE_STEP_RAD;
                let mut value = self.config.dc_offset_uv;
                for c in &self.config.components {
                    value += c.amplitude_uv * (2.0 * PI * c.frequency_hz * t + phase).sin();
                }
                if let Some(hum) = self.config.mains_hum {
                    value += hum.amplitude_uv * (2.0 * PI * hum.frequency_hz * t).sin();
                }
                if self.config.noise_std_uv > 0.0 {
                    value += self.config.noise_std_uv * gaussian(&mut self.rng);
                }
                samples.push(value);
            }
        }

        self.sample_index += n as u64;
        channels
    }

    pub fn samples_generated(&self) -> u64 {
        self.sample_index
    }
}

/// Standard normal deviate (Box-Muller)
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

enum BoardMode {
    Stepped {
        generator: SignalGenerator,
        chunk_size: usize,
    },
    Realtime {
        receiver: Receiver<Vec<Vec<f64>>>,
        running: Arc<AtomicBool>,
        handle: Option<JoinHandle<()>>,
    },
    Stopped,
}

pub struct SyntheticBoard {
    info: SourceInfo,
    map: ChannelMap,
    mode: BoardMode,
}

impl SyntheticBoard {
    /// Board producing `chunk_size` samples per channel on every pull
    pub fn stepped(config: SyntheticConfig, target_channels: usize, chunk_size: usize) -> TgResult<Self> {
        config.validate()?;
        if chunk_size == 0 {
            return Err(TgError::configuration("synthetic board", "chunk size must be positive"));
        }
        Ok(Self {
            info: Self::source_info(&config, target_channels),
            map: ChannelMap::new(config.board_channels, target_channels),
            mode: BoardMode::Stepped {
                generator: SignalGenerator::new(config),
                chunk_size,
            },
        })
    }

    /// Board with a background generator thread paced by the wall clock
    pub fn realtime(config: SyntheticConfig, target_channels: usize) -> TgResult<Self> {
        config.validate()?;
        let info = Self::source_info(&config, target_channels);
        let map = ChannelMap::new(config.board_channels, target_channels);

        let block_samples = config.block_samples();
        let period = Duration::from_millis(config.block_ms as u64);
        let (sender, receiver) = bounded(REALTIME_QUEUE_BLOCKS);
        let running = Arc::new(AtomicBool::new(true));

        let thread_running = running.clone();
        let mut generator = SignalGenerator::new(config);
        let handle = std::thread::Builder::new()
            .name("synthetic-board".to_string())
            .spawn(move || {
                while thread_running.load(Ordering::Acquire) {
                    if sender.send(generator.next_block(block_samples)).is_err() {
                        break;
                    }
                    std::thread::sleep(period);
                }
                debug!(samples = generator.samples_generated(), "Synthetic generator stopped");
            })
            .map_err(|e| TgError::SourceUnavailable {
                reason: format!("failed to start generator thread: {}", e),
            })?;

        Ok(Self {
            info,
            map,
            mode: BoardMode::Realtime {
                receiver,
                running,
                handle: Some(handle),
            },
        })
    }

    fn source_info(config: &SyntheticConfig, target_channels: usize) -> SourceInfo {
        SourceInfo {
            name: "synthetic".to_string(),
            kind: SourceKind::Synthetic,
            sampling_rate_hz: config.sampling_rate_hz,
            channel_count: target_channels,
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.mode, BoardMode::Stopped)
    }
}

impl SignalSource for SyntheticBoard {
    fn info(&self) -> SourceInfo {
        self.info.clone()
    }

    fn pull_available_samples(&mut self) -> TgResult<SourcePoll> {
        let channels = match &mut self.mode {
            BoardMode::Stopped => return Ok(SourcePoll::Exhausted),
            BoardMode::Stepped { generator, chunk_size } => generator.next_block(*chunk_size),
            BoardMode::Realtime { receiver, .. } => {
                let mut collected: Option<Vec<Vec<f64>>> = None;
                loop {
                    match receiver.try_recv() {
                        Ok(block) => match collected.as_mut() {
                            Some(channels) => {
                                for (channel, incoming) in channels.iter_mut().zip(block) {
                                    channel.extend(incoming);
                                }
                            }
                            None => collected = Some(block),
                        },
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            if collected.is_some() {
                                break;
                            }
                            warn!("Synthetic generator thread is gone");
                            return Err(TgError::SourceUnavailable {
                                reason: "synthetic generator thread stopped".to_string(),
                            });
                        }
                    }
                }
                match collected {
                    Some(channels) => channels,
                    None => return Ok(SourcePoll::Samples(SampleBatch::empty(self.info.channel_count))),
                }
            }
        };

        Ok(SourcePoll::Samples(SampleBatch::new(self.map.apply(channels))))
    }

    fn stop(&mut self) {
        if let BoardMode::Realtime { receiver, running, handle } =
            std::mem::replace(&mut self.mode, BoardMode::Stopped)
        {
            running.store(false, Ordering::Release);
            drop(receiver);
            if let Some(handle) = handle {
                if handle.join().is_err() {
                    warn!("Synthetic generator thread panicked");
                }
            }
        }
    }
}

impl Drop for SyntheticBoard {
    fn drop(&mut self) {
        self.stop();
    }
}
