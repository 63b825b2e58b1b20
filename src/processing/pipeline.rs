// src/processing/pipeline.rs
//! Tick-driven pipeline orchestrator
//!
//! One tick pulls what the source has, feeds the channel rings (and the
//! recorder), analyzes every channel window and folds the per-channel ratios
//! into the global ratio. All cross-tick state lives in [`PipelineState`],
//! which the caller owns and passes in.

use crate::acquisition::{BufferConfig, BufferManager};
use crate::config::PipelineConfig;
use crate::error::{TgError, TgResult};
use crate::hal::{SignalSource, SourceInfo, SourcePoll};
use crate::processing::aggregator::{Aggregator, RatioHistory};
use crate::processing::channel_processor::{ChannelProcessor, ChannelResult};
use crate::recording::SessionRecorder;
use crate::utils::time::TimeProvider;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Mutable session state carried from tick to tick
#[derive(Debug)]
pub struct PipelineState {
    buffers: BufferManager,
    history: RatioHistory,
    tick: u64,
    samples_ingested: u64,
}

impl PipelineState {
    pub fn new(config: &PipelineConfig) -> TgResult<Self> {
        Ok(Self {
            buffers: BufferManager::new(BufferConfig::from_signal(&config.signal))?,
            history: RatioHistory::new(config.aggregation.history_seconds),
            tick: 0,
            samples_ingested: 0,
        })
    }

    pub fn buffers(&self) -> &BufferManager {
        &self.buffers
    }

    pub fn history(&self) -> &RatioHistory {
        &self.history
    }

    /// Ticks that produced an output so far
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Samples per channel ingested since session start
    pub fn samples_ingested(&self) -> u64 {
        self.samples_ingested
    }

    pub fn reset(&mut self) {
        self.buffers.reset();
        self.history.clear();
        self.tick = 0;
        self.samples_ingested = 0;
    }
}

/// Where tick timestamps come from
#[derive(Clone)]
pub enum TickClock {
    /// Seconds of signal ingested so far; deterministic for replay and tests
    Stream,
    Wall(Arc<dyn TimeProvider>),
}

impl std::fmt::Debug for TickClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickClock::Stream => f.write_str("Stream"),
            TickClock::Wall(_) => f.write_str("Wall"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub tick: u64,
    pub timestamp_s: f64,
    pub global_ratio: f64,
    pub channels: Vec<ChannelResult>,
}

impl TickOutput {
    pub fn analyzed_channels(&self) -> usize {
        self.channels.iter().filter(|c| c.is_analyzed()).count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Updated(TickOutput),
    /// No samples arrived; state untouched
    Idle,
    /// Finite source has delivered everything
    Complete,
}

pub struct Orchestrator {
    config: PipelineConfig,
    processor: ChannelProcessor,
    clock: TickClock,
    recorder: Option<SessionRecorder>,
    halted: bool,
}

impl Orchestrator {
    /// Validate the configuration and design every filter and wavelet row
    pub fn new(config: PipelineConfig) -> TgResult<Self> {
        config.validate()?;
        let processor = ChannelProcessor::new(&config)?;

        let summary = config.get_summary();
        info!(
            sampling_rate_hz = summary.sampling_rate_hz,
            channels = summary.channel_count,
            window_seconds = summary.window_seconds,
            tick_interval_ms = summary.tick_interval_ms,
            mode = %summary.mode,
            "Pipeline orchestrator ready"
        );

        Ok(Self {
            config,
            processor,
            clock: TickClock::Stream,
            recorder: None,
            halted: false,
        })
    }

    pub fn with_clock(mut self, clock: TickClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn attach_recorder(&mut self, recorder: SessionRecorder) {
        self.recorder = Some(recorder);
    }

    pub fn take_recorder(&mut self) -> Option<SessionRecorder> {
        self.recorder.take()
    }

    pub fn recorder(&self) -> Option<&SessionRecorder> {
        self.recorder.as_ref()
    }

    pub fn new_state(&self) -> TgResult<PipelineState> {
        PipelineState::new(&self.config)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn processor(&self) -> &ChannelProcessor {
        &self.processor
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Reject a source whose layout differs from the configuration
    pub fn check_source(&self, info: &SourceInfo) -> TgResult<()> {
        if info.sampling_rate_hz != self.config.signal.sampling_rate_hz {
            return Err(TgError::configuration(
                "source",
                format!(
                    "{} runs at {} Hz, pipeline expects {} Hz",
                    info.name, info.sampling_rate_hz, self.config.signal.sampling_rate_hz
                ),
            ));
        }
        if info.channel_count != self.config.signal.channel_count {
            return Err(TgError::configuration(
                "source",
                format!(
                    "{} delivers {} channels, pipeline expects {}",
                    info.name, info.channel_count, self.config.signal.channel_count
                ),
            ));
        }
        Ok(())
    }

    pub fn tick(&mut self, state: &mut PipelineState, source: &mut dyn SignalSource) -> TgResult<TickOutcome> {
        if self.halted {
            return Err(TgError::SessionHalted);
        }

        let batch = match source.pull_available_samples() {
            Ok(SourcePoll::Samples(batch)) => batch,
            Ok(SourcePoll::Exhausted) => {
                self.finish()?;
                return Ok(TickOutcome::Complete);
            }
            Err(err @ TgError::SourceUnavailable { .. }) => {
                warn!(error = %err, "Signal source lost, halting session");
                self.halt();
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if batch.samples_per_channel() == 0 {
            return Ok(TickOutcome::Idle);
        }

        let ingested = state.buffers.ingest(&batch)?;
        state.samples_ingested += ingested as u64;
        state.tick += 1;

        // Unsaved samples stay in the recorder and go out with the next save
        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(err) = recorder.record(&batch) {
                warn!(
                    error = %err,
                    path = %recorder.path().display(),
                    pending = recorder.pending().samples_per_channel(),
                    "Session save failed, continuing"
                );
            }
        }

        let snapshots = state.buffers.snapshots();
        let channels = self.process_snapshots(&snapshots)?;

        let timestamp_s = match &self.clock {
            TickClock::Stream => state.samples_ingested as f64 / self.config.signal.sample_rate(),
            TickClock::Wall(provider) => provider.now_seconds(),
        };
        let ratios: Vec<f64> = channels.iter().map(|c| c.ratio).collect();
        let global_ratio = Aggregator::fold(&mut state.history, timestamp_s, &ratios);

        let output = TickOutput {
            tick: state.tick,
            timestamp_s,
            global_ratio,
            channels,
        };
        debug!(
            tick = output.tick,
            timestamp_s,
            global_ratio,
            analyzed = output.analyzed_channels(),
            "Tick complete"
        );

        Ok(TickOutcome::Updated(output))
    }

    /// Analyze every channel window; results are in channel order
    pub fn process_snapshots(&self, snapshots: &[Vec<f64>]) -> TgResult<Vec<ChannelResult>> {
        #[cfg(feature = "parallel")]
        {
            if self.config.processing.parallel_channels {
                return snapshots
                    .par_iter()
                    .enumerate()
                    .map(|(channel, window)| self.processor.process(channel, window))
                    .collect();
            }
        }

        snapshots
            .iter()
            .enumerate()
            .map(|(channel, window)| self.processor.process(channel, window))
            .collect()
    }

    /// Flush the recorder, if attached
    pub fn finish(&mut self) -> TgResult<()> {
        match self.recorder.as_mut() {
            Some(recorder) => recorder.flush(),
            None => Ok(()),
        }
    }

    fn halt(&mut self) {
        self.halted = true;
        if let Err(err) = self.finish() {
            error!(error = %err, "Failed to flush recording after source loss");
        }
    }
}

struct SharedInner {
    orchestrator: Orchestrator,
    state: PipelineState,
}

/// Orchestrator and state behind one lock, for callers ticking from several threads
#[derive(Clone)]
pub struct SharedOrchestrator {
    inner: Arc<Mutex<SharedInner>>,
}

impl SharedOrchestrator {
    pub fn new(orchestrator: Orchestrator, state: PipelineState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SharedInner { orchestrator, state })),
        }
    }

    /// Run one tick; fails with `TickInProgress` instead of waiting when another tick holds the lock
    pub fn tick(&self, source: &mut dyn SignalSource) -> TgResult<TickOutcome> {
        let mut guard = self.inner.try_lock().ok_or(TgError::TickInProgress)?;
        let SharedInner { orchestrator, state } = &mut *guard;
        orchestrator.tick(state, source)
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&PipelineState) -> R) -> R {
        f(&self.inner.lock().state)
    }

    pub fn is_halted(&self) -> bool {
        self.inner.lock().orchestrator.is_halted()
    }
}
