// src/processing/mod.rs
//! Signal processing: filters, band estimators, aggregation and the orchestrator

pub mod aggregator;
pub mod channel_processor;
pub mod features;
pub mod filter_bank;
pub mod filters;
pub mod pipeline;
pub mod spectral;

pub use aggregator::{Aggregator, RatioHistory, RatioPoint};
pub use channel_processor::{compute_ratio, ChannelDetail, ChannelProcessor, ChannelResult, ChannelStatus};
pub use features::{
    build_estimator, BandEstimate, BandEstimator, BandSeries, Spectrogram, TimeDomainEstimator,
    TimeFrequencyEstimator, WaveletAnalyzer,
};
pub use filter_bank::{BandFilter, Preprocessor};
pub use pipeline::{Orchestrator, PipelineState, SharedOrchestrator, TickClock, TickOutcome, TickOutput};
