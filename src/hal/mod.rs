// src/hal/mod.rs
//! Signal source abstraction and the built-in sources

pub mod channel_map;
pub mod manual;
pub mod replay;
pub mod simulator;
pub mod traits;
pub mod types;

pub use channel_map::{remap_channels, ChannelMap};
pub use manual::ManualSource;
pub use replay::ReplaySource;
pub use simulator::{SignalGenerator, SineComponent, SyntheticBoard, SyntheticConfig};
pub use traits::*;
pub use types::*;
