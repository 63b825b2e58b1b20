// src/acquisition/mod.rs
//! Signal acquisition and buffering components

pub mod buffer_manager;
pub mod ring_buffer;

pub use buffer_manager::*;
pub use ring_buffer::*;
