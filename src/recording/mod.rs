// src/recording/mod.rs
//! Session persistence: binary session files and the periodic recorder

pub mod recorder;
pub mod session_file;

pub use recorder::SessionRecorder;
pub use session_file::{read_session, write_session, SessionData, SessionHeader, SessionWriter};
