// src/recording/recorder.rs
//! Periodic session recorder
//!
//! Buffers ingested samples and appends them to the session file as one chunk
//! once `save_interval_seconds` of stream time has accumulated, and on flush.
//! Saved samples are released, so memory stays bounded by one save interval.

use crate::config::constants::recording::SESSION_FILE_EXTENSION;
use crate::config::PipelineConfig;
use crate::error::TgResult;
use crate::hal::types::SampleBatch;
use crate::recording::session_file::{SessionData, SessionHeader, SessionWriter};
use crate::utils::time::current_timestamp_nanos;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub struct SessionRecorder {
    path: PathBuf,
    pending: SessionData,
    writer: Option<SessionWriter>,
    save_interval_samples: usize,
    saves: usize,
}

impl SessionRecorder {
    pub fn new(path: impl Into<PathBuf>, header: SessionHeader, save_interval_seconds: u32) -> Self {
        let save_interval_samples = (header.sampling_rate_hz as usize * save_interval_seconds as usize).max(1);
        Self {
            path: path.into(),
            pending: SessionData::new(header),
            writer: None,
            save_interval_samples,
            saves: 0,
        }
    }

    /// Recorder writing to a timestamped file under `config.recording.directory`
    pub fn for_config(config: &PipelineConfig) -> Self {
        let path = session_path(&config.recording.directory);
        Self::new(path, SessionHeader::from_config(config), config.recording.save_interval_seconds)
    }

    /// Buffer `batch`, saving once a full interval is pending.
    ///
    /// A failed save keeps the samples pending; the next save retries them.
    pub fn record(&mut self, batch: &SampleBatch) -> TgResult<()> {
        self.pending.append(batch)?;
        if self.pending.samples_per_channel() >= self.save_interval_samples {
            self.save()?;
        }
        Ok(())
    }

    /// Write pending samples; creates the file even when nothing was recorded
    pub fn flush(&mut self) -> TgResult<()> {
        if self.has_unsaved() || self.writer.is_none() {
            self.save()?;
        }
        Ok(())
    }

    fn save(&mut self) -> TgResult<()> {
        if self.writer.is_none() {
            self.writer = Some(SessionWriter::create(&self.path, &self.pending.header)?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.append(&self.pending.channels)?;
            debug!(
                path = %self.path.display(),
                chunks = writer.chunks(),
                samples_per_channel = writer.samples_per_channel(),
                "Session saved"
            );
        }
        self.pending.clear_samples();
        self.saves += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples recorded but not yet written
    pub fn pending(&self) -> &SessionData {
        &self.pending
    }

    /// Samples per channel already in the file
    pub fn samples_written(&self) -> usize {
        self.writer.as_ref().map_or(0, SessionWriter::samples_per_channel)
    }

    pub fn saves(&self) -> usize {
        self.saves
    }

    pub fn has_unsaved(&self) -> bool {
        self.pending.samples_per_channel() > 0
    }
}

impl Drop for SessionRecorder {
    fn drop(&mut self) {
        if self.has_unsaved() {
            if let Err(err) = self.save() {
                error!(error = %err, "Failed to save session on drop");
            } else {
                info!(path = %self.path.display(), "Session saved on drop");
            }
        }
    }
}

fn session_path(directory: &Path) -> PathBuf {
    let stamp = current_timestamp_nanos() / 1_000_000;
    directory.join(format!("session_{}.{}", stamp, SESSION_FILE_EXTENSION))
}
