// src/recording/session_file.rs
//! Binary session file (`.tgs`)
//!
//! Layout, all integers little-endian:
//!
//! | field          | size                         |
//! |----------------|------------------------------|
//! | magic          | 8 bytes, `TGSESS02`          |
//! | header length  | u32                          |
//! | header         | JSON [`SessionHeader`]       |
//! | chunk*         | see below, zero or more      |
//!
//! Each chunk holds the samples appended by one save:
//!
//! | field              | size                        |
//! |--------------------|-----------------------------|
//! | samples/channel    | u32                         |
//! | block length       | u32                         |
//! | CRC32              | u32, over the raw chunk     |
//! | block              | LZ4, size prepended         |
//!
//! A raw chunk is channel-major `f64` samples. The header is written through a
//! temporary sibling and renamed into place; chunks are then appended, and a
//! failed append truncates the file back to the last complete chunk.

use crate::config::constants::recording::{SESSION_FORMAT_VERSION, SESSION_MAGIC};
use crate::config::{BandDefinition, PipelineConfig, ProcessingMode};
use crate::error::{IntoTgError, TgError, TgResult};
use crate::hal::types::SampleBatch;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const SAMPLE_BYTES: usize = std::mem::size_of::<f64>();
const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Session metadata stored ahead of the samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub format_version: u32,
    pub sampling_rate_hz: u32,
    pub channel_count: usize,
    pub mode: ProcessingMode,
    pub theta_band: BandDefinition,
    pub gamma_band: BandDefinition,
    pub window_seconds: u32,
}

impl SessionHeader {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            format_version: SESSION_FORMAT_VERSION,
            sampling_rate_hz: config.signal.sampling_rate_hz,
            channel_count: config.signal.channel_count,
            mode: config.processing.mode,
            theta_band: config.bands.theta,
            gamma_band: config.bands.gamma,
            window_seconds: config.signal.window_seconds,
        }
    }
}

/// Recorded samples of every channel plus their header
#[derive(Debug, Clone, PartialEq)]
pub struct SessionData {
    pub header: SessionHeader,
    pub channels: Vec<Vec<f64>>,
}

impl SessionData {
    pub fn new(header: SessionHeader) -> Self {
        let channels = vec![Vec::new(); header.channel_count];
        Self { header, channels }
    }

    pub fn append(&mut self, batch: &SampleBatch) -> TgResult<()> {
        check_shape(self.channels.len(), &batch.channels)?;
        for (recorded, incoming) in self.channels.iter_mut().zip(&batch.channels) {
            recorded.extend_from_slice(incoming);
        }
        Ok(())
    }

    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples_per_channel() as f64 / self.header.sampling_rate_hz as f64
    }

    /// Drop the samples, keeping the header and channel layout
    pub fn clear_samples(&mut self) {
        for channel in &mut self.channels {
            channel.clear();
        }
    }
}

/// Append-only writer for one session file
#[derive(Debug)]
pub struct SessionWriter {
    path: PathBuf,
    file: File,
    channel_count: usize,
    committed_len: u64,
    samples_per_channel: usize,
    chunks: usize,
}

impl SessionWriter {
    /// Atomically create (or replace) `path` holding only the header
    pub fn create(path: &Path, header: &SessionHeader) -> TgResult<Self> {
        let preamble = encode_preamble(path, header)?;
        let mut file = persist_atomically(path, &[&preamble])?;
        let committed_len = file.seek(SeekFrom::End(0)).tg_io("seek session file")?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            channel_count: header.channel_count,
            committed_len,
            samples_per_channel: 0,
            chunks: 0,
        })
    }

    /// Append one chunk; empty input writes nothing
    pub fn append(&mut self, channels: &[Vec<f64>]) -> TgResult<()> {
        let samples = check_shape(self.channel_count, channels)?;
        if samples == 0 {
            return Ok(());
        }

        let chunk = encode_chunk(channels, samples);
        let written = self
            .file
            .write_all(&chunk)
            .and_then(|_| self.file.sync_data())
            .tg_io("append session chunk");

        if let Err(err) = written {
            // Leave the file ending on the last complete chunk
            let _ = self.file.set_len(self.committed_len);
            let _ = self.file.seek(SeekFrom::Start(self.committed_len));
            return Err(err);
        }

        self.committed_len += chunk.len() as u64;
        self.samples_per_channel += samples;
        self.chunks += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples per channel written so far
    pub fn samples_per_channel(&self) -> usize {
        self.samples_per_channel
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }
}

/// Atomically write `data` to `path` as a single-chunk session
pub fn write_session(path: &Path, data: &SessionData) -> TgResult<()> {
    let preamble = encode_preamble(path, &data.header)?;
    let samples = check_shape(data.header.channel_count, &data.channels)?;
    let chunk = if samples == 0 {
        Vec::new()
    } else {
        encode_chunk(&data.channels, samples)
    };
    persist_atomically(path, &[&preamble, &chunk])?;
    Ok(())
}

/// Read and validate a session file, concatenating its chunks
pub fn read_session(path: &Path) -> TgResult<SessionData> {
    let bytes = std::fs::read(path).tg_io("read session file")?;
    let mut cursor = ByteCursor { bytes: &bytes, position: 0, path };

    if cursor.take(SESSION_MAGIC.len())? != SESSION_MAGIC {
        return Err(TgError::session_format(path, "bad magic"));
    }

    let header_len = cursor.read_u32()? as usize;
    if header_len > MAX_HEADER_BYTES {
        return Err(TgError::session_format(path, format!("header length {} too large", header_len)));
    }
    let header: SessionHeader = serde_json::from_slice(cursor.take(header_len)?)
        .map_err(|e| TgError::session_format(path, format!("header: {}", e)))?;

    if header.format_version != SESSION_FORMAT_VERSION {
        return Err(TgError::session_format(
            path,
            format!("unsupported format version {}", header.format_version),
        ));
    }
    if header.channel_count == 0 || header.sampling_rate_hz == 0 {
        return Err(TgError::session_format(path, "empty channel layout or sampling rate"));
    }

    let mut data = SessionData::new(header);
    let mut index = 0usize;
    while !cursor.is_at_end() {
        let samples = cursor.read_u32()? as usize;
        let block_len = cursor.read_u32()? as usize;
        let checksum = cursor.read_u32()?;
        let raw = lz4_flex::decompress_size_prepended(cursor.take(block_len)?)
            .map_err(|e| TgError::session_format(path, format!("chunk {}: {}", index, e)))?;

        if crc32fast::hash(&raw) != checksum {
            return Err(TgError::session_format(path, format!("chunk {} checksum mismatch", index)));
        }
        let expected = data.header.channel_count * samples * SAMPLE_BYTES;
        if samples == 0 || raw.len() != expected {
            return Err(TgError::session_format(
                path,
                format!("chunk {} has {} bytes, expected {}", index, raw.len(), expected),
            ));
        }

        for (channel, bytes) in data.channels.iter_mut().zip(raw.chunks_exact(samples * SAMPLE_BYTES)) {
            channel.extend(bytes.chunks_exact(SAMPLE_BYTES).map(|b| {
                let mut sample = [0u8; SAMPLE_BYTES];
                sample.copy_from_slice(b);
                f64::from_le_bytes(sample)
            }));
        }
        index += 1;
    }

    Ok(data)
}

fn check_shape(channel_count: usize, channels: &[Vec<f64>]) -> TgResult<usize> {
    if channels.len() != channel_count {
        return Err(TgError::invalid_data(
            "session batch",
            format!("expected {} channels, got {}", channel_count, channels.len()),
        ));
    }
    let samples = channels.first().map_or(0, Vec::len);
    if channels.iter().any(|c| c.len() != samples) {
        return Err(TgError::invalid_data("session batch", "channels differ in length"));
    }
    Ok(samples)
}

fn encode_preamble(path: &Path, header: &SessionHeader) -> TgResult<Vec<u8>> {
    let json = serde_json::to_vec(header)
        .map_err(|e| TgError::session_format(path, format!("header encoding: {}", e)))?;

    let mut bytes = Vec::with_capacity(SESSION_MAGIC.len() + 4 + json.len());
    bytes.extend_from_slice(SESSION_MAGIC);
    bytes.extend_from_slice(&(json.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&json);
    Ok(bytes)
}

fn encode_chunk(channels: &[Vec<f64>], samples: usize) -> Vec<u8> {
    let mut raw = Vec::with_capacity(channels.len() * samples * SAMPLE_BYTES);
    for channel in channels {
        for sample in channel {
            raw.extend_from_slice(&sample.to_le_bytes());
        }
    }
    let block = lz4_flex::compress_prepend_size(&raw);

    let mut chunk = Vec::with_capacity(12 + block.len());
    chunk.extend_from_slice(&(samples as u32).to_le_bytes());
    chunk.extend_from_slice(&(block.len() as u32).to_le_bytes());
    chunk.extend_from_slice(&crc32fast::hash(&raw).to_le_bytes());
    chunk.extend_from_slice(&block);
    chunk
}

fn persist_atomically(path: &Path, parts: &[&[u8]]) -> TgResult<File> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(directory).tg_io("create session directory")?;

    let mut file = tempfile::NamedTempFile::new_in(directory).tg_io("create session temp file")?;
    for part in parts {
        file.write_all(part).tg_io("write session file")?;
    }
    file.as_file().sync_all().tg_io("sync session file")?;

    file.persist(path).map_err(|e| TgError::io("persist session file", e.error))
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    position: usize,
    path: &'a Path,
}

impl<'a> ByteCursor<'a> {
    fn take(&mut self, len: usize) -> TgResult<&'a [u8]> {
        let end = self.position + len;
        if end > self.bytes.len() {
            return Err(TgError::session_format(self.path, "truncated file"));
        }
        let bytes = self.bytes;
        self.position = end;
        Ok(&bytes[end - len..end])
    }

    fn read_u32(&mut self) -> TgResult<u32> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(raw))
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn header() -> SessionHeader {
        SessionHeader::from_config(&PipelineConfig::default())
    }

    fn sample_session() -> SessionData {
        let mut data = SessionData::new(header());
        let batch = SampleBatch::new((0..8).map(|c| vec![c as f64, 0.1 * c as f64, -1e-3]).collect());
        data.append(&batch).unwrap();
        data.append(&batch).unwrap();
        data
    }

    fn block(offset: f64, n: usize) -> Vec<Vec<f64>> {
        (0..8)
            .map(|c| (0..n).map(|i| offset + c as f64 * 1000.0 + i as f64).collect())
            .collect()
    }

    #[test]
    fn test_write_then_read_is_exact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.tgs");
        let data = sample_session();

        write_session(&path, &data).unwrap();
        let restored = read_session(&path).unwrap();

        assert_eq!(restored, data);
        assert_eq!(restored.samples_per_channel(), 6);
    }

    #[test]
    fn test_appended_chunks_concatenate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chunks.tgs");

        let mut writer = SessionWriter::create(&path, &header()).unwrap();
        assert_eq!(read_session(&path).unwrap().samples_per_channel(), 0);

        writer.append(&block(0.0, 5)).unwrap();
        writer.append(&block(0.5, 0)).unwrap();
        writer.append(&block(0.25, 3)).unwrap();
        assert_eq!(writer.chunks(), 2);
        assert_eq!(writer.samples_per_channel(), 8);

        let restored = read_session(&path).unwrap();
        assert_eq!(restored.samples_per_channel(), 8);
        for (c, channel) in restored.channels.iter().enumerate() {
            let mut expected = block(0.0, 5)[c].clone();
            expected.extend(&block(0.25, 3)[c]);
            assert_eq!(channel, &expected);
        }
    }

    #[test]
    fn test_writer_rejects_wrong_shape() {
        let dir = TempDir::new().unwrap();
        let mut writer = SessionWriter::create(&dir.path().join("s.tgs"), &header()).unwrap();
        assert!(writer.append(&vec![vec![1.0]; 4]).is_err());
        assert!(writer.append(&(0..8).map(|c| vec![0.0; c]).collect::<Vec<_>>()).is_err());
        assert_eq!(writer.chunks(), 0);
    }

    #[test]
    fn test_clear_samples_keeps_layout() {
        let mut data = sample_session();
        data.clear_samples();
        assert_eq!(data.channels.len(), 8);
        assert_eq!(data.samples_per_channel(), 0);
    }

    #[test]
    fn test_append_rejects_wrong_shape() {
        let mut data = sample_session();
        assert!(data.append(&SampleBatch::new(vec![vec![1.0]; 4])).is_err());
        assert!(data
            .append(&SampleBatch::new((0..8).map(|c| vec![0.0; c]).collect()))
            .is_err());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.tgs");
        std::fs::write(&path, b"NOTASESSIONFILE").unwrap();
        assert!(matches!(read_session(&path), Err(TgError::SessionFormat { .. })));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.tgs");
        write_session(&path, &sample_session()).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..12]).unwrap();
        assert!(matches!(read_session(&path), Err(TgError::SessionFormat { .. })));

        // Cut inside the chunk
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        assert!(matches!(read_session(&path), Err(TgError::SessionFormat { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = read_session(&dir.path().join("absent.tgs"));
        assert!(matches!(result, Err(TgError::Io { .. })));
    }

    #[test]
    fn test_empty_session_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("empty.tgs");
        let data = SessionData::new(header());

        write_session(&path, &data).unwrap();
        let restored = read_session(&path).unwrap();
        assert_eq!(restored.channels.len(), 8);
        assert_eq!(restored.duration_seconds(), 0.0);
    }
}
