// tests/session_roundtrip.rs
//! Record a live session, replay it, and compare the pipeline outputs

use tempfile::TempDir;
use theta_gamma_core::config::{PipelineConfig, ProcessingMode};
use theta_gamma_core::error::TgError;
use theta_gamma_core::hal::{ReplaySource, SignalSource, SyntheticBoard, SyntheticConfig};
use theta_gamma_core::processing::{Orchestrator, TickOutcome, TickOutput};
use theta_gamma_core::recording::{read_session, SessionHeader, SessionRecorder};

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.signal.channel_count = 4;
    config.signal.window_seconds = 5;
    config.processing.mode = ProcessingMode::TimeDomain;
    config
}

fn drain(orchestrator: &mut Orchestrator, source: &mut dyn SignalSource, max_ticks: usize) -> Vec<TickOutput> {
    let mut state = orchestrator.new_state().unwrap();
    let mut outputs = Vec::new();
    for _ in 0..max_ticks {
        match orchestrator.tick(&mut state, source).unwrap() {
            TickOutcome::Updated(output) => outputs.push(output),
            TickOutcome::Idle => {}
            TickOutcome::Complete => break,
        }
    }
    outputs
}

#[test]
fn test_replay_reproduces_live_ratios() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("live.tgs");
    let config = config();
    let chunk = config.signal.samples_per_tick();

    let live = {
        let mut orchestrator = Orchestrator::new(config.clone()).unwrap();
        orchestrator.attach_recorder(SessionRecorder::new(&path, SessionHeader::from_config(&config), 1));
        let mut board = SyntheticBoard::stepped(SyntheticConfig::default(), 4, chunk).unwrap();
        let outputs = drain(&mut orchestrator, &mut board, 60);
        orchestrator.finish().unwrap();
        outputs
    };

    let session = read_session(&path).unwrap();
    assert_eq!(session.samples_per_channel(), 60 * chunk);
    assert_eq!(session.header.mode, ProcessingMode::TimeDomain);

    let mut orchestrator = Orchestrator::new(config.clone()).unwrap();
    let mut replay = ReplaySource::for_tick_interval(session, config.signal.tick_interval_ms).unwrap();
    orchestrator.check_source(&replay.info()).unwrap();
    let replayed = drain(&mut orchestrator, &mut replay, 1000);

    assert_eq!(replayed.len(), live.len());
    let analyzed = live.iter().filter(|o| o.analyzed_channels() > 0).count();
    assert!(analyzed >= 10);

    for (a, b) in live.iter().zip(&replayed) {
        assert_eq!(a.tick, b.tick);
        assert!((a.timestamp_s - b.timestamp_s).abs() < 1e-12);
        let tolerance = 1e-6 * a.global_ratio.abs().max(1e-12);
        assert!(
            (a.global_ratio - b.global_ratio).abs() <= tolerance,
            "tick {}: {} vs {}",
            a.tick,
            a.global_ratio,
            b.global_ratio
        );
    }
}

#[test]
fn test_corrupted_payload_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("corrupt.tgs");
    let config = config();

    let mut recorder = SessionRecorder::new(&path, SessionHeader::from_config(&config), 15);
    let mut board = SyntheticBoard::stepped(SyntheticConfig::default(), 4, 500).unwrap();
    for _ in 0..4 {
        if let theta_gamma_core::SourcePoll::Samples(batch) = board.pull_available_samples().unwrap() {
            recorder.record(&batch).unwrap();
        }
    }
    recorder.flush().unwrap();
    drop(recorder);

    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xA5;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(read_session(&path), Err(TgError::SessionFormat { .. })));
}

#[test]
fn test_header_corruption_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("header.tgs");

    let mut recorder = SessionRecorder::new(&path, SessionHeader::from_config(&config()), 15);
    recorder.flush().unwrap();
    drop(recorder);

    let mut bytes = std::fs::read(&path).unwrap();
    // First byte of the JSON header
    bytes[12] = b'#';
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(read_session(&path), Err(TgError::SessionFormat { .. })));
}

#[test]
fn test_periodic_saves_append_exact_chunks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chunked.tgs");
    let config = config();

    let mut recorder = SessionRecorder::new(&path, SessionHeader::from_config(&config), 1);
    let mut board = SyntheticBoard::stepped(SyntheticConfig::default(), 4, 100).unwrap();
    let mut expected = vec![Vec::new(); 4];
    for _ in 0..12 {
        if let theta_gamma_core::SourcePoll::Samples(batch) = board.pull_available_samples().unwrap() {
            for (all, channel) in expected.iter_mut().zip(&batch.channels) {
                all.extend_from_slice(channel);
            }
            recorder.record(&batch).unwrap();
            assert!(recorder.pending().samples_per_channel() < 250);
        }
    }
    // 1200 samples: four saves of 300, nothing left over
    assert_eq!(recorder.saves(), 4);
    assert!(!recorder.has_unsaved());

    recorder.flush().unwrap();
    drop(recorder);

    let session = read_session(&path).unwrap();
    assert_eq!(session.channels, expected);
}

#[test]
fn test_corrupted_middle_chunk_detected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("middle.tgs");
    let config = config();

    let mut recorder = SessionRecorder::new(&path, SessionHeader::from_config(&config), 1);
    let mut board = SyntheticBoard::stepped(SyntheticConfig::default(), 4, 250).unwrap();
    for _ in 0..5 {
        if let theta_gamma_core::SourcePoll::Samples(batch) = board.pull_available_samples().unwrap() {
            recorder.record(&batch).unwrap();
        }
    }
    assert_eq!(recorder.saves(), 5);
    drop(recorder);
    assert_eq!(read_session(&path).unwrap().samples_per_channel(), 1250);

    let mut bytes = std::fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x5A;
    std::fs::write(&path, &bytes).unwrap();

    assert!(matches!(read_session(&path), Err(TgError::SessionFormat { .. })));
}
