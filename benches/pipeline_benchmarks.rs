use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::f64::consts::PI;
use theta_gamma_core::acquisition::ChannelRingBuffer;
use theta_gamma_core::config::{BandDefinition, PipelineConfig, ProcessingMode, WaveletConfig};
use theta_gamma_core::hal::{SyntheticBoard, SyntheticConfig};
use theta_gamma_core::processing::filter_bank::{band_pass, preprocess};
use theta_gamma_core::processing::{ChannelProcessor, Orchestrator, WaveletAnalyzer};

const SAMPLE_RATES: &[u32] = &[125, 250];
const WINDOW_SECONDS: &[u32] = &[5, 10, 15];
const CHANNEL_COUNTS: &[usize] = &[4, 8, 16];

fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
}

fn benchmark_ring_buffer(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_buffer");

    for &seconds in WINDOW_SECONDS {
        let capacity = 250 * seconds as usize;
        group.throughput(Throughput::Elements(20));

        group.bench_with_input(BenchmarkId::new("extend_20", seconds), &capacity, |b, &capacity| {
            let mut ring = ChannelRingBuffer::new(capacity).unwrap();
            let block = vec![1.0; 20];
            b.iter(|| ring.extend_from_slice(black_box(&block)));
        });

        group.bench_with_input(BenchmarkId::new("snapshot", seconds), &capacity, |b, &capacity| {
            let mut ring = ChannelRingBuffer::new(capacity).unwrap();
            ring.extend_from_slice(&vec![1.0; capacity]);
            b.iter(|| black_box(ring.snapshot()));
        });
    }

    group.finish();
}

fn benchmark_filters(c: &mut Criterion) {
    let mut group = c.benchmark_group("filters");

    for &fs in SAMPLE_RATES {
        let fs = fs as f64;
        let window = sine(6.0, fs, (fs * 10.0) as usize);

        group.bench_with_input(BenchmarkId::new("preprocess", fs), &window, |b, window| {
            b.iter(|| preprocess(black_box(window), fs).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("theta_band_pass", fs), &window, |b, window| {
            b.iter(|| band_pass(black_box(window), 4.0, 8.0, 6, fs).unwrap());
        });
    }

    group.finish();
}

fn benchmark_wavelet(c: &mut Criterion) {
    let mut group = c.benchmark_group("wavelet");

    for &seconds in WINDOW_SECONDS {
        let window = sine(6.0, 250.0, 250 * seconds as usize);
        let analyzer = WaveletAnalyzer::new(&WaveletConfig::default(), 250.0, window.len()).unwrap();
        analyzer.transform(&window);

        group.bench_with_input(BenchmarkId::new("transform", seconds), &window, |b, window| {
            b.iter(|| {
                let spectrogram = analyzer.transform(black_box(window));
                black_box(spectrogram.band_power(&BandDefinition::theta()))
            });
        });
    }

    group.finish();
}

fn benchmark_channel_processor(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_processor");

    for mode in [ProcessingMode::TimeDomain, ProcessingMode::TimeFrequency] {
        let mut config = PipelineConfig::default();
        config.processing.mode = mode;
        let processor = ChannelProcessor::new(&config).unwrap();
        let window = sine(6.0, 250.0, config.signal.window_capacity());

        group.bench_with_input(BenchmarkId::new("process", mode), &window, |b, window| {
            b.iter(|| processor.process(0, black_box(window)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    group.sample_size(20);

    for &channels in CHANNEL_COUNTS {
        for parallel in [false, true] {
            let mut config = PipelineConfig::default();
            config.signal.channel_count = channels;
            config.processing.mode = ProcessingMode::TimeDomain;
            config.processing.parallel_channels = parallel;

            let mut orchestrator = Orchestrator::new(config.clone()).unwrap();
            let mut state = orchestrator.new_state().unwrap();
            let mut board = SyntheticBoard::stepped(
                SyntheticConfig {
                    board_channels: channels,
                    ..Default::default()
                },
                channels,
                config.signal.samples_per_tick(),
            )
            .unwrap();

            // Prime the windows so every tick runs the full analysis
            for _ in 0..130 {
                orchestrator.tick(&mut state, &mut board).unwrap();
            }

            let label = format!("{}ch_{}", channels, if parallel { "parallel" } else { "serial" });
            group.bench_function(BenchmarkId::new("time_domain", label), |b| {
                b.iter(|| orchestrator.tick(&mut state, &mut board).unwrap());
            });
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_ring_buffer,
    benchmark_filters,
    benchmark_wavelet,
    benchmark_channel_processor,
    benchmark_tick
);
criterion_main!(benches);
