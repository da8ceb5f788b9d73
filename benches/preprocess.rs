//! Micro-benchmarks for voice-sample preprocessing (resampling, silence
//! trimming, full upload pipeline).
//!
//! Run with: `cargo bench -- preprocess`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::f32::consts::PI;
use std::hint::black_box;
use voice_clone_web::audio::{
    encode_wav_pcm16, quantize_pcm16, resample, trim_silence, TrimConfig, Waveform,
};
use voice_clone_web::{process_upload, InputLimits, PreprocessConfig};

/// 200 Hz tone framed by half a second of silence on each side.
fn padded_tone(duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let pad = vec![0.0f32; sample_rate as usize / 2];
    let n = (duration_secs * sample_rate as f32) as usize;
    let mut samples = pad.clone();
    samples.extend((0..n).map(|i| 0.5 * (2.0 * PI * 200.0 * i as f32 / sample_rate as f32).sin()));
    samples.extend(pad);
    samples
}

fn bench_resample(c: &mut Criterion) {
    let mut group = c.benchmark_group("resample");
    for from_rate in [16000u32, 44100, 48000] {
        for duration in [2.0, 10.0] {
            let audio = Waveform::new(padded_tone(duration, from_rate), from_rate);
            group.bench_with_input(
                BenchmarkId::from_parameter(format!("{from_rate}to24000_{duration}s")),
                &audio,
                |b, audio| b.iter(|| resample(black_box(audio), 24000).unwrap()),
            );
        }
    }
    group.finish();
}

fn bench_trim(c: &mut Criterion) {
    let config = TrimConfig::default();
    let mut group = c.benchmark_group("trim_silence");
    for duration in [2.0, 10.0, 30.0] {
        let samples = padded_tone(duration, 24000);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{duration}s")),
            &samples,
            |b, samples| b.iter(|| trim_silence(black_box(samples), &config)),
        );
    }
    group.finish();
}

fn bench_process_upload(c: &mut Criterion) {
    let limits = InputLimits::default();
    let config = PreprocessConfig::default();
    let wav = encode_wav_pcm16(&quantize_pcm16(&padded_tone(8.0, 44100)), 44100).unwrap();

    c.bench_function("process_upload_44k_8s", |b| {
        b.iter(|| process_upload("voice.wav", black_box(wav.clone()), &limits, &config).unwrap())
    });
}

criterion_group!(benches, bench_resample, bench_trim, bench_process_upload);
criterion_main!(benches);
