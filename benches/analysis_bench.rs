//! Performance benchmarks for the analysis engine

use bnk_analysis_engine::analysis::{estimate_bpm, BpmEvidence};
use bnk_analysis_engine::config::AnalyzerParams;
use bnk_analysis_engine::features::period::compute_window_hints;
use bnk_analysis_engine::{
    run_analysis, AnalysisHints, AnalysisInput, DecodedAudio, EngineConfig, NoopObserver,
    PcmAudio, Role, RunOptions, Tunables,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn click_track(bpm: f64, seconds: f64, sample_rate: u32) -> PcmAudio {
    let total = (seconds * sample_rate as f64).round() as usize;
    let period = (60.0 / bpm * sample_rate as f64).round() as usize;
    let click_len = (0.005 * sample_rate as f64) as usize;
    let samples = (0..total)
        .map(|i| if i % period < click_len { 20000 } else { 0 })
        .collect();
    PcmAudio {
        sample_rate_hz: sample_rate,
        channels: 1,
        samples,
    }
}

fn bench_window_hints(c: &mut Criterion) {
    // 30 seconds of clicks at 22.05kHz
    let pcm = click_track(124.0, 30.0, 22050);
    let params = AnalyzerParams::default();

    c.bench_function("compute_window_hints_30s", |b| {
        b.iter(|| compute_window_hints(black_box(&pcm), black_box(&params)));
    });
}

fn bench_candidate_engine(c: &mut Criterion) {
    let tunables = Tunables::default();
    let windows: Vec<f64> = (0..64).map(|i| 120.0 + (i % 5) as f64 * 0.3).collect();
    let evidence = BpmEvidence::assemble(&windows, &[], None, 60.0, &tunables);

    c.bench_function("estimate_bpm_64_windows", |b| {
        b.iter(|| {
            evidence
                .as_ref()
                .and_then(|e| estimate_bpm(black_box(e), 60.0, black_box(&tunables)))
        });
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let _ = env_logger::try_init();
    let config = EngineConfig::default();
    let hints = AnalysisHints {
        key_mode_hint_windows: vec!["A minor".to_string(); 8],
        ..Default::default()
    };
    let audio = DecodedAudio::from_pcm(click_track(124.0, 30.0, 22050), "wav").with_hints(hints);

    c.bench_function("run_analysis_guest_30s", |b| {
        b.iter(|| {
            run_analysis(
                AnalysisInput::Audio(black_box(audio.clone())),
                Role::Guest,
                &config,
                &NoopObserver,
                RunOptions::default(),
            )
        });
    });
}

criterion_group!(
    benches,
    bench_window_hints,
    bench_candidate_engine,
    bench_full_pipeline
);
criterion_main!(benches);
