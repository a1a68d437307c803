use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use granulor_engine::{GranularEngine, ParameterUpdate, RENDER_QUANTUM};

const SR: f32 = 48_000.0;

/// Engine with `density` grains/s of 100 ms, warmed up for one second.
fn warmed(density: f32) -> GranularEngine {
    let mut engine = GranularEngine::with_seed(SR, 0xBE4C);
    engine
        .apply(ParameterUpdate::new().density(density).grain_size(4_800))
        .expect("valid parameters");
    let input = [0.25_f32; RENDER_QUANTUM];
    let mut out = [0.0_f32; RENDER_QUANTUM];
    for _ in 0..375 {
        engine.process(Some(&input[..]), &mut out);
    }
    engine
}

fn bench_block(c: &mut Criterion) {
    // a 128 sample block at 48 kHz lasts 2.67 ms
    let mut group = c.benchmark_group("process_block");
    for density in [20.0_f32, 200.0, 2_000.0] {
        let mut engine = warmed(density);
        let input = [0.25_f32; RENDER_QUANTUM];
        let mut out = [0.0_f32; RENDER_QUANTUM];
        group.bench_with_input(
            BenchmarkId::from_parameter(density),
            &density,
            |b, _| {
                b.iter(|| {
                    engine.process(Some(black_box(&input[..])), &mut out);
                    black_box(out[0])
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_block);
criterion_main!(benches);
