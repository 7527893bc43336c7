//! Whole-frame trace throughput, single-threaded and pooled.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use umbra_bench::bench_scenery;
use umbra_core::TraceBuffer;
use umbra_engine::PixelRange;

fn bench_frame(c: &mut Criterion) {
    const RES: usize = 16;
    let mut group = c.benchmark_group("frame_trace");
    group.throughput(Throughput::Elements((RES * RES) as u64));
    for n_threads in [1usize, 2, 4] {
        let scenery = bench_scenery(RES, n_threads);
        group.bench_with_input(
            BenchmarkId::from_parameter(n_threads),
            &scenery,
            |b, scenery| {
                b.iter(|| {
                    let range = PixelRange::full(RES);
                    let mut buffer =
                        TraceBuffer::new(scenery.quantities(), RES, RES, 0);
                    scenery.ray_trace(&range, &mut buffer, None, None).unwrap()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_frame);
criterion_main!(benches);
