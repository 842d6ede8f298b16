//! Criterion benchmark for the frame throttle admission check.
//!
//! Run with:
//! ```bash
//! cargo bench --package relay-core --bench throttle_bench
//! ```

use std::time::{Duration, Instant};

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use relay_core::FrameThrottle;

fn bench_admit(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_throttle");

    group.bench_function("admit_30fps_stream_at_10fps", |b| {
        let t0 = Instant::now();
        b.iter(|| {
            let mut throttle = FrameThrottle::from_fps(10);
            for i in 0..30u64 {
                black_box(throttle.admit(t0 + Duration::from_micros(i * 33_334)));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_admit);
criterion_main!(benches);
