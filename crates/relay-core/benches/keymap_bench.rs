//! Criterion benchmarks for browser key resolution.
//!
//! Every keyboard command a viewer sends goes through `resolve_dom_key` on
//! the target, so this measures the per-event lookup cost.
//!
//! Run with:
//! ```bash
//! cargo bench --package relay-core --bench keymap_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use relay_core::keymap::{hid_to_windows_vk, hid_to_x11_keysym, resolve_dom_key, HidKeyCode};

/// (key, code) pairs as a browser would send them.
const BENCH_EVENTS: &[(&str, &str)] = &[
    ("a", "KeyA"),
    ("Z", "KeyZ"),
    ("Enter", "Enter"),
    ("Shift", "ShiftLeft"),
    ("ArrowDown", "ArrowDown"),
    ("F12", "F12"),
    ("?", ""),
    ("Unidentified", ""),
];

fn bench_resolve_dom_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_resolve");

    group.bench_function("resolve_by_code", |b| {
        b.iter(|| resolve_dom_key(black_box("a"), black_box("KeyA")))
    });

    group.bench_function("resolve_by_key_fallback", |b| {
        b.iter(|| resolve_dom_key(black_box("?"), black_box("")))
    });

    group.bench_function("resolve_mixed_batch", |b| {
        b.iter(|| {
            for &(key, code) in BENCH_EVENTS {
                black_box(resolve_dom_key(black_box(key), black_box(code)));
            }
        })
    });

    group.finish();
}

fn bench_native_codes(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_native");

    group.bench_function("hid_to_windows_vk_last_row", |b| {
        b.iter(|| hid_to_windows_vk(black_box(HidKeyCode::MetaRight)))
    });

    group.bench_function("hid_to_x11_keysym_last_row", |b| {
        b.iter(|| hid_to_x11_keysym(black_box(HidKeyCode::MetaRight)))
    });

    group.finish();
}

criterion_group!(benches, bench_resolve_dom_key, bench_native_codes);
criterion_main!(benches);
