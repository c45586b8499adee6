//! Status register decoding benchmarks.
//!
//! Decoding runs on every poll of the card, so it should stay well below
//! a microsecond for any register value.

use criterion::{Criterion, criterion_group, criterion_main};
use rtc_common::card::status::{decode_errors, decode_list_status};
use std::hint::black_box;

fn bench_decode_errors(c: &mut Criterion) {
    c.bench_function("decode_errors_message_all_bits", |b| {
        b.iter(|| decode_errors(black_box(u32::MAX)).message());
    });

    c.bench_function("decode_errors_message_empty", |b| {
        b.iter(|| decode_errors(black_box(0)).message());
    });
}

fn bench_decode_list_status(c: &mut Criterion) {
    c.bench_function("decode_list_status_pairs", |b| {
        b.iter(|| decode_list_status(black_box(0xA5)).pairs());
    });
}

criterion_group!(benches, bench_decode_errors, bench_decode_list_status);
criterion_main!(benches);
