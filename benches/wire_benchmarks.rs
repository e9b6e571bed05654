// ABOUTME: Benchmark suite for wire encode/decode throughput
// ABOUTME: Measures header round-trips and per-message-type body costs at a few representative sizes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use stream_agent::wire::{
    decode_header, decode_notify_error, decode_start_stop, encode_capabilities_reply,
    encode_cursor_move, encode_cursor_set, encode_data_header, encode_format, encode_header,
    encode_start_stop, MessageType, StartStop,
};

fn sample_notify_error_body(text_len: usize) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + text_len);
    body.extend_from_slice(&42u32.to_le_bytes());
    body.extend(std::iter::repeat(b'x').take(text_len));
    body
}

fn bench_header_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("header_roundtrip");
    group.measurement_time(Duration::from_secs(5));

    let encoded = encode_header(MessageType::Data, 4096);
    group.bench_function("decode", |b| {
        b.iter(|| decode_header(black_box(&encoded)).unwrap())
    });
    group.bench_function("encode", |b| {
        b.iter(|| encode_header(black_box(MessageType::Data), black_box(4096)))
    });

    group.finish();
}

fn bench_start_stop(c: &mut Criterion) {
    let mut group = c.benchmark_group("start_stop");
    group.measurement_time(Duration::from_secs(5));

    let value = StartStop { streaming: true, codecs: vec![1, 2, 3, 4] };
    let body = encode_start_stop(&value);

    group.bench_function("decode", |b| {
        b.iter(|| decode_start_stop(black_box(&body)).unwrap())
    });
    group.bench_function("encode", |b| b.iter(|| encode_start_stop(black_box(&value))));

    group.finish();
}

fn bench_notify_error(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify_error");
    group.measurement_time(Duration::from_secs(5));

    for &text_len in &[0usize, 64, 256, 1024] {
        let body = sample_notify_error_body(text_len);
        group.bench_with_input(BenchmarkId::new("decode", text_len), &body, |b, body| {
            b.iter(|| decode_notify_error(black_box(body)).unwrap())
        });
    }

    group.finish();
}

fn bench_format_and_data_headers(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_and_data_headers");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("encode_format", |b| {
        b.iter(|| encode_format(black_box(1920), black_box(1080), black_box(1)))
    });
    group.bench_function("encode_data_header", |b| {
        b.iter(|| encode_data_header(black_box(64 * 1024)))
    });
    group.bench_function("encode_capabilities_reply", |b| {
        b.iter(encode_capabilities_reply)
    });

    group.finish();
}

fn bench_cursor_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_messages");
    group.measurement_time(Duration::from_secs(5));

    let pixels = vec![0u8; 32 * 32 * 4];
    group.bench_function("encode_cursor_set_32x32", |b| {
        b.iter(|| encode_cursor_set(black_box(0), black_box(0), black_box(32), black_box(32), black_box(&pixels)))
    });
    group.bench_function("encode_cursor_move", |b| {
        b.iter(|| encode_cursor_move(black_box(100), black_box(200)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_header_roundtrip,
    bench_start_stop,
    bench_notify_error,
    bench_format_and_data_headers,
    bench_cursor_messages
);
criterion_main!(benches);
