//! Benchmarks for the frame codec.
//!
//! Run with: cargo bench -p meridian-proto

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use meridian_proto::{encode_payload, Frame, InvokeEnvelope, MessageType};

fn invoke_body(payload_size: usize) -> Bytes {
    let envelope = InvokeEnvelope::new("bench.echo", "x".repeat(payload_size));
    encode_payload(&envelope).unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");

    for size in [64, 1024, 8192, 65536].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let frame = Frame::new(MessageType::InvokeRequest.as_u32(), 1, invoke_body(size));

            b.iter(|| {
                let bytes = black_box(&frame).encode();
                black_box(bytes.len())
            });
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_frame");

    for size in [64, 1024, 8192, 65536].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let bytes = Frame::new(MessageType::InvokeRequest.as_u32(), 1, invoke_body(size)).encode();

            b.iter(|| {
                let frame = Frame::decode(black_box(bytes.clone())).unwrap();
                black_box(frame.request_id)
            });
        });
    }

    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");

    for size in [64, 1024, 8192].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let body = invoke_body(size);

            b.iter(|| {
                let bytes =
                    Frame::new(MessageType::InvokeRequest.as_u32(), 42, body.clone()).encode();
                let frame = Frame::decode(black_box(bytes)).unwrap();
                black_box(frame.body.len())
            });
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    c.bench_function("classify_type", |b| {
        b.iter(|| {
            let t = black_box(MessageType::InvokeRequest.as_u32());
            black_box(meridian_proto::is_request(t));
            black_box(meridian_proto::paired_response_type(t))
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip, bench_classify);
criterion_main!(benches);
