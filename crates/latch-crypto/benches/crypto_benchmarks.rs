//! Cryptography benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use latch_crypto::pake::{Initiator, JoinerState};
use latch_crypto::{hash::blake3, open, seal_frame};

fn bench_blake3(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash/blake3");

    for size in [1024, 65536, 1048576] {
        let data = vec![0u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(format!("{} bytes", size), &data, |b, data| {
            b.iter(|| blake3::hash(black_box(data)));
        });
    }

    group.finish();
}

fn bench_seal(c: &mut Criterion) {
    let mut group = c.benchmark_group("symmetric/seal");
    let key = [0u8; 32];

    for size in [128, 1024, 16384] {
        let data = vec![0u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(format!("{} bytes", size), &data, |b, data| {
            b.iter(|| seal_frame(black_box(&key), black_box(data)));
        });
    }

    let frame = seal_frame(&key, &[0u8; 1024]).unwrap();
    group.bench_function("open/1024 bytes", |b| {
        b.iter(|| open(black_box(&key), black_box(&frame)));
    });

    group.finish();
}

fn bench_cpace(c: &mut Criterion) {
    let mut group = c.benchmark_group("pake/cpace");

    group.bench_function("joiner_start", |b| {
        b.iter(|| JoinerState::start(black_box("correct horse battery staple"), b"slot-1"));
    });

    let (joiner_msg, _state) = JoinerState::start("correct horse battery staple", b"slot-1");
    group.bench_function("initiator_exchange", |b| {
        b.iter(|| {
            Initiator::exchange(
                black_box("correct horse battery staple"),
                b"slot-1",
                black_box(&joiner_msg),
            )
        });
    });

    group.finish();
}

criterion_group!(benches, bench_blake3, bench_seal, bench_cpace);
criterion_main!(benches);
