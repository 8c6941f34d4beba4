//! Benchmarks for RV64I decode performance.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dinorisc_isa::decode;

/// A realistic mix of instruction words: prologue, arithmetic, memory ops,
/// a branch, and an epilogue.
const WORDS: &[u32] = &[
    0xff01_0113, // addi sp, sp, -16
    0x00a1_3423, // sd a0, 8(sp)
    0x0081_3503, // ld a0, 8(sp)
    0x00b5_0533, // add a0, a0, a1
    0x40b5_0533, // sub a0, a0, a1
    0x0035_1513, // slli a0, a0, 3
    0x00b5_053b, // addw a0, a0, a1
    0x1234_5537, // lui a0, 0x12345
    0x0000_0517, // auipc a0, 0
    0x00b5_0863, // beq a0, a1, 16
    0x0101_0113, // addi sp, sp, 16
    0x0000_8067, // ret
];

fn bench_decode_single(c: &mut Criterion) {
    c.bench_function("decode_addi", |b| {
        b.iter(|| decode(black_box(0xff01_0113), black_box(0x1_0000)))
    });
    c.bench_function("decode_branch", |b| {
        b.iter(|| decode(black_box(0x00b5_0863), black_box(0x1_0000)))
    });
    c.bench_function("decode_illegal", |b| {
        b.iter(|| decode(black_box(0x0000_0000), black_box(0x1_0000)))
    });
}

fn bench_decode_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_stream");
    group.throughput(Throughput::Bytes((WORDS.len() * 4) as u64));
    group.bench_function("mixed_function_body", |b| {
        b.iter(|| {
            for (i, &word) in WORDS.iter().enumerate() {
                let _ = decode(black_box(word), 0x1_0000 + (i as u64) * 4);
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_decode_single, bench_decode_stream);
criterion_main!(benches);
