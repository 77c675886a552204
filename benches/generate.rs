//! Benchmark: parse, resolve and emit for a synthetic protocol of growing size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use packetgen::{generate, parse, GenerateOptions, Protocol};

/// `n` packets of every kind, each referring to a shared struct.
fn synthetic_source(n: usize) -> String {
    let mut src = String::from(
        "package bench\n\ntype Entry struct {\n\tName string\n\tSize uint64\n\tTags []string\n\tDigest [32]byte\n}\n",
    );
    for i in 0..n {
        src.push_str(&format!(
            "\n// @SimplePacket: PKT_PING_{i}, {}\ntype Ping{i} struct {{}}\n",
            3 * i
        ));
        src.push_str(&format!(
            "\n// @Packet: PKT_REQ_{i}, {}\ntype Req{i} struct {{\n\tA, B uint32\n\tC int16\n\tLabel string\n\tE Entry\n\tRows [4]Entry\n\tRaw []byte\n}}\n",
            3 * i + 1
        ));
        src.push_str(&format!(
            "\n// @VLFPacket: PKT_LIST_{i}, {:#x}\ntype List{i} struct {{\n\tItems []Entry\n}}\n",
            3 * i + 2
        ));
    }
    src
}

fn bench_generate(c: &mut Criterion) {
    let options = GenerateOptions::default();
    let mut group = c.benchmark_group("generate");
    for n in [1usize, 16, 128] {
        let src = synthetic_source(n);
        group.throughput(Throughput::Bytes(src.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", n), &src, |b, src| {
            b.iter(|| parse(black_box(src)).unwrap())
        });
        let file = parse(&src).unwrap();
        group.bench_with_input(BenchmarkId::new("resolve", n), &file, |b, file| {
            b.iter(|| Protocol::build(black_box(file)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("end_to_end", n), &src, |b, src| {
            b.iter(|| generate(black_box(src), &options).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
