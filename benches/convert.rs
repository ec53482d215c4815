use std::hint::black_box;
use std::num::NonZeroUsize;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use encoding_bridge::{Detector, EncodingName, NameTable, PrimaryTranscoder, Transcoder};

fn name_lookup(c: &mut Criterion) {
    let table = NameTable::global();
    let mut group = c.benchmark_group("name_to_id");
    for name in ["utf-8", "shift_jis", "cp1025", "ibm420", "iso-8859-15", "x-mac-korean"] {
        group.bench_function(name, |b| b.iter(|| table.name_to_id(black_box(name))));
    }
    group.finish();
}

fn growable_buffer(c: &mut Criterion) {
    let input = "The quick brown fox jumps over the lazy dog. ".repeat(256);
    let from = EncodingName::new("utf-8").unwrap();
    let to = EncodingName::new("utf-32le").unwrap();

    let mut group = c.benchmark_group("ascii_to_utf32");
    group.throughput(Throughput::Bytes(input.len() as u64));
    for chunk in [None, Some(64), Some(4096)] {
        let transcoder = match chunk {
            Some(size) => {
                PrimaryTranscoder::new().with_chunk_size(NonZeroUsize::new(size).unwrap())
            }
            None => PrimaryTranscoder::new(),
        };
        let label = chunk.map_or("input_len".to_string(), |size| format!("chunk_{size}"));
        group.bench_function(label, |b| {
            b.iter(|| transcoder.transcode(black_box(input.as_bytes()), &from, &to))
        });
    }
    group.finish();
}

fn legacy_round_trip(c: &mut Criterion) {
    let text = "编码转换测试，字符集检测与转换。".repeat(64);
    c.bench_function("utf8_to_gb18030", |b| {
        b.iter(|| encoding_bridge::convert(black_box(text.as_bytes()), "utf-8", "gb18030", true))
    });
}

fn detection(c: &mut Criterion) {
    let (sjis, _, _) = encoding_rs::SHIFT_JIS.encode(&"これは日本語のテキストです。".repeat(64));
    let utf8 = "Grüße aus Köln, schöne Straße. ".repeat(64);
    let detector = Detector::new();

    let mut group = c.benchmark_group("detect");
    group.bench_function("shift_jis", |b| b.iter(|| detector.detect(black_box(&sjis))));
    group.bench_function("utf8", |b| b.iter(|| detector.detect(black_box(utf8.as_bytes()))));
    group.finish();
}

criterion_group!(benches, name_lookup, growable_buffer, legacy_round_trip, detection);
criterion_main!(benches);
