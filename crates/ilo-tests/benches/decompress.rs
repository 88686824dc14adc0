use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ilo_builder::compression;
use ilo_decoder::{ContainerDecoder, Decompressor, Lzss};
use ilo_tests::{sample_image, three_image_builder};

fn bench_lzss_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("lzss_throughput");
    let lzss = Lzss::default();

    for size_kb in [4, 64, 256] {
        let data = sample_image("kernel_main", size_kb * 1024);
        let packed = compression::compress(&data);

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("decompress", format!("{size_kb}kb")),
            &packed,
            |b, p| {
                b.iter(|| {
                    let mut out = Vec::with_capacity(data.len());
                    lzss.decompress(p, &mut out).unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_lzss_literals(c: &mut Criterion) {
    let data = sample_image("elf", 64 * 1024);
    let stored = compression::store(&data);
    let lzss = Lzss::default();

    c.bench_function("decompress_literals_64kb", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(data.len());
            lzss.decompress(&stored, &mut out).unwrap()
        });
    });
}

fn bench_decode_container(c: &mut Criterion) {
    let fw = three_image_builder().build().unwrap();
    let decoder = ContainerDecoder::default();

    let mut group = c.benchmark_group("decode_container");
    group.throughput(Throughput::Bytes(fw.bytes.len() as u64));
    group.bench_function("three_images", |b| {
        b.iter(|| decoder.decode(&fw.bytes).unwrap());
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_lzss_throughput,
    bench_lzss_literals,
    bench_decode_container
);
criterion_main!(benches);
