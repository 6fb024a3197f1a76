use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mmbloom::{Bitmap, BloomFilter, ScalingBloomFilter};

pub fn bitmap_bench(c: &mut Criterion) {
    let mut bitmap = Bitmap::new(1024, None, None).unwrap();

    c.bench_function("bitmap_set_true", |b| b.iter(|| bitmap.set(42, 1)));
    c.bench_function("bitmap_set_false", |b| b.iter(|| bitmap.set(42, 0)));
    c.bench_function("bitmap_get_hit", |b| {
        bitmap.set(42, 1);
        b.iter(|| black_box(bitmap.get(42)))
    });
    c.bench_function("bitmap_get_miss", |b| b.iter(|| black_box(bitmap.get(100))));
}

pub fn bloom_bench(c: &mut Criterion) {
    let mut bf = BloomFilter::for_capacity(100_000, 0.01, None).unwrap();

    c.bench_function("bloom_add", |b| {
        let mut i = 0u64;
        b.iter(|| {
            bf.add(&i.to_le_bytes(), false);
            i += 1;
        })
    });

    bf.add(b"known-key", false);
    c.bench_function("bloom_contains_hit", |b| {
        b.iter(|| black_box(bf.contains(b"known-key")))
    });
    c.bench_function("bloom_contains_miss", |b| {
        b.iter(|| black_box(bf.contains(b"absent-key")))
    });
}

pub fn scaling_bench(c: &mut Criterion) {
    c.bench_function("scaling_bloom_add_10_000", |b| {
        b.iter_batched(
            || ScalingBloomFilter::new(10_000, 0.01, None, None, None).unwrap(),
            |mut sbf| {
                for i in 0..10_000u32 {
                    sbf.add(&i.to_le_bytes()).unwrap();
                }
                black_box(sbf)
            },
            criterion::BatchSize::NumBatches(1),
        )
    });
}

criterion_group!(benches, bitmap_bench, bloom_bench, scaling_bench);
criterion_main!(benches);
