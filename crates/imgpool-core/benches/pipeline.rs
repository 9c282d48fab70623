//! Benchmarks for the invert pipeline.
//!
//! Run with: cargo bench -p imgpool-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{ImageFormat, Rgba, RgbaImage};
use imgpool_core::config::EncodingConfig;
use imgpool_core::pipeline::{codec, invert::invert_in_place, InvertTransform, Transform};
use imgpool_core::{TaskContext, WorkerId};
use tokio_util::sync::CancellationToken;

fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

fn context() -> TaskContext {
    TaskContext::new(WorkerId(0), "bench.png", CancellationToken::new())
}

fn benchmark_invert_in_place(c: &mut Criterion) {
    let source = gradient(1024, 1024);
    let ctx = context();

    c.bench_function("invert_in_place_1024", |b| {
        b.iter(|| {
            let mut image = source.clone();
            invert_in_place(black_box(&mut image), &ctx).unwrap();
            image
        })
    });
}

fn benchmark_transform(c: &mut Criterion) {
    let mut png = Vec::new();
    codec::encode(
        "bench",
        gradient(512, 512),
        ImageFormat::Png,
        &EncodingConfig::default(),
        &mut png,
    )
    .unwrap();

    let transform = InvertTransform::default();
    let ctx = context();

    c.bench_function("invert_transform_png_512", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(png.len());
            transform
                .apply(&ctx, &mut black_box(png.as_slice()), &mut out)
                .unwrap();
            out
        })
    });
}

criterion_group!(benches, benchmark_invert_in_place, benchmark_transform);
criterion_main!(benches);
