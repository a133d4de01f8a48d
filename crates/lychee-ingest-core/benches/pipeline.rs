//! Benchmarks for the Lychee ingestion pipeline.
//!
//! Run with: cargo bench -p lychee-ingest-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lychee_ingest_core::config::ImageConfig;
use lychee_ingest_core::imaging::{ImageHandler, RenderRequest, RustImageHandler};
use lychee_ingest_core::naming::NamingStrategy;
use lychee_ingest_core::storage::copy_with_stats;
use lychee_ingest_core::variants::plan_variants;
use lychee_ingest_core::{ImageDimension, PhotoId, SizeVariantType};

fn benchmark_checksum(c: &mut Criterion) {
    let data = vec![0x5au8; 8 * 1024 * 1024];

    c.bench_function("checksum_8mb", |b| {
        b.iter(|| {
            let _ = copy_with_stats(&mut black_box(data.as_slice()), &mut std::io::sink());
        })
    });
}

fn benchmark_plan_variants(c: &mut Criterion) {
    let config = ImageConfig::default();

    c.bench_function("plan_variants", |b| {
        b.iter(|| plan_variants(black_box(&config), black_box(ImageDimension::new(6000, 4000))))
    });
}

fn benchmark_naming(c: &mut Criterion) {
    let naming = NamingStrategy::new(PhotoId::generate(), ".heic", Default::default());

    c.bench_function("naming_path_for", |b| {
        b.iter(|| {
            for variant in SizeVariantType::ALL {
                let _ = naming.path_for(black_box(variant), ".jpg");
            }
        })
    });
}

fn benchmark_thumbnail(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.jpg");
    image::RgbImage::from_pixel(1920, 1080, image::Rgb([90, 120, 200]))
        .save_with_format(&source, image::ImageFormat::Jpeg)
        .unwrap();

    let handler = RustImageHandler::new();
    let image = handler.load(&source).unwrap();
    let config = ImageConfig::default();
    let request = RenderRequest {
        max_width: config.thumb_size,
        max_height: config.thumb_size,
        square: true,
        format: config.variant_format,
        quality: config.quality,
    };
    let target = dir.path().join("thumb.jpg");

    c.bench_function("render_thumb_200px", |b| {
        b.iter(|| {
            let _ = image.render(black_box(&request), &target);
        })
    });
}

fn benchmark_decode(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("source.png");
    image::RgbImage::from_pixel(1024, 768, image::Rgb([10, 10, 10]))
        .save_with_format(&source, image::ImageFormat::Png)
        .unwrap();
    let handler = RustImageHandler::new();

    c.bench_function("decode_png_1024", |b| {
        b.iter(|| {
            let _ = handler.load(black_box(&source));
        })
    });
}

criterion_group!(
    benches,
    benchmark_checksum,
    benchmark_plan_variants,
    benchmark_naming,
    benchmark_thumbnail,
    benchmark_decode,
);
criterion_main!(benches);
