use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pictionary::{
    ClassifierAdapter, ClassifierError, ImageNormalizer, LabelDistribution, PipelineConfig, PixelBuffer,
    PixelEncoder, RasterConfig, Rasterizer, ResizeQuality, RowOrder, SketchSession, StrokeBuffer,
};

/// A spiral of a few hundred points, roughly what a quick doodle produces
fn sample_strokes() -> StrokeBuffer {
    (0..400)
        .map(|i| {
            let t = i as f32 / 400.0;
            let angle = t * std::f32::consts::TAU * 4.0;
            (0.5 + 0.4 * t * angle.cos(), 0.5 + 0.4 * t * angle.sin())
        })
        .collect()
}

fn stub_model(_: &PixelBuffer) -> Result<LabelDistribution, ClassifierError> {
    Ok(vec![("chicken", 0.1f32), ("dog", 0.7), ("fish", 0.1), ("t-rex", 0.1)]
        .into_iter()
        .collect())
}

fn bench_stages(c: &mut Criterion) {
    let strokes = sample_strokes();
    let rasterizer = Rasterizer::new(RasterConfig::default());
    let raster = rasterizer.rasterize(&strokes, 360, 360);

    let mut group = c.benchmark_group("Stages");
    group.sample_size(50);
    group.warm_up_time(std::time::Duration::from_secs(1));

    group.bench_function("rasterize_360", |b| b.iter(|| {
        rasterizer.rasterize(black_box(&strokes), 360, 360)
    }));

    for (name, quality) in [("normalize_high", ResizeQuality::High), ("normalize_fast", ResizeQuality::Fast)] {
        let normalizer = ImageNormalizer::square(224).with_quality(quality);
        group.bench_function(name, |b| b.iter(|| normalizer.normalize(black_box(&raster))));
    }

    for (name, row_order) in [("encode_bottom_up", RowOrder::BottomUp), ("encode_top_down", RowOrder::TopDown)] {
        let encoder = PixelEncoder::new(row_order);
        group.bench_function(name, |b| b.iter(|| encoder.encode(black_box(&raster)).unwrap()));
    }

    group.finish();
}

fn bench_guess(c: &mut Criterion) {
    let mut group = c.benchmark_group("Guess");
    group.sample_size(30);

    // Test different model input sizes
    for size in [224u32, 360] {
        let config = PipelineConfig {
            model_input_size: size,
            ..PipelineConfig::default()
        };
        let mut session = SketchSession::new(config, ClassifierAdapter::new(stub_model)).unwrap();
        for point in sample_strokes().points() {
            session.add_point(*point);
        }
        group.bench_function(format!("guess_{}", size), |b| b.iter(|| session.guess()));
    }

    group.finish();
}

criterion_group!(benches, bench_stages, bench_guess);
criterion_main!(benches);
