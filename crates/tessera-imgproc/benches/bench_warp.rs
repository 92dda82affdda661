use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};

use tessera_image::{PixelBuffer, PixelLayout, Rect, SampleLayout, SampleType, TileGrid};
use tessera_imgproc::{
    interpolation::InterpolationMode,
    operator::{ImageLayout, Operator, OperatorConfig},
    parallel::{compute_tiles, tile_indices, ExecutionStrategy},
    point::Rescale,
    source::{Source, TiledImage},
    warp::{WarpAffine, WarpPerspective},
};

fn random_image(width: i32, height: i32) -> Arc<dyn Source> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let layout =
        SampleLayout::new(PixelLayout::new(SampleType::Byte, 3).unwrap(), width, height).unwrap();
    let mut buffer = PixelBuffer::new(layout, 0, 0).unwrap();
    for y in 0..height {
        for x in 0..width {
            for b in 0..3 {
                buffer
                    .set_sample(x, y, b, rng.random::<u8>() as f64)
                    .unwrap();
            }
        }
    }
    Arc::new(TiledImage::new(buffer, TileGrid::new(128, 128, 0, 0).unwrap()).unwrap())
}

fn bench_warp_affine(c: &mut Criterion) {
    let mut group = c.benchmark_group("WarpAffine");

    for (width, height) in [(256, 224), (512, 448), (1024, 896)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);
        let src = random_image(*width, *height);
        let center = (*width as f64 / 2.0, *height as f64 / 2.0);
        let hint = ImageLayout::default().with_bounds(Rect::new(0, 0, *width, *height));

        for mode in [InterpolationMode::Nearest, InterpolationMode::Bilinear, InterpolationMode::Bicubic] {
            let op = Operator::warp(
                src.clone(),
                Arc::new(WarpAffine::rotation(center, 45.0, 1.0).unwrap()),
                mode.kernel().unwrap(),
                hint.clone(),
                OperatorConfig::default(),
            )
            .unwrap();
            let indices = tile_indices(&op);

            group.bench_with_input(
                BenchmarkId::new(format!("{mode:?}"), &parameter_string),
                &(&op, &indices),
                |b, i| {
                    let (op, indices) = *i;
                    b.iter(|| {
                        compute_tiles(black_box(op), black_box(indices), ExecutionStrategy::Parallel)
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_warp_perspective(c: &mut Criterion) {
    let mut group = c.benchmark_group("WarpPerspective");

    for (width, height) in [(256, 224), (512, 448)].iter() {
        group.throughput(criterion::Throughput::Elements((*width * *height) as u64));

        let parameter_string = format!("{}x{}", width, height);
        let src = random_image(*width, *height);
        let m = [1.0, 0.1, 0.0, 0.05, 1.0, 0.0, 0.0001, 0.0002, 1.0];
        let op = Operator::warp(
            src,
            Arc::new(WarpPerspective::new(m)),
            InterpolationMode::Bilinear.kernel().unwrap(),
            ImageLayout::default().with_bounds(Rect::new(0, 0, *width, *height)),
            OperatorConfig::default(),
        )
        .unwrap();
        let indices = tile_indices(&op);

        for strategy in [ExecutionStrategy::Serial, ExecutionStrategy::Parallel] {
            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), &parameter_string),
                &(&op, &indices),
                |b, i| {
                    let (op, indices) = *i;
                    b.iter(|| compute_tiles(black_box(op), black_box(indices), strategy))
                },
            );
        }
    }
    group.finish();
}

fn bench_point_in_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("PointChain");

    let src = random_image(1024, 896);
    for in_place in [false, true] {
        let config = OperatorConfig::default()
            .with_cobble_sources(false)
            .with_in_place(in_place);
        let scaled = Operator::point(
            vec![src.clone()],
            Arc::new(Rescale::new(vec![0.5], vec![10.0])),
            ImageLayout::default(),
            config.clone(),
        )
        .unwrap();
        let shifted = Operator::point(
            vec![scaled as Arc<dyn Source>],
            Arc::new(Rescale::new(vec![1.0], vec![-3.0])),
            ImageLayout::default(),
            config,
        )
        .unwrap();
        let indices = tile_indices(&shifted);

        group.bench_with_input(
            BenchmarkId::new("in_place", in_place),
            &(&shifted, &indices),
            |b, i| {
                let (op, indices) = *i;
                b.iter(|| compute_tiles(black_box(op), black_box(indices), ExecutionStrategy::Serial))
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_warp_affine,
    bench_warp_perspective,
    bench_point_in_place
);
criterion_main!(benches);
