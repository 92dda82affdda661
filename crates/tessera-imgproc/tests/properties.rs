use std::sync::Arc;

use rand::{Rng, SeedableRng};

use tessera_image::{PixelLayout, Rect, SampleLayout, SampleType, TileGrid};
use tessera_imgproc::{
    cache::MemoryTileCache,
    interpolation::{InterpolationBilinear, InterpolationNearest},
    operator::{ImageLayout, Operator, OperatorConfig},
    point::{Invert, Rescale},
    region::{RegionMapper, WarpMapper},
    source::{Source, TiledImage},
    warp::{Warp, WarpAffine, WarpPerspective},
    OperatorError,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn rgb() -> Result<SampleLayout, OperatorError> {
    Ok(SampleLayout::new(
        PixelLayout::new(SampleType::Byte, 3)?,
        1,
        1,
    )?)
}

fn pattern(bounds: Rect, tile: i32) -> Result<Arc<dyn Source>, OperatorError> {
    Ok(Arc::new(TiledImage::from_fn(
        bounds,
        TileGrid::new(tile, tile, 0, 0)?,
        rgb()?,
        |x, y, b| ((x * 31 + y * 17 + b as i32 * 53) % 256) as f64,
    )?))
}

#[test]
fn identity_warp_round_trip() -> Result<(), OperatorError> {
    init_logger();
    let src = pattern(Rect::new(-7, 3, 70, 45), 16)?;
    let op = Operator::warp(
        src.clone(),
        Arc::new(WarpAffine::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0])),
        Arc::new(InterpolationNearest),
        ImageLayout::default(),
        OperatorConfig::default(),
    )?;
    assert_eq!(op.bounds(), src.bounds());

    let (x0, y0, x1, y1) = op
        .tile_grid()
        .tile_range(&op.bounds())
        .ok_or(OperatorError::UnknownBounds)?;
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            let computed = op.compute_tile(tx, ty)?;
            let expected = src.tile(tx, ty)?;
            assert_eq!(computed.rect(), expected.rect());
            assert_eq!(computed.data(), expected.data(), "tile ({tx}, {ty})");
        }
    }
    Ok(())
}

#[test]
fn padding_algebra() {
    let mapper = WarpMapper::with_padding(
        Arc::new(WarpAffine::translation(5.0, 5.0)),
        tessera_image::Padding::new(1, 2, 1, 2),
    );
    let mapped = mapper.map_dest_rect(&Rect::new(0, 0, 10, 10), 0, &Rect::new(0, 0, 100, 100));
    assert_eq!(mapped, Rect::new(4, 4, 13, 13));
}

#[test]
fn disjoint_source_yields_background() -> Result<(), OperatorError> {
    init_logger();
    let src = pattern(Rect::new(200, 200, 10, 10), 8)?;
    let op = Operator::warp(
        src,
        Arc::new(WarpAffine::translation(0.0, 0.0)),
        Arc::new(InterpolationNearest),
        ImageLayout::default()
            .with_bounds(Rect::new(0, 0, 100, 100))
            .with_tile_grid(TileGrid::new(64, 64, 0, 0)?),
        OperatorConfig::default().with_background(vec![255.0, 0.0, 0.0]),
    )?;

    let tile = op.compute_tile(1, 1)?;
    assert_eq!(tile.rect(), Rect::new(64, 64, 36, 36));
    assert_eq!(tile.num_bands(), 3);
    for y in 64..100 {
        for x in 64..100 {
            assert_eq!(tile.get_sample(x, y, 0)?, 255.0);
            assert_eq!(tile.get_sample(x, y, 1)?, 0.0);
            assert_eq!(tile.get_sample(x, y, 2)?, 0.0);
        }
    }
    Ok(())
}

#[test]
fn layout_merge_lattice() -> Result<(), OperatorError> {
    let byte = PixelLayout::new(SampleType::Byte, 1)?;
    let ushort = PixelLayout::new(SampleType::UShort, 1)?;
    assert_eq!(
        PixelLayout::merge(&[byte, ushort])?,
        PixelLayout::new(SampleType::Int, 1)?
    );

    let bit1 = PixelLayout::new(SampleType::Bit, 1)?;
    let bit3 = PixelLayout::new(SampleType::Bit, 3)?;
    assert_eq!(
        PixelLayout::merge(&[bit1, bit3])?,
        PixelLayout::new(SampleType::Byte, 3)?
    );

    // The merged layout is what a point operator over both sources produces.
    let bounds = Rect::new(0, 0, 8, 8);
    let grid = TileGrid::new(8, 8, 0, 0)?;
    let a: Arc<dyn Source> = Arc::new(TiledImage::constant(
        bounds,
        grid,
        SampleLayout::new(byte, 1, 1)?,
        &[200.0],
    )?);
    let b: Arc<dyn Source> = Arc::new(TiledImage::constant(
        bounds,
        grid,
        SampleLayout::new(ushort, 1, 1)?,
        &[60000.0],
    )?);
    let sum = Operator::point(
        vec![a, b],
        Arc::new(tessera_imgproc::point::Add),
        ImageLayout::default(),
        OperatorConfig::default(),
    )?;
    assert_eq!(sum.pixel_layout().sample_type, SampleType::Int);
    assert_eq!(sum.tile(0, 0)?.get_sample(3, 3, 0)?, 60200.0);
    Ok(())
}

#[test]
fn shared_source_is_never_reused_in_place() -> Result<(), OperatorError> {
    init_logger();
    let config = OperatorConfig::default().with_cobble_sources(false);
    let shared = Operator::point(
        vec![pattern(Rect::new(0, 0, 32, 32), 16)?],
        Arc::new(Rescale::new(vec![1.0], vec![0.0])),
        ImageLayout::default(),
        config
            .clone()
            .with_tile_cache(Arc::new(MemoryTileCache::new(1 << 20))),
    )?;
    let inverted = Operator::point(
        vec![shared.clone() as Arc<dyn Source>],
        Arc::new(Invert::new(SampleType::Byte)),
        ImageLayout::default(),
        config.clone(),
    )?;
    let doubled = Operator::point(
        vec![shared.clone() as Arc<dyn Source>],
        Arc::new(Rescale::new(vec![2.0], vec![0.0])),
        ImageLayout::default(),
        config,
    )?;
    assert_eq!(shared.sink_count(), 2);

    for (tx, ty) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let a = inverted.compute_tile(tx, ty)?;
        let b = doubled.compute_tile(tx, ty)?;
        let source_tile = shared.tile(tx, ty)?;
        assert_ne!(a.id(), source_tile.id());
        assert_ne!(b.id(), source_tile.id());
        assert_ne!(a.id(), b.id());

        // The shared samples are still intact.
        let r = source_tile.rect();
        let v = source_tile.get_sample(r.x, r.y, 1)?;
        assert_eq!(a.get_sample(r.x, r.y, 1)?, 255.0 - v);
        assert_eq!(b.get_sample(r.x, r.y, 1)?, (2.0 * v).min(255.0));
    }

    drop(doubled);
    assert_eq!(shared.sink_count(), 1);
    Ok(())
}

#[test]
fn forward_then_backward_covers() -> Result<(), OperatorError> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let mut warps: Vec<Box<dyn Warp>> = Vec::new();
    for _ in 0..8 {
        let angle = rng.random_range(-180.0..180.0);
        let scale = rng.random_range(0.25..4.0);
        let center = (rng.random_range(-50.0..50.0), rng.random_range(-50.0..50.0));
        warps.push(Box::new(WarpAffine::rotation(center, angle, scale)?));
    }
    warps.push(Box::new(WarpPerspective::new([
        1.1, 0.2, 3.0, -0.1, 0.9, 7.0, 0.0005, 0.001, 1.0,
    ])));
    warps.push(Box::new(WarpPerspective::new([
        0.8, 0.0, -2.0, 0.05, 1.2, 0.0, -0.001, 0.0002, 1.0,
    ])));

    for warp in &warps {
        for _ in 0..25 {
            let r = Rect::new(
                rng.random_range(-40..40),
                rng.random_range(-40..40),
                rng.random_range(1..60),
                rng.random_range(1..60),
            );
            let Some(forward) = warp.map_source_rect(&r) else {
                continue;
            };
            let backward = warp
                .map_dest_rect(&forward)
                .ok_or(OperatorError::UnknownBounds)?;
            assert!(
                backward.contains(&r),
                "{warp:?}: {r} -> {forward} -> {backward}"
            );
        }
    }
    Ok(())
}

#[test]
fn operator_mapping_covers_with_padding() -> Result<(), OperatorError> {
    let src = pattern(Rect::new(0, 0, 64, 64), 16)?;
    let op = Operator::warp(
        src,
        Arc::new(WarpAffine::rotation((32.0, 32.0), 20.0, 1.5)?),
        Arc::new(InterpolationBilinear::default()),
        ImageLayout::default(),
        OperatorConfig::default(),
    )?;
    let r = Rect::new(10, 12, 20, 9);
    let forward = op.map_source_rect(&r, 0)?;
    let backward = op.map_dest_rect(&forward, 0)?;
    assert!(backward.contains(&r));
    Ok(())
}
