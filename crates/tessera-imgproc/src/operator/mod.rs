//! Operators: images whose tiles are computed on demand from other images.
//!
//! An [`Operator`] pairs a region mapping with a per-rectangle computation. The
//! tile engine here turns a tile request into source requests: it clips the tile
//! to the computable area, collects the source regions the mapping needs
//! (cobbled into one raster, extended past the source borders, or split along
//! the source tile boundaries) and runs the computation into a buffer prefilled
//! with the background.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tessera_image::{
    Padding, Palette, PixelBuffer, PixelLayout, Point2, RasterFactory, Rect, SampleLayout,
    SampleType, TileGrid,
};

use crate::border::BorderExtender;
use crate::cache::TileCache;
use crate::error::OperatorError;
use crate::interpolation::Interpolation;
use crate::point::PointKernel;
use crate::region::{IdentityMapper, RegionMapper, WarpMapper};
use crate::resample::{apply_point, WarpSampler};
use crate::source::{ImageId, Source};
use crate::warp::{Warp, WarpPolynomial};

mod config;

pub use config::{ImageLayout, OperatorConfig, IN_PLACE_ENV};

#[derive(Debug)]
enum Compute {
    Point {
        kernel: Arc<dyn PointKernel>,
    },
    Warp {
        warp: Arc<dyn Warp>,
        interp: Arc<dyn Interpolation>,
        /// Palette the indices of the source are expanded through.
        expand: Option<Arc<Palette>>,
    },
}

/// An image computed tile by tile from its sources.
///
/// Operators are built behind an [`Arc`] so they can in turn be the source of
/// other operators. Tiles are computed lazily and, when a [`TileCache`] is
/// configured, cached under the operator's [`ImageId`].
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tessera_image::{PixelLayout, Rect, SampleLayout, SampleType, TileGrid};
/// use tessera_imgproc::interpolation::InterpolationNearest;
/// use tessera_imgproc::operator::{ImageLayout, Operator, OperatorConfig};
/// use tessera_imgproc::source::{Source, TiledImage};
/// use tessera_imgproc::warp::WarpAffine;
///
/// let layout = SampleLayout::new(PixelLayout::new(SampleType::Byte, 1).unwrap(), 1, 1).unwrap();
/// let src = TiledImage::from_fn(
///     Rect::new(0, 0, 16, 16),
///     TileGrid::new(8, 8, 0, 0).unwrap(),
///     layout,
///     |x, y, _| (x + y) as f64,
/// )
/// .unwrap();
///
/// let shifted = Operator::warp(
///     Arc::new(src),
///     Arc::new(WarpAffine::translation(2.0, 0.0)),
///     Arc::new(InterpolationNearest),
///     ImageLayout::default(),
///     OperatorConfig::default(),
/// )
/// .unwrap();
///
/// assert_eq!(shifted.bounds(), Rect::new(-2, 0, 16, 16));
/// let tile = shifted.tile(0, 0).unwrap();
/// assert_eq!(tile.get_sample(0, 0, 0).unwrap(), 2.0);
/// ```
#[derive(Debug)]
pub struct Operator {
    id: ImageId,
    sources: Vec<Arc<dyn Source>>,
    mapper: Box<dyn RegionMapper>,
    compute: Compute,
    bounds: Rect,
    computable: Rect,
    grid: TileGrid,
    layout: SampleLayout,
    background: Vec<f64>,
    extender: Option<Arc<dyn BorderExtender>>,
    cobble: bool,
    cache: Option<Arc<dyn TileCache>>,
    factory: Arc<dyn RasterFactory>,
    in_place: bool,
    colormap: bool,
    same_grid: bool,
    sinks: AtomicUsize,
}

impl Operator {
    /// Create an operator applying `kernel` to the aligned pixels of `sources`.
    ///
    /// The bounds are the intersection of the source bounds, further clipped to
    /// the hinted bounds. The pixel layout is merged from the sources unless
    /// hinted. A colormap kernel over a single indexed source transforms the
    /// palette and copies the indices.
    ///
    /// # Errors
    ///
    /// If there are no sources, the kernel does not accept their count, or the
    /// bounds are empty.
    pub fn point(
        sources: Vec<Arc<dyn Source>>,
        kernel: Arc<dyn PointKernel>,
        hint: ImageLayout,
        config: OperatorConfig,
    ) -> Result<Arc<Self>, OperatorError> {
        let first = sources.first().ok_or(OperatorError::NoSources)?.clone();
        if let Some(expected) = kernel.arity() {
            if expected != sources.len() {
                return Err(OperatorError::SourceCountMismatch {
                    expected,
                    actual: sources.len(),
                });
            }
        }

        let source_bounds = sources
            .iter()
            .fold(first.bounds(), |r, s| r.intersection(&s.bounds()));
        let bounds = match hint.bounds {
            Some(b) => b.intersection(&source_bounds),
            None => source_bounds,
        };
        if bounds.is_empty() {
            return Err(OperatorError::EmptyBounds(
                hint.bounds.unwrap_or(source_bounds),
                source_bounds,
            ));
        }
        let grid = hint.tile_grid.unwrap_or(first.tile_grid());

        let pixel = match &hint.sample_layout {
            Some(l) => l.pixel,
            None => {
                let layouts: Vec<PixelLayout> = sources.iter().map(|s| s.pixel_layout()).collect();
                PixelLayout::merge(&layouts)?
            }
        };
        let mut layout = match hint.sample_layout {
            Some(l) => l.with_size(grid.tile_width, grid.tile_height)?,
            None if first.pixel_layout() == pixel => first
                .sample_layout()
                .with_size(grid.tile_width, grid.tile_height)?,
            None => SampleLayout::new(pixel, grid.tile_width, grid.tile_height)?,
        };

        let colormap = kernel.is_colormap() && sources.len() == 1 && first.palette().is_some();
        if colormap {
            if let Some(palette) = first.palette() {
                layout = layout.with_palette(kernel.transform_palette(palette));
            }
        }

        let cobble = config.cobble_sources();
        let same_grid = sources.iter().all(|s| s.tile_grid() == grid);
        let aligned = sources
            .iter()
            .all(|s| s.bounds() == first.bounds() && s.tile_grid() == first.tile_grid());
        let in_place = config.in_place()
            && kernel.supports_in_place()
            && !cobble
            && first.tile_grid() == grid
            && first.bounds() == bounds
            && layout.is_compatible(first.sample_layout())
            && aligned;

        log::debug!(
            "point operator over {} sources: bounds {bounds}, {} bands of {:?}, in place: {in_place}",
            sources.len(),
            layout.pixel.num_bands,
            layout.pixel.sample_type,
        );

        Ok(Self::build(
            sources,
            Box::new(IdentityMapper),
            Compute::Point { kernel },
            bounds,
            bounds,
            grid,
            layout,
            config,
            in_place,
            colormap,
            same_grid,
        ))
    }

    /// Create an operator resampling `source` through `warp` with `interp`.
    ///
    /// Unless hinted, the bounds are the forward mapping of the source bounds.
    /// For warps without a forward mapping they are estimated from an affine
    /// approximation fitted to the source corners. An indexed source resampled
    /// with a kernel other than nearest neighbor is expanded through its palette.
    ///
    /// # Errors
    ///
    /// If the kernel has no samples or paddings inconsistent with its size, if
    /// no bounds can be derived, or if the derived bounds are empty.
    pub fn warp(
        source: Arc<dyn Source>,
        warp: Arc<dyn Warp>,
        interp: Arc<dyn Interpolation>,
        hint: ImageLayout,
        config: OperatorConfig,
    ) -> Result<Arc<Self>, OperatorError> {
        interp.validate()?;
        let src_bounds = source.bounds();
        let bounds = match hint.bounds {
            Some(b) => b,
            None => warped_bounds(warp.as_ref(), &src_bounds).ok_or(OperatorError::UnknownBounds)?,
        };
        if bounds.is_empty() {
            return Err(OperatorError::EmptyBounds(bounds, src_bounds));
        }
        let bounds = bounds.checked()?;
        let grid = hint.tile_grid.unwrap_or(source.tile_grid());
        let (tw, th) = (grid.tile_width, grid.tile_height);

        let layout = match (hint.sample_layout, source.palette()) {
            (Some(l), _) => l.with_size(tw, th)?,
            (None, Some(palette)) if !interp.is_identity() => SampleLayout::new(
                PixelLayout::new(SampleType::Byte, palette.num_components())?,
                tw,
                th,
            )?,
            (None, _) => source.sample_layout().with_size(tw, th)?,
        };
        let expand = source.palette().filter(|_| layout.palette.is_none()).cloned();

        let padding = interp.padding();
        let computable = match config.border_extender() {
            Some(_) => bounds,
            None => bounds.shrink(&padding),
        };
        let same_grid = source.tile_grid() == grid;

        log::debug!(
            "warp operator: bounds {bounds}, computable {computable}, padding {padding:?}, palette expansion: {}",
            expand.is_some()
        );

        let mapper = Box::new(WarpMapper::new(warp.clone(), interp.as_ref()));
        Ok(Self::build(
            vec![source],
            mapper,
            Compute::Warp {
                warp,
                interp,
                expand,
            },
            bounds,
            computable,
            grid,
            layout,
            // Resampling reads one raster around the mapped rectangle.
            config.with_cobble_sources(true),
            false,
            false,
            same_grid,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        sources: Vec<Arc<dyn Source>>,
        mapper: Box<dyn RegionMapper>,
        compute: Compute,
        bounds: Rect,
        computable: Rect,
        grid: TileGrid,
        layout: SampleLayout,
        config: OperatorConfig,
        in_place: bool,
        colormap: bool,
        same_grid: bool,
    ) -> Arc<Self> {
        for source in &sources {
            source.add_sink();
        }
        Arc::new(Self {
            id: ImageId::next(),
            sources,
            mapper,
            compute,
            bounds,
            computable,
            grid,
            layout,
            background: config.background().to_vec(),
            extender: config.border_extender().cloned(),
            cobble: config.cobble_sources(),
            cache: config.tile_cache().cloned(),
            factory: config.raster_factory().clone(),
            in_place,
            colormap,
            same_grid,
            sinks: AtomicUsize::new(0),
        })
    }

    /// Number of sources.
    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    /// Source `index`.
    pub fn source(&self, index: usize) -> Result<&Arc<dyn Source>, OperatorError> {
        self.sources
            .get(index)
            .ok_or(OperatorError::SourceIndexOutOfBounds(index, self.sources.len()))
    }

    /// Part of the bounds whose pixels can be computed from the sources. Pixels
    /// outside of it always hold the background.
    pub fn computable_bounds(&self) -> Rect {
        self.computable
    }

    /// Background values, as configured.
    pub fn background(&self) -> &[f64] {
        &self.background
    }

    /// Neighborhood the computation reads around every mapped position.
    pub fn padding(&self) -> Padding {
        self.mapper.padding()
    }

    /// Returns true if tiles may be computed into the buffers of the first source.
    pub fn computes_in_place(&self) -> bool {
        self.in_place
    }

    /// Region of source `source_index` needed to compute the destination `rect`.
    ///
    /// # Errors
    ///
    /// If `source_index` does not name a source.
    pub fn map_dest_rect(&self, rect: &Rect, source_index: usize) -> Result<Rect, OperatorError> {
        let source = self.source(source_index)?;
        Ok(self.mapper.map_dest_rect(rect, source_index, &source.bounds()))
    }

    /// Destination region affected by the source `rect` of source `source_index`.
    ///
    /// # Errors
    ///
    /// If `source_index` does not name a source.
    pub fn map_source_rect(&self, rect: &Rect, source_index: usize) -> Result<Rect, OperatorError> {
        self.source(source_index)?;
        Ok(self.mapper.map_source_rect(rect, source_index, &self.bounds))
    }

    /// Source position a destination point is computed from, if known.
    pub fn map_dest_point(&self, pt: Point2, source_index: usize) -> Result<Option<Point2>, OperatorError> {
        self.source(source_index)?;
        Ok(self.mapper.backward_map_point(pt, source_index))
    }

    /// Destination position of a source point, if known.
    pub fn map_source_point(&self, pt: Point2, source_index: usize) -> Result<Option<Point2>, OperatorError> {
        self.source(source_index)?;
        Ok(self.mapper.forward_map_point(pt, source_index))
    }

    /// Tiles of source `source_index` read when computing tile `(tx, ty)`.
    ///
    /// # Errors
    ///
    /// If `source_index` does not name a source.
    pub fn tile_dependencies(
        &self,
        tx: i32,
        ty: i32,
        source_index: usize,
    ) -> Result<Vec<(i32, i32)>, OperatorError> {
        let source = self.source(source_index)?;
        let rect = self
            .grid
            .tile_rect(tx, ty)
            .intersection(&self.bounds)
            .intersection(&self.computable);
        if rect.is_empty() {
            return Ok(Vec::new());
        }
        let needed = self.mapper.map_dest_rect(&rect, source_index, &source.bounds());
        let grid = source.tile_grid();
        let Some((x0, y0, x1, y1)) = grid.tile_range(&needed.intersection(&source.bounds())) else {
            return Ok(Vec::new());
        };
        Ok((y0..=y1)
            .flat_map(|ty| (x0..=x1).map(move |tx| (tx, ty)))
            .collect())
    }

    /// Computes tile `(tx, ty)` without consulting the cache.
    ///
    /// The tile covers the grid rectangle clipped to the bounds. Pixels outside
    /// the computable bounds, or without source coverage, hold the background.
    ///
    /// # Errors
    ///
    /// If the tile lies outside the bounds, or a source tile cannot be computed.
    pub fn compute_tile(&self, tx: i32, ty: i32) -> Result<PixelBuffer, OperatorError> {
        let tile_rect = self.grid.tile_rect(tx, ty).intersection(&self.bounds);
        if tile_rect.is_empty() {
            return Err(OperatorError::TileOutOfBounds(tx, ty, self.bounds));
        }
        let dest_rect = tile_rect.intersection(&self.computable);

        if let Compute::Point { kernel } = &self.compute {
            if let Some(reused) = self.reclaim_source_tile(tx, ty, &tile_rect)? {
                return self.compute_in_place(kernel.as_ref(), reused, tx, ty, &dest_rect);
            }
        }

        let layout = self.layout.with_size(tile_rect.width, tile_rect.height)?;
        let mut dest = self.factory.create_writable(&layout, tile_rect.x, tile_rect.y)?;
        dest.fill(&self.background);
        if dest_rect.is_empty() {
            log::trace!("tile ({tx}, {ty}) lies outside the computable bounds");
            return Ok(dest);
        }

        match &self.compute {
            Compute::Point { .. } if self.colormap => self.copy_indices(&mut dest, tx, ty, &dest_rect)?,
            Compute::Point { kernel } if !self.cobble => {
                self.compute_split(kernel.as_ref(), &mut dest, tx, ty, &dest_rect)?
            }
            _ => self.compute_cobbled(&mut dest, &dest_rect)?,
        }
        log::trace!("computed tile ({tx}, {ty}) of {:?}", self.id);
        Ok(dest)
    }

    // Takes over the buffer of the first source's tile when nobody else can see it.
    fn reclaim_source_tile(
        &self,
        tx: i32,
        ty: i32,
        tile_rect: &Rect,
    ) -> Result<Option<PixelBuffer>, OperatorError> {
        if !self.in_place {
            return Ok(None);
        }
        let source = &self.sources[0];
        let sinks = source.sink_count();
        if sinks > 1 {
            log::trace!("source tile ({tx}, {ty}) has {sinks} consumers, not reusing it");
            return Ok(None);
        }
        let Some(buffer) = source.compute_tile_owned(tx, ty)? else {
            return Ok(None);
        };
        let layout = self.layout.with_size(tile_rect.width, tile_rect.height)?;
        if buffer.rect() != *tile_rect || !buffer.layout().is_compatible(&layout) {
            source.recycle_tile(buffer);
            return Ok(None);
        }
        log::trace!("computing tile ({tx}, {ty}) in buffer {:?}", buffer.id());
        Ok(Some(buffer.with_layout(layout)?))
    }

    fn compute_in_place(
        &self,
        kernel: &dyn PointKernel,
        mut dest: PixelBuffer,
        tx: i32,
        ty: i32,
        rect: &Rect,
    ) -> Result<PixelBuffer, OperatorError> {
        if self.colormap || rect.is_empty() {
            return Ok(dest);
        }
        let others = self.sources[1..]
            .iter()
            .map(|s| s.tile(tx, ty))
            .collect::<Result<Vec<_>, _>>()?;
        let inputs: Vec<&PixelBuffer> = others.iter().map(AsRef::as_ref).collect();
        apply_point(kernel, &mut dest, &inputs, rect, true);
        Ok(dest)
    }

    fn copy_indices(
        &self,
        dest: &mut PixelBuffer,
        tx: i32,
        ty: i32,
        rect: &Rect,
    ) -> Result<(), OperatorError> {
        let source = &self.sources[0];
        if self.same_grid {
            dest.copy_from(&*source.tile(tx, ty)?);
        } else {
            dest.copy_from(&source.data(rect)?);
        }
        Ok(())
    }

    // Applies a point kernel one source tile intersection at a time.
    fn compute_split(
        &self,
        kernel: &dyn PointKernel,
        dest: &mut PixelBuffer,
        tx: i32,
        ty: i32,
        rect: &Rect,
    ) -> Result<(), OperatorError> {
        let rect = self
            .sources
            .iter()
            .fold(*rect, |r, s| r.intersection(&s.bounds()));
        if rect.is_empty() {
            return Ok(());
        }

        if self.same_grid {
            let tiles = self
                .sources
                .iter()
                .map(|s| s.tile(tx, ty))
                .collect::<Result<Vec<_>, _>>()?;
            let inputs: Vec<&PixelBuffer> = tiles.iter().map(AsRef::as_ref).collect();
            apply_point(kernel, dest, &inputs, &rect, false);
            return Ok(());
        }

        let (xs, ys) = split_lines(&self.sources, &rect);
        log::trace!(
            "tile ({tx}, {ty}) split into {}x{} parts",
            xs.len() - 1,
            ys.len() - 1
        );
        for rows in ys.windows(2) {
            for cols in xs.windows(2) {
                let part = Rect::new(cols[0], rows[0], cols[1] - cols[0], rows[1] - rows[0]);
                let tiles = self
                    .sources
                    .iter()
                    .map(|s| {
                        let grid = s.tile_grid();
                        s.tile(grid.x_to_tile_x(part.x), grid.y_to_tile_y(part.y))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let inputs: Vec<&PixelBuffer> = tiles.iter().map(AsRef::as_ref).collect();
                apply_point(kernel, dest, &inputs, &part, false);
            }
        }
        Ok(())
    }

    // Reads every source as a single raster covering the mapped rectangle.
    fn compute_cobbled(&self, dest: &mut PixelBuffer, rect: &Rect) -> Result<(), OperatorError> {
        let padding = self.padding();
        let mut rasters = Vec::with_capacity(self.sources.len());
        // Key positions of the first source whose neighborhood is readable.
        let mut keys = Rect::default();
        for (i, source) in self.sources.iter().enumerate() {
            let source_bounds = source.bounds();
            let needed = self.mapper.map_dest_rect(rect, i, &source_bounds);
            let (raster, valid) = match &self.extender {
                // Every key of the mapped region is usable, its neighborhood
                // is synthesized by the extender.
                Some(extender) if !needed.is_empty() => (
                    source.extended_data(&needed.expand(&padding), extender.as_ref())?,
                    needed,
                ),
                _ => {
                    let clipped = needed.intersection(&source_bounds);
                    if clipped.is_empty() {
                        log::trace!("{rect} has no coverage in source {i}");
                        return Ok(());
                    }
                    (source.data(&clipped)?, clipped.shrink(&padding))
                }
            };
            if i == 0 {
                keys = valid;
            }
            rasters.push(raster);
        }

        match &self.compute {
            Compute::Point { kernel } => {
                let area = rasters.iter().fold(*rect, |r, s| r.intersection(&s.rect()));
                let inputs: Vec<&PixelBuffer> = rasters.iter().collect();
                apply_point(kernel.as_ref(), dest, &inputs, &area, false);
            }
            Compute::Warp {
                warp,
                interp,
                expand,
            } => {
                let sampler = WarpSampler {
                    warp: warp.as_ref(),
                    interp: interp.as_ref(),
                    src: &rasters[0],
                    valid: keys,
                    palette: expand.as_deref(),
                };
                let written = sampler.resample(dest, rect);
                log::trace!("resampled {written} of {} pixels of {rect}", rect.area());
            }
        }

        for (raster, source) in rasters.into_iter().zip(&self.sources) {
            if source.tile_grid().overlaps_multiple_tiles(&raster.rect()) {
                self.factory.recycle(raster);
            }
        }
        Ok(())
    }
}

// Boundaries of `rect` and of every source tile inside it, sorted.
fn split_lines(sources: &[Arc<dyn Source>], rect: &Rect) -> (Vec<i32>, Vec<i32>) {
    let mut xs = vec![rect.x, rect.max_x() as i32];
    let mut ys = vec![rect.y, rect.max_y() as i32];
    for source in sources {
        source.tile_grid().splits(rect, &mut xs, &mut ys);
    }
    xs.sort_unstable();
    xs.dedup();
    ys.sort_unstable();
    ys.dedup();
    (xs, ys)
}

// Destination bounds of a warped source, if any estimate is available.
fn warped_bounds(warp: &dyn Warp, src: &Rect) -> Option<Rect> {
    if let Some(r) = warp.map_source_rect(src) {
        return Some(r);
    }
    let (x0, y0) = (src.x as f64, src.y as f64);
    let (x1, y1) = (src.max_x() as f64, src.max_y() as f64);
    let corners = [
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x0, y1),
        Point2::new(x1, y1),
    ];

    let forward: Option<Vec<Point2>> = corners.iter().map(|&c| warp.map_source_point(c)).collect();
    if let Some(points) = forward {
        if let Some(r) = enclosing_rect(&points) {
            return Some(r);
        }
    }

    // Fit an affine approximation of the backward mapping and invert it.
    let backward: Vec<Point2> = corners.iter().map(|&c| warp.map_dest_point(c)).collect();
    if backward.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }
    let fitted = WarpPolynomial::fit(&backward, &corners, 1, (1.0, 1.0), (1.0, 1.0)).ok()?;
    log::debug!("estimating warped bounds of {src} from an affine approximation");
    fitted.to_affine()?.map_source_rect(src)
}

fn enclosing_rect(points: &[Point2]) -> Option<Rect> {
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }
    let fold = |f: fn(f64, f64) -> f64, init: f64, get: fn(&Point2) -> f64| {
        points.iter().map(get).fold(init, f)
    };
    let min_x = fold(f64::min, f64::INFINITY, |p| p.x).floor();
    let min_y = fold(f64::min, f64::INFINITY, |p| p.y).floor();
    let max_x = fold(f64::max, f64::NEG_INFINITY, |p| p.x);
    let max_y = fold(f64::max, f64::NEG_INFINITY, |p| p.y);
    let w = (max_x - min_x).ceil();
    let h = (max_y - min_y).ceil();
    if w < 1.0 || h < 1.0 || w > i32::MAX as f64 || h > i32::MAX as f64 {
        return None;
    }
    Some(Rect::new(min_x as i32, min_y as i32, w as i32, h as i32))
}

impl Source for Operator {
    fn id(&self) -> ImageId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn tile_grid(&self) -> TileGrid {
        self.grid
    }

    fn sample_layout(&self) -> &SampleLayout {
        &self.layout
    }

    fn tile(&self, tx: i32, ty: i32) -> Result<Arc<PixelBuffer>, OperatorError> {
        if let Some(cache) = &self.cache {
            if let Some(tile) = cache.get(self.id, tx, ty) {
                return Ok(tile);
            }
        }
        let tile = Arc::new(self.compute_tile(tx, ty)?);
        if let Some(cache) = &self.cache {
            cache.put(self.id, tx, ty, tile.clone());
        }
        Ok(tile)
    }

    fn compute_tile_owned(&self, tx: i32, ty: i32) -> Result<Option<PixelBuffer>, OperatorError> {
        if let Some(cache) = &self.cache {
            if cache.get(self.id, tx, ty).is_some() {
                return Ok(None);
            }
        }
        self.compute_tile(tx, ty).map(Some)
    }

    fn recycle_tile(&self, buffer: PixelBuffer) {
        self.factory.recycle(buffer);
    }

    fn sink_count(&self) -> usize {
        self.sinks.load(Ordering::Acquire)
    }

    fn add_sink(&self) {
        self.sinks.fetch_add(1, Ordering::AcqRel);
    }

    fn remove_sink(&self) {
        let _ = self
            .sinks
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

impl Drop for Operator {
    fn drop(&mut self) {
        for source in &self.sources {
            source.remove_sink();
        }
        if let Some(cache) = &self.cache {
            cache.remove_all(self.id);
        }
    }
}
