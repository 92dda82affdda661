use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tessera_image::{Palette, PixelBuffer, PixelLayout, Rect, SampleLayout, TileGrid};

use crate::border::BorderExtender;
use crate::error::OperatorError;

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an image in an operator graph. Cached tiles are keyed by it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(u64);

impl ImageId {
    pub(crate) fn next() -> Self {
        ImageId(NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A tiled image that operators read from.
///
/// Tiles are addressed on the image's [`TileGrid`]; tile `(tx, ty)` covers the
/// grid rectangle of that tile clipped to [`Source::bounds`]. Consumers register
/// themselves with [`Source::add_sink`] so that a source knows whether one of its
/// tiles may be handed out for in-place reuse.
pub trait Source: Send + Sync + Debug {
    /// Identity of the image.
    fn id(&self) -> ImageId;

    /// Pixel bounds of the image.
    fn bounds(&self) -> Rect;

    /// Tiling of the image plane.
    fn tile_grid(&self) -> TileGrid;

    /// Layout of a full tile.
    fn sample_layout(&self) -> &SampleLayout;

    /// Band count and sample type.
    fn pixel_layout(&self) -> PixelLayout {
        self.sample_layout().pixel
    }

    /// Color table of an indexed image.
    fn palette(&self) -> Option<&Arc<Palette>> {
        self.sample_layout().palette.as_ref()
    }

    /// Shared handle to tile `(tx, ty)`.
    fn tile(&self, tx: i32, ty: i32) -> Result<Arc<PixelBuffer>, OperatorError>;

    /// Computes tile `(tx, ty)` into a buffer owned by the caller.
    ///
    /// Only images that produce their tiles on demand return a buffer, and only
    /// when the tile is not retained anywhere else. Static images return `None`.
    fn compute_tile_owned(&self, _tx: i32, _ty: i32) -> Result<Option<PixelBuffer>, OperatorError> {
        Ok(None)
    }

    /// Hands back a buffer obtained from [`Source::compute_tile_owned`] that the
    /// caller no longer needs.
    fn recycle_tile(&self, buffer: PixelBuffer) {
        drop(buffer);
    }

    /// Number of registered consumers.
    fn sink_count(&self) -> usize;

    /// Registers a consumer.
    fn add_sink(&self);

    /// Unregisters a consumer.
    fn remove_sink(&self);

    /// Copies the samples of `rect`, clipped to the image bounds, into one buffer.
    ///
    /// # Errors
    ///
    /// If `rect` does not intersect the image, or a tile cannot be computed.
    fn data(&self, rect: &Rect) -> Result<PixelBuffer, OperatorError> {
        let bounds = self.bounds();
        let area = rect.intersection(&bounds);
        let Some((x0, y0, x1, y1)) = self.tile_grid().tile_range(&area) else {
            return Err(OperatorError::RegionOutOfBounds(*rect, bounds));
        };
        let layout = self.sample_layout().with_size(area.width, area.height)?;
        let mut out = PixelBuffer::new(layout, area.x, area.y)?;
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                out.copy_from(&*self.tile(tx, ty)?);
            }
        }
        Ok(out)
    }
}

impl dyn Source {
    /// Samples of `rect`, with the part outside the image bounds synthesized by `extender`.
    pub fn extended_data(
        &self,
        rect: &Rect,
        extender: &dyn BorderExtender,
    ) -> Result<PixelBuffer, OperatorError> {
        extender.extend(self, rect)
    }
}

/// An image whose tiles are held in memory.
///
/// The tiles belong to the image and are never handed out for in-place reuse.
#[derive(Debug)]
pub struct TiledImage {
    id: ImageId,
    bounds: Rect,
    grid: TileGrid,
    layout: SampleLayout,
    first_tile: (i32, i32),
    tiles_across: usize,
    tiles: Vec<Arc<PixelBuffer>>,
    sinks: AtomicUsize,
}

impl TiledImage {
    /// Create an image by splitting `buffer` into tiles of `grid`.
    ///
    /// The image covers the buffer's rectangle and keeps its layout.
    ///
    /// # Example
    ///
    /// ```
    /// use tessera_image::{PixelBuffer, PixelLayout, Rect, SampleLayout, SampleType, TileGrid};
    /// use tessera_imgproc::source::{Source, TiledImage};
    ///
    /// let layout = SampleLayout::new(PixelLayout::new(SampleType::Byte, 1).unwrap(), 10, 6).unwrap();
    /// let buffer = PixelBuffer::new(layout, 0, 0).unwrap();
    /// let image = TiledImage::new(buffer, TileGrid::new(4, 4, 0, 0).unwrap()).unwrap();
    ///
    /// assert_eq!(image.bounds(), Rect::new(0, 0, 10, 6));
    /// assert_eq!(image.tile(2, 1).unwrap().rect(), Rect::new(8, 4, 2, 2));
    /// ```
    pub fn new(buffer: PixelBuffer, grid: TileGrid) -> Result<Self, OperatorError> {
        let bounds = buffer.rect();
        let layout = buffer.layout().clone();
        Self::build(bounds, grid, layout, |tile| {
            tile.copy_from(&buffer);
        })
    }

    /// Create an image whose sample `band` of pixel `(x, y)` is `f(x, y, band)`.
    ///
    /// Only the pixel layout, arrangement, band order and palette of `layout` are
    /// used; tiles take the size of the grid.
    pub fn from_fn(
        bounds: Rect,
        grid: TileGrid,
        layout: SampleLayout,
        f: impl Fn(i32, i32, usize) -> f64,
    ) -> Result<Self, OperatorError> {
        Self::build(bounds, grid, layout, |tile| {
            let rect = tile.rect();
            let sample_type = tile.sample_type();
            for y in rect.y..rect.max_y() as i32 {
                for x in rect.x..rect.max_x() as i32 {
                    for b in 0..tile.num_bands() {
                        let i = tile.index(x, y, b);
                        tile.data_mut().set_f64(i, sample_type.narrow(f(x, y, b)));
                    }
                }
            }
        })
    }

    /// Create an image with every pixel set to `values`, broadcast over the bands.
    pub fn constant(
        bounds: Rect,
        grid: TileGrid,
        layout: SampleLayout,
        values: &[f64],
    ) -> Result<Self, OperatorError> {
        Self::build(bounds, grid, layout, |tile| tile.fill(values))
    }

    fn build(
        bounds: Rect,
        grid: TileGrid,
        layout: SampleLayout,
        mut init: impl FnMut(&mut PixelBuffer),
    ) -> Result<Self, OperatorError> {
        let bounds = bounds.checked()?;
        let (x0, y0, x1, y1) = grid
            .tile_range(&bounds)
            .ok_or(OperatorError::RegionOutOfBounds(bounds, bounds))?;
        let tile_layout = layout.with_size(grid.tile_width, grid.tile_height)?;
        let mut tiles = Vec::with_capacity(((x1 - x0 + 1) * (y1 - y0 + 1)) as usize);
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                let rect = grid.tile_rect(tx, ty).intersection(&bounds);
                let mut tile = PixelBuffer::new(tile_layout.with_size(rect.width, rect.height)?, rect.x, rect.y)?;
                init(&mut tile);
                tiles.push(Arc::new(tile));
            }
        }
        log::debug!(
            "tiled image {bounds} with {}x{} tiles of {}x{}",
            x1 - x0 + 1,
            y1 - y0 + 1,
            grid.tile_width,
            grid.tile_height
        );
        Ok(Self {
            id: ImageId::next(),
            bounds,
            grid,
            layout: tile_layout,
            first_tile: (x0, y0),
            tiles_across: (x1 - x0 + 1) as usize,
            tiles,
            sinks: AtomicUsize::new(0),
        })
    }
}

impl Source for TiledImage {
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
        let out_of_bounds = || OperatorError::TileOutOfBounds(tx, ty, self.bounds);
        let col = tx - self.first_tile.0;
        let row = ty - self.first_tile.1;
        if col < 0 || row < 0 || col as usize >= self.tiles_across {
            return Err(out_of_bounds());
        }
        self.tiles
            .get(row as usize * self.tiles_across + col as usize)
            .cloned()
            .ok_or_else(out_of_bounds)
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
