use crate::error::ImageError;
use crate::rect::Rect;

/// The tiling of an image plane.
///
/// Tile `(tx, ty)` covers `x_offset + tx * tile_width .. + tile_width` horizontally
/// and the equivalent rows vertically. The grid extends over the whole plane; an
/// image only realizes the tiles that intersect its bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileGrid {
    /// Width of a tile in pixels.
    pub tile_width: i32,
    /// Height of a tile in pixels.
    pub tile_height: i32,
    /// Horizontal origin of tile column 0.
    pub x_offset: i32,
    /// Vertical origin of tile row 0.
    pub y_offset: i32,
}

impl TileGrid {
    /// Create a new tile grid.
    ///
    /// # Errors
    ///
    /// If a tile dimension is not positive, an error is returned.
    pub fn new(
        tile_width: i32,
        tile_height: i32,
        x_offset: i32,
        y_offset: i32,
    ) -> Result<Self, ImageError> {
        if tile_width <= 0 || tile_height <= 0 {
            return Err(ImageError::InvalidTileSize(tile_width, tile_height));
        }
        Ok(Self {
            tile_width,
            tile_height,
            x_offset,
            y_offset,
        })
    }

    /// A grid with a single tile covering `bounds`.
    pub fn single_tile(bounds: Rect) -> Result<Self, ImageError> {
        Self::new(bounds.width, bounds.height, bounds.x, bounds.y)
    }

    /// Tile column containing the pixel column `x`.
    pub fn x_to_tile_x(&self, x: i32) -> i32 {
        (x as i64 - self.x_offset as i64).div_euclid(self.tile_width as i64) as i32
    }

    /// Tile row containing the pixel row `y`.
    pub fn y_to_tile_y(&self, y: i32) -> i32 {
        (y as i64 - self.y_offset as i64).div_euclid(self.tile_height as i64) as i32
    }

    /// Left pixel column of the tile column `tx`.
    pub fn tile_x_to_x(&self, tx: i32) -> i64 {
        tx as i64 * self.tile_width as i64 + self.x_offset as i64
    }

    /// Top pixel row of the tile row `ty`.
    pub fn tile_y_to_y(&self, ty: i32) -> i64 {
        ty as i64 * self.tile_height as i64 + self.y_offset as i64
    }

    /// The full grid rectangle of tile `(tx, ty)`, not clipped to any bounds.
    pub fn tile_rect(&self, tx: i32, ty: i32) -> Rect {
        let x = self.tile_x_to_x(tx);
        let y = self.tile_y_to_y(ty);
        Rect::from_edges(
            x,
            y,
            x + self.tile_width as i64,
            y + self.tile_height as i64,
        )
    }

    /// Inclusive range of tile indices `(min_tx, min_ty, max_tx, max_ty)` touching `rect`.
    ///
    /// Returns `None` for an empty rectangle.
    pub fn tile_range(&self, rect: &Rect) -> Option<(i32, i32, i32, i32)> {
        if rect.is_empty() {
            return None;
        }
        Some((
            self.x_to_tile_x(rect.x),
            self.y_to_tile_y(rect.y),
            self.x_to_tile_x((rect.max_x() - 1) as i32),
            self.y_to_tile_y((rect.max_y() - 1) as i32),
        ))
    }

    /// Returns true if `rect` touches more than one tile of this grid.
    pub fn overlaps_multiple_tiles(&self, rect: &Rect) -> bool {
        match self.tile_range(rect) {
            Some((x0, y0, x1, y1)) => x0 != x1 || y0 != y1,
            None => false,
        }
    }

    /// Appends to `xs`/`ys` every tile boundary of this grid lying strictly inside `rect`.
    ///
    /// The sequences are left unsorted; callers merge boundaries of several grids.
    pub fn splits(&self, rect: &Rect, xs: &mut Vec<i32>, ys: &mut Vec<i32>) {
        let Some((x0, y0, x1, y1)) = self.tile_range(rect) else {
            return;
        };
        for tx in (x0 + 1)..=x1 {
            xs.push(self.tile_x_to_x(tx) as i32);
        }
        for ty in (y0 + 1)..=y1 {
            ys.push(self.tile_y_to_y(ty) as i32);
        }
    }
}
