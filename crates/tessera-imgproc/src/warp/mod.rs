//! Backward coordinate mappings for warp operators.
//!
//! A [`Warp`] tells, for every destination pixel, where its value comes from in
//! the source. Pixel `(x, y)` is treated as the continuous point
//! `(x + 0.5, y + 0.5)`, mapped, and `0.5` is subtracted from the result, so an
//! identity mapping returns integer positions for integer pixels.

use tessera_image::{Point2, Rect};

mod affine;
mod grid;
mod perspective;
mod polynomial;

pub use affine::{invert_affine, rotation_matrix, WarpAffine};
pub use grid::WarpGrid;
pub use perspective::WarpPerspective;
pub use polynomial::WarpPolynomial;

/// An error type for warp construction.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WarpError {
    /// The matrix has no inverse.
    #[error("Matrix is singular")]
    SingularMatrix,

    /// The coefficient count does not correspond to a polynomial degree.
    #[error("Coefficient counts ({0}, {1}) do not describe a polynomial")]
    InvalidCoefficients(usize, usize),

    /// Too few control points to fit a polynomial of the requested degree.
    #[error("Fitting a polynomial of degree {degree} needs {needed} point pairs, got {got}")]
    NotEnoughPoints {
        /// Requested degree.
        degree: usize,
        /// Minimum number of point pairs.
        needed: usize,
        /// Number of point pairs given.
        got: usize,
    },

    /// Source and destination control point counts differ.
    #[error("Got {0} source points and {1} destination points")]
    PointCountMismatch(usize, usize),

    /// The grid description is inconsistent.
    #[error("Invalid warp grid: {0}")]
    InvalidGrid(String),
}

/// A backward mapping from destination to source coordinates.
///
/// Only [`Warp::map_sparse`] is required. Everything else is derived from it,
/// but implementations with a closed form should override the rectangle and
/// point mappings.
pub trait Warp: Send + Sync + std::fmt::Debug {
    /// Maps the pixels `(rect.x + i * period_x, rect.y + j * period_y)` of `rect`.
    ///
    /// `out` is cleared and filled with interleaved `x, y` source positions in
    /// row-major order.
    fn map_sparse(&self, rect: &Rect, period_x: i32, period_y: i32, out: &mut Vec<f32>);

    /// Source positions of every pixel of `rect`.
    fn map_rect(&self, rect: &Rect) -> Vec<f32> {
        let mut out = Vec::with_capacity(2 * rect.area().max(0) as usize);
        self.map_sparse(rect, 1, 1, &mut out);
        out
    }

    /// Source positions of every pixel of `rect` in fixed point, as
    /// `floor(x * 2^bits_h)` and `floor(y * 2^bits_v)`.
    fn map_rect_fixed(&self, rect: &Rect, bits_h: u32, bits_v: u32) -> Vec<i32> {
        let prec_h = (1u32 << bits_h) as f32;
        let prec_v = (1u32 << bits_v) as f32;
        self.map_rect(rect)
            .chunks_exact(2)
            .flat_map(|p| [(p[0] * prec_h).floor() as i32, (p[1] * prec_v).floor() as i32])
            .collect()
    }

    /// Source position of a destination point, evaluated at the pixel containing it.
    fn map_dest_point(&self, pt: Point2) -> Point2 {
        let mut out = Vec::with_capacity(2);
        let rect = Rect::new(pt.x.floor() as i32, pt.y.floor() as i32, 1, 1);
        self.map_sparse(&rect, 1, 1, &mut out);
        Point2::new(out[0] as f64, out[1] as f64)
    }

    /// Destination position of a source point, when the warp can invert itself.
    fn map_source_point(&self, _pt: Point2) -> Option<Point2> {
        None
    }

    /// Source rectangle covering the source positions of every pixel of `rect`.
    ///
    /// The default samples only the four edges of `rect`, which covers the
    /// interior for smooth monotone mappings. Returns `None` when the mapped
    /// positions are not finite or the rectangle is empty.
    fn map_dest_rect(&self, rect: &Rect) -> Option<Rect> {
        if rect.is_empty() {
            return None;
        }
        let mut bounds = Bounds::default();
        let mut points = Vec::with_capacity(2 * rect.width.max(rect.height) as usize);
        let last_row = rect.y + rect.height - 1;
        let last_col = rect.x + rect.width - 1;

        self.map_sparse(&Rect::new(rect.x, rect.y, rect.width, 1), 1, 1, &mut points);
        bounds.add_all(&points);
        if rect.height > 1 {
            self.map_sparse(&Rect::new(rect.x, last_row, rect.width, 1), 1, 1, &mut points);
            bounds.add_all(&points);
        }
        if rect.height > 2 {
            let side = |x| Rect::new(x, rect.y + 1, 1, rect.height - 2);
            self.map_sparse(&side(rect.x), 1, 1, &mut points);
            bounds.add_all(&points);
            self.map_sparse(&side(last_col), 1, 1, &mut points);
            bounds.add_all(&points);
        }
        bounds.to_rect()
    }

    /// Destination rectangle whose backward mapping covers `rect`, if known.
    fn map_source_rect(&self, _rect: &Rect) -> Option<Rect> {
        None
    }
}

/// Running bounding box of mapped positions.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
    finite: bool,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            finite: true,
        }
    }
}

impl Bounds {
    pub(crate) fn add(&mut self, x: f64, y: f64) {
        if !x.is_finite() || !y.is_finite() {
            self.finite = false;
            return;
        }
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn add_all(&mut self, points: &[f32]) {
        for p in points.chunks_exact(2) {
            self.add(p[0] as f64, p[1] as f64);
        }
    }

    /// Integer rectangle covering the positions: `floor(min)` up to `ceil(max) + 1`
    /// so that the pixel holding the largest position is included.
    pub(crate) fn to_rect(self) -> Option<Rect> {
        if !self.finite || self.min_x > self.max_x || self.min_y > self.max_y {
            return None;
        }
        let limit = i32::MAX as f64 / 2.0;
        if self.min_x.abs().max(self.max_x.abs()).max(self.min_y.abs()).max(self.max_y.abs())
            > limit
        {
            return None;
        }
        let x = self.min_x.floor();
        let y = self.min_y.floor();
        let w = (self.max_x - x).ceil() + 1.0;
        let h = (self.max_y - y).ceil() + 1.0;
        Some(Rect::new(x as i32, y as i32, w as i32, h as i32))
    }
}

// Calls `f(x, y)` for every sampled pixel of `rect`, row by row.
pub(crate) fn for_each_sample(
    rect: &Rect,
    period_x: i32,
    period_y: i32,
    mut f: impl FnMut(i32, i32),
) {
    debug_assert!(period_x > 0 && period_y > 0);
    if rect.is_empty() {
        return;
    }
    for y in (rect.y..(rect.max_y() as i32)).step_by(period_y as usize) {
        for x in (rect.x..(rect.max_x() as i32)).step_by(period_x as usize) {
            f(x, y);
        }
    }
}
