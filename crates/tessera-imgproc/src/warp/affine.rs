use tessera_image::{Point2, Rect};

use super::{for_each_sample, Bounds, Warp, WarpError};

/// The affine matrix undoing `m`, or `None` if `m` collapses the plane.
///
/// Matrices are stored row-major as `[a, b, c, d, e, f]`, mapping `(x, y)` to
/// `(a * x + b * y + c, d * x + e * y + f)`.
pub fn invert_affine(m: &[f64; 6]) -> Option<[f64; 6]> {
    let [a, b, c, d, e, f] = *m;
    let det = a * e - b * d;
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    // Adjugate of the linear part, then the translation pulled back through it.
    let (ia, ib, id, ie) = (e / det, -b / det, -d / det, a / det);
    Some([ia, ib, -(ia * c + ib * f), id, ie, -(id * c + ie * f)])
}

/// Forward matrix turning the plane by `degrees` about `center` and scaling it
/// by `scale` around the same point.
///
/// Positive angles turn counter-clockwise when `y` points down, so `center`
/// is the one fixed point of the mapping.
pub fn rotation_matrix(center: (f64, f64), degrees: f64, scale: f64) -> [f64; 6] {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let (c, s) = (scale * cos, scale * sin);
    let (cx, cy) = center;
    [c, s, cx - c * cx - s * cy, -s, c, cy + s * cx - c * cy]
}

#[inline]
fn transform_point(x: f64, y: f64, m: &[f64; 6]) -> (f64, f64) {
    (m[0] * x + m[1] * y + m[2], m[3] * x + m[4] * y + m[5])
}

// Bounding rectangle of the four corner pixels of `rect` mapped through `m`.
fn map_corners(rect: &Rect, m: &[f64; 6]) -> Option<Rect> {
    if rect.is_empty() {
        return None;
    }
    let x0 = rect.x as f64 + 0.5;
    let y0 = rect.y as f64 + 0.5;
    let x1 = x0 + (rect.width - 1) as f64;
    let y1 = y0 + (rect.height - 1) as f64;
    let mut bounds = Bounds::default();
    for (x, y) in [(x0, y0), (x1, y0), (x0, y1), (x1, y1)] {
        let (u, v) = transform_point(x, y, m);
        bounds.add(u - 0.5, v - 0.5);
    }
    bounds.to_rect()
}

/// An affine backward mapping.
///
/// The matrix `[a, b, c, d, e, f]` maps a destination point to the source point
/// `(a * x + b * y + c, d * x + e * y + f)`.
///
/// # Example
///
/// ```
/// use tessera_image::Rect;
/// use tessera_imgproc::warp::{Warp, WarpAffine};
///
/// let warp = WarpAffine::translation(5.0, 5.0);
///
/// assert_eq!(warp.map_dest_rect(&Rect::new(0, 0, 10, 10)), Some(Rect::new(5, 5, 10, 10)));
/// assert_eq!(warp.map_source_rect(&Rect::new(5, 5, 10, 10)), Some(Rect::new(0, 0, 10, 10)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WarpAffine {
    m: [f64; 6],
    inv: Option<[f64; 6]>,
}

impl WarpAffine {
    /// Create a warp from its backward (destination to source) matrix.
    pub fn new(m: [f64; 6]) -> Self {
        Self {
            m,
            inv: invert_affine(&m),
        }
    }

    /// Create a warp from a forward (source to destination) matrix.
    ///
    /// # Errors
    ///
    /// If the matrix is singular, an error is returned.
    pub fn from_forward(m: [f64; 6]) -> Result<Self, WarpError> {
        let inv = invert_affine(&m).ok_or(WarpError::SingularMatrix)?;
        Ok(Self { m: inv, inv: Some(m) })
    }

    /// A warp reading destination `(x, y)` from source `(x + dx, y + dy)`.
    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new([1.0, 0.0, dx, 0.0, 1.0, dy])
    }

    /// A warp rendering the source rotated by `angle` degrees and scaled about `center`.
    pub fn rotation(center: (f64, f64), angle: f64, scale: f64) -> Result<Self, WarpError> {
        Self::from_forward(rotation_matrix(center, angle, scale))
    }

    /// The backward matrix.
    pub fn matrix(&self) -> &[f64; 6] {
        &self.m
    }

    /// The forward matrix, if the mapping is invertible.
    pub fn inverse(&self) -> Option<&[f64; 6]> {
        self.inv.as_ref()
    }
}

impl Warp for WarpAffine {
    fn map_sparse(&self, rect: &Rect, period_x: i32, period_y: i32, out: &mut Vec<f32>) {
        out.clear();
        for_each_sample(rect, period_x, period_y, |x, y| {
            let (u, v) = transform_point(x as f64 + 0.5, y as f64 + 0.5, &self.m);
            out.push((u - 0.5) as f32);
            out.push((v - 0.5) as f32);
        });
    }

    fn map_dest_point(&self, pt: Point2) -> Point2 {
        let (u, v) = transform_point(pt.x + 0.5, pt.y + 0.5, &self.m);
        Point2::new(u - 0.5, v - 0.5)
    }

    fn map_source_point(&self, pt: Point2) -> Option<Point2> {
        let inv = self.inv.as_ref()?;
        let (u, v) = transform_point(pt.x + 0.5, pt.y + 0.5, inv);
        Some(Point2::new(u - 0.5, v - 0.5))
    }

    fn map_dest_rect(&self, rect: &Rect) -> Option<Rect> {
        map_corners(rect, &self.m)
    }

    fn map_source_rect(&self, rect: &Rect) -> Option<Rect> {
        map_corners(rect, self.inv.as_ref()?)
    }
}
