use tessera_image::{Point2, Rect};

use super::{for_each_sample, Bounds, Warp, WarpError};

#[rustfmt::skip]
fn determinant3x3(m: &[f64; 9]) -> f64 {
    m[0] * (m[4] * m[8] - m[5] * m[7]) -
    m[1] * (m[3] * m[8] - m[5] * m[6]) +
    m[2] * (m[3] * m[7] - m[4] * m[6])
}

#[rustfmt::skip]
fn adjugate3x3(m: &[f64; 9]) -> [f64; 9] {
    [
        m[4] * m[8] - m[5] * m[7],  // [0, 0]
        m[2] * m[7] - m[1] * m[8],  // [0, 1]
        m[1] * m[5] - m[2] * m[4],  // [0, 2]
        m[5] * m[6] - m[3] * m[8],  // [1, 0]
        m[0] * m[8] - m[2] * m[6],  // [1, 1]
        m[2] * m[3] - m[0] * m[5],  // [1, 2]
        m[3] * m[7] - m[4] * m[6],  // [2, 0]
        m[1] * m[6] - m[0] * m[7],  // [2, 1]
        m[0] * m[4] - m[1] * m[3],  // [2, 2]
    ]
}

fn inverse_perspective_matrix(m: &[f64; 9]) -> Option<[f64; 9]> {
    let det = determinant3x3(m);
    if det == 0.0 || !det.is_finite() {
        return None;
    }
    let inv_det = 1.0 / det;
    Some(adjugate3x3(m).map(|v| v * inv_det))
}

// Maps a point, returning `None` on or behind the horizon.
#[inline]
fn transform_point(x: f64, y: f64, m: &[f64; 9]) -> Option<(f64, f64)> {
    let w = m[6] * x + m[7] * y + m[8];
    if w <= 0.0 {
        return None;
    }
    let u = (m[0] * x + m[1] * y + m[2]) / w;
    let v = (m[3] * x + m[4] * y + m[5]) / w;
    Some((u, v))
}

fn map_corners(rect: &Rect, m: &[f64; 9]) -> Option<Rect> {
    if rect.is_empty() {
        return None;
    }
    let x0 = rect.x as f64 + 0.5;
    let y0 = rect.y as f64 + 0.5;
    let x1 = x0 + (rect.width - 1) as f64;
    let y1 = y0 + (rect.height - 1) as f64;
    let mut bounds = Bounds::default();
    for (x, y) in [(x0, y0), (x1, y0), (x0, y1), (x1, y1)] {
        let (u, v) = transform_point(x, y, m)?;
        bounds.add(u - 0.5, v - 0.5);
    }
    bounds.to_rect()
}

/// A projective backward mapping.
///
/// The 3x3 row-major matrix maps a destination point in homogeneous
/// coordinates to the source. Mappings are only defined where the homogeneous
/// weight is positive; rectangles with a corner beyond that horizon map to an
/// unknown rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpPerspective {
    m: [f64; 9],
    inv: Option<[f64; 9]>,
}

impl WarpPerspective {
    /// Create a warp from its backward (destination to source) matrix.
    pub fn new(m: [f64; 9]) -> Self {
        Self {
            m,
            inv: inverse_perspective_matrix(&m),
        }
    }

    /// Create a warp from a forward (source to destination) matrix.
    ///
    /// # Errors
    ///
    /// If the matrix is singular, an error is returned.
    pub fn from_forward(m: [f64; 9]) -> Result<Self, WarpError> {
        let inv = inverse_perspective_matrix(&m).ok_or(WarpError::SingularMatrix)?;
        Ok(Self { m: inv, inv: Some(m) })
    }

    /// The backward matrix.
    pub fn matrix(&self) -> &[f64; 9] {
        &self.m
    }
}

impl Warp for WarpPerspective {
    fn map_sparse(&self, rect: &Rect, period_x: i32, period_y: i32, out: &mut Vec<f32>) {
        out.clear();
        for_each_sample(rect, period_x, period_y, |x, y| {
            match transform_point(x as f64 + 0.5, y as f64 + 0.5, &self.m) {
                Some((u, v)) => {
                    out.push((u - 0.5) as f32);
                    out.push((v - 0.5) as f32);
                }
                None => {
                    out.push(f32::NAN);
                    out.push(f32::NAN);
                }
            }
        });
    }

    fn map_dest_point(&self, pt: Point2) -> Point2 {
        match transform_point(pt.x + 0.5, pt.y + 0.5, &self.m) {
            Some((u, v)) => Point2::new(u - 0.5, v - 0.5),
            None => Point2::new(f64::NAN, f64::NAN),
        }
    }

    fn map_source_point(&self, pt: Point2) -> Option<Point2> {
        let (u, v) = transform_point(pt.x + 0.5, pt.y + 0.5, self.inv.as_ref()?)?;
        Some(Point2::new(u - 0.5, v - 0.5))
    }

    fn map_dest_rect(&self, rect: &Rect) -> Option<Rect> {
        map_corners(rect, &self.m)
    }

    fn map_source_rect(&self, rect: &Rect) -> Option<Rect> {
        map_corners(rect, self.inv.as_ref()?)
    }
}

#[cfg(test)]
mod tests {
    use super::{inverse_perspective_matrix, WarpPerspective};
    use crate::warp::{Warp, WarpError};
    use tessera_image::{Point2, Rect};

    #[test]
    fn inverse_of_scale() {
        let m = [2.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 1.0];
        let inv = inverse_perspective_matrix(&m);
        assert_eq!(inv, Some([0.5, 0.0, 0.0, 0.0, 0.25, 0.0, 0.0, 0.0, 1.0]));
        assert_eq!(inverse_perspective_matrix(&[0.0; 9]), None);
    }

    #[test]
    fn identity_perspective() {
        let warp = WarpPerspective::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(warp.map_rect(&Rect::new(2, 3, 1, 1)), vec![2.0, 3.0]);
        assert_eq!(warp.map_dest_rect(&Rect::new(2, 3, 5, 6)), Some(Rect::new(2, 3, 5, 6)));
        assert_eq!(warp.map_source_rect(&Rect::new(2, 3, 5, 6)), Some(Rect::new(2, 3, 5, 6)));
    }

    #[test]
    fn forward_covers_backward() -> Result<(), WarpError> {
        let warp = WarpPerspective::from_forward([1.1, 0.05, 3.0, -0.02, 0.95, 1.0, 0.0004, 0.0002, 1.0])?;
        for r in [Rect::new(0, 0, 64, 64), Rect::new(17, 90, 5, 33)] {
            let d = warp.map_source_rect(&r).ok_or(WarpError::SingularMatrix)?;
            let back = warp.map_dest_rect(&d).ok_or(WarpError::SingularMatrix)?;
            assert!(back.contains(&r), "{back} does not contain {r}");
        }
        Ok(())
    }

    #[test]
    fn beyond_horizon_is_unknown() {
        // w = x + 0.5 - 10 is negative for the left part of the plane.
        let warp = WarpPerspective::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, -10.0]);
        assert_eq!(warp.map_dest_rect(&Rect::new(0, 0, 20, 20)), None);
        let out = warp.map_rect(&Rect::new(0, 0, 1, 1));
        assert!(out[0].is_nan());
        assert!(warp.map_dest_point(Point2::new(0.0, 0.0)).x.is_nan());
    }
}
