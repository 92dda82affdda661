use tessera_image::Rect;

use super::{for_each_sample, Warp, WarpError};

/// A mapping sampled on a regular grid of destination pixels.
///
/// Grid node `(i, j)` sits on destination pixel
/// `(x_start + i * x_step, y_start + j * y_step)` and stores its source position.
/// Pixels inside the grid are mapped by bilinear interpolation of the four
/// nodes around them; pixels outside the grid map to themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpGrid {
    x_start: i32,
    x_step: i32,
    x_cells: usize,
    y_start: i32,
    y_step: i32,
    y_cells: usize,
    positions: Vec<f32>,
}

impl WarpGrid {
    /// Create a grid from interleaved `x, y` source positions, row-major over
    /// `(x_cells + 1) * (y_cells + 1)` nodes.
    ///
    /// # Errors
    ///
    /// If a step or cell count is not positive or the positions do not match the grid.
    pub fn new(
        (x_start, x_step, x_cells): (i32, i32, usize),
        (y_start, y_step, y_cells): (i32, i32, usize),
        positions: Vec<f32>,
    ) -> Result<Self, WarpError> {
        if x_step <= 0 || y_step <= 0 || x_cells == 0 || y_cells == 0 {
            return Err(WarpError::InvalidGrid(format!(
                "steps ({x_step}, {y_step}) and cell counts ({x_cells}, {y_cells}) must be > 0"
            )));
        }
        let expected = 2 * (x_cells + 1) * (y_cells + 1);
        if positions.len() != expected {
            return Err(WarpError::InvalidGrid(format!(
                "expected {expected} positions, got {}",
                positions.len()
            )));
        }
        let x_end = x_start as i64 + x_step as i64 * x_cells as i64;
        let y_end = y_start as i64 + y_step as i64 * y_cells as i64;
        if x_end > i32::MAX as i64 || y_end > i32::MAX as i64 {
            return Err(WarpError::InvalidGrid("grid exceeds the coordinate range".into()));
        }
        Ok(Self {
            x_start,
            x_step,
            x_cells,
            y_start,
            y_step,
            y_cells,
            positions,
        })
    }

    /// Samples another warp on a grid.
    pub fn from_warp(
        warp: &dyn Warp,
        (x_start, x_step, x_cells): (i32, i32, usize),
        (y_start, y_step, y_cells): (i32, i32, usize),
    ) -> Result<Self, WarpError> {
        let mut positions = Vec::new();
        if x_step > 0 && y_step > 0 {
            let rect = Rect::new(
                x_start,
                y_start,
                (x_cells as i64 * x_step as i64 + 1).min(i32::MAX as i64) as i32,
                (y_cells as i64 * y_step as i64 + 1).min(i32::MAX as i64) as i32,
            );
            warp.map_sparse(&rect, x_step, y_step, &mut positions);
        }
        Self::new(
            (x_start, x_step, x_cells),
            (y_start, y_step, y_cells),
            positions,
        )
    }

    fn x_end(&self) -> i32 {
        self.x_start + self.x_step * self.x_cells as i32
    }

    fn y_end(&self) -> i32 {
        self.y_start + self.y_step * self.y_cells as i32
    }

    #[inline]
    fn node(&self, i: usize, j: usize) -> (f32, f32) {
        let k = 2 * (j * (self.x_cells + 1) + i);
        (self.positions[k], self.positions[k + 1])
    }

    fn map_pixel(&self, x: i32, y: i32) -> (f32, f32) {
        if x < self.x_start || x >= self.x_end() || y < self.y_start || y >= self.y_end() {
            return (x as f32, y as f32);
        }
        let cx = ((x - self.x_start) / self.x_step) as usize;
        let cy = ((y - self.y_start) / self.y_step) as usize;
        let fx = ((x - self.x_start) % self.x_step) as f32 / self.x_step as f32;
        let fy = ((y - self.y_start) % self.y_step) as f32 / self.y_step as f32;
        let (x0, y0) = self.node(cx, cy);
        let (x1, y1) = self.node(cx + 1, cy);
        let (x2, y2) = self.node(cx, cy + 1);
        let (x3, y3) = self.node(cx + 1, cy + 1);
        let top = (x0 + (x1 - x0) * fx, y0 + (y1 - y0) * fx);
        let bottom = (x2 + (x3 - x2) * fx, y2 + (y3 - y2) * fx);
        (
            top.0 + (bottom.0 - top.0) * fy,
            top.1 + (bottom.1 - top.1) * fy,
        )
    }
}

impl Warp for WarpGrid {
    fn map_sparse(&self, rect: &Rect, period_x: i32, period_y: i32, out: &mut Vec<f32>) {
        out.clear();
        for_each_sample(rect, period_x, period_y, |x, y| {
            let (u, v) = self.map_pixel(x, y);
            out.push(u);
            out.push(v);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::WarpGrid;
    use crate::warp::{Warp, WarpAffine, WarpError};
    use tessera_image::Rect;

    #[test]
    fn interpolates_inside_and_identity_outside() -> Result<(), WarpError> {
        // One 4x4 cell whose nodes are shifted by (10, 20).
        let positions = vec![10.0, 20.0, 14.0, 20.0, 10.0, 24.0, 14.0, 24.0];
        let grid = WarpGrid::new((0, 4, 1), (0, 4, 1), positions)?;
        assert_eq!(grid.map_rect(&Rect::new(2, 1, 1, 1)), vec![12.0, 21.0]);
        assert_eq!(grid.map_rect(&Rect::new(4, 0, 1, 1)), vec![4.0, 0.0]);
        assert_eq!(grid.map_rect(&Rect::new(-1, 2, 1, 1)), vec![-1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn sampled_affine_matches_nodes() -> Result<(), WarpError> {
        let affine = WarpAffine::new([1.5, 0.0, 3.0, 0.0, 0.5, -2.0]);
        let grid = WarpGrid::from_warp(&affine, (0, 8, 4), (0, 8, 4))?;
        // An affine mapping is reproduced exactly by bilinear interpolation.
        let rect = Rect::new(3, 5, 20, 7);
        for (a, b) in grid.map_rect(&rect).iter().zip(affine.map_rect(&rect).iter()) {
            approx::assert_abs_diff_eq!(a, b, epsilon = 1e-4);
        }
        Ok(())
    }

    #[test]
    fn invalid_grids() {
        assert!(WarpGrid::new((0, 0, 1), (0, 1, 1), vec![0.0; 8]).is_err());
        assert!(WarpGrid::new((0, 1, 1), (0, 1, 1), vec![0.0; 6]).is_err());
    }
}
