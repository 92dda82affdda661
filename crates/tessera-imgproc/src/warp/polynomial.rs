use tessera_image::{Point2, Rect};

use super::{for_each_sample, Warp, WarpAffine, WarpError};

// Degree of a polynomial with `n` coefficients, if `n` is a triangular number.
fn degree_of(n: usize) -> Option<usize> {
    let mut remaining = n;
    let mut degree = 0;
    while remaining > degree + 1 {
        remaining -= degree + 1;
        degree += 1;
    }
    (remaining == degree + 1).then_some(degree)
}

fn num_terms(degree: usize) -> usize {
    (degree + 1) * (degree + 2) / 2
}

// Monomials 1, x, y, x^2, xy, y^2, ... written into `terms`.
fn monomials(x: f64, y: f64, degree: usize, terms: &mut Vec<f64>) {
    terms.clear();
    let mut xp = Vec::with_capacity(degree + 1);
    let mut yp = Vec::with_capacity(degree + 1);
    let (mut a, mut b) = (1.0, 1.0);
    for _ in 0..=degree {
        xp.push(a);
        yp.push(b);
        a *= x;
        b *= y;
    }
    for nx in 0..=degree {
        for ny in 0..=nx {
            terms.push(xp[nx - ny] * yp[ny]);
        }
    }
}

// Solves the square system `a x = b` in place by Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<f64>, mut b: Vec<[f64; 2]>, n: usize) -> Result<Vec<[f64; 2]>, WarpError> {
    let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(f64::MIN_POSITIVE);
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i * n + col].abs().total_cmp(&a[j * n + col].abs()))
            .ok_or(WarpError::SingularMatrix)?;
        if a[pivot * n + col].abs() <= scale * 1e-12 {
            return Err(WarpError::SingularMatrix);
        }
        if pivot != col {
            for k in 0..n {
                a.swap(pivot * n + k, col * n + k);
            }
            b.swap(pivot, col);
        }
        for row in (col + 1)..n {
            let f = a[row * n + col] / a[col * n + col];
            if f == 0.0 {
                continue;
            }
            for k in col..n {
                a[row * n + k] -= f * a[col * n + k];
            }
            b[row][0] -= f * b[col][0];
            b[row][1] -= f * b[col][1];
        }
    }
    let mut x = vec![[0.0; 2]; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc[0] -= a[row * n + k] * x[k][0];
            acc[1] -= a[row * n + k] * x[k][1];
        }
        let d = a[row * n + row];
        x[row] = [acc[0] / d, acc[1] / d];
    }
    Ok(x)
}

/// A polynomial backward mapping of arbitrary degree.
///
/// With `X = (x + 0.5) * pre_scale_x` and `Y = (y + 0.5) * pre_scale_y`, a
/// destination pixel reads from
/// `post_scale_x * sum(x_coeffs[k] * X^i * Y^j) - 0.5` and the equivalent
/// vertical expression. Terms are ordered `1, X, Y, X^2, XY, Y^2, ...`. The
/// scale factors keep the powers of large coordinates well conditioned.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpPolynomial {
    x_coeffs: Vec<f64>,
    y_coeffs: Vec<f64>,
    pre_scale: (f64, f64),
    post_scale: (f64, f64),
    degree: usize,
}

impl WarpPolynomial {
    /// Create a warp from its coefficients with unit scale factors.
    ///
    /// # Errors
    ///
    /// If the two coefficient arrays differ in length or their length is not
    /// `(d + 1)(d + 2) / 2` for some degree `d`.
    pub fn new(x_coeffs: Vec<f64>, y_coeffs: Vec<f64>) -> Result<Self, WarpError> {
        Self::with_scale(x_coeffs, y_coeffs, (1.0, 1.0), (1.0, 1.0))
    }

    /// Create a warp from its coefficients and scale factors.
    pub fn with_scale(
        x_coeffs: Vec<f64>,
        y_coeffs: Vec<f64>,
        pre_scale: (f64, f64),
        post_scale: (f64, f64),
    ) -> Result<Self, WarpError> {
        let invalid = || WarpError::InvalidCoefficients(x_coeffs.len(), y_coeffs.len());
        if x_coeffs.len() != y_coeffs.len() {
            return Err(invalid());
        }
        let degree = degree_of(x_coeffs.len()).ok_or_else(invalid)?;
        Ok(Self {
            x_coeffs,
            y_coeffs,
            pre_scale,
            post_scale,
            degree,
        })
    }

    /// Least-squares fit of a polynomial mapping each destination point onto its source point.
    ///
    /// # Arguments
    ///
    /// * `source` - Control points in the source image.
    /// * `dest` - The matching control points in the destination image.
    /// * `degree` - Degree of the polynomial.
    /// * `pre_scale` - Scale applied to destination coordinates before the powers.
    /// * `post_scale` - Scale applied to the polynomial value.
    ///
    /// # Errors
    ///
    /// If the point counts differ, there are fewer pairs than coefficients, or
    /// the points are degenerate (e.g. collinear for an affine fit).
    pub fn fit(
        source: &[Point2],
        dest: &[Point2],
        degree: usize,
        pre_scale: (f64, f64),
        post_scale: (f64, f64),
    ) -> Result<Self, WarpError> {
        if source.len() != dest.len() {
            return Err(WarpError::PointCountMismatch(source.len(), dest.len()));
        }
        let n = num_terms(degree);
        if source.len() < n {
            return Err(WarpError::NotEnoughPoints {
                degree,
                needed: n,
                got: source.len(),
            });
        }
        if post_scale.0 == 0.0 || post_scale.1 == 0.0 {
            return Err(WarpError::SingularMatrix);
        }

        // Normal equations: (A^T A) c = A^T b for both coordinates at once.
        let mut ata = vec![0.0; n * n];
        let mut atb = vec![[0.0; 2]; n];
        let mut terms = Vec::with_capacity(n);
        for (s, d) in source.iter().zip(dest) {
            monomials(
                (d.x + 0.5) * pre_scale.0,
                (d.y + 0.5) * pre_scale.1,
                degree,
                &mut terms,
            );
            let target = [(s.x + 0.5) / post_scale.0, (s.y + 0.5) / post_scale.1];
            for i in 0..n {
                for j in 0..n {
                    ata[i * n + j] += terms[i] * terms[j];
                }
                atb[i][0] += terms[i] * target[0];
                atb[i][1] += terms[i] * target[1];
            }
        }
        let coeffs = solve(ata, atb, n)?;
        log::debug!("fitted degree {degree} polynomial warp to {} points", source.len());

        Ok(Self {
            x_coeffs: coeffs.iter().map(|c| c[0]).collect(),
            y_coeffs: coeffs.iter().map(|c| c[1]).collect(),
            pre_scale,
            post_scale,
            degree,
        })
    }

    /// Degree of the polynomial.
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Horizontal coefficients.
    pub fn x_coeffs(&self) -> &[f64] {
        &self.x_coeffs
    }

    /// Vertical coefficients.
    pub fn y_coeffs(&self) -> &[f64] {
        &self.y_coeffs
    }

    /// The equivalent affine warp of a degree one polynomial.
    pub fn to_affine(&self) -> Option<WarpAffine> {
        if self.degree != 1 {
            return None;
        }
        let (px, py) = self.pre_scale;
        let (sx, sy) = self.post_scale;
        let (c, d) = (&self.x_coeffs, &self.y_coeffs);
        Some(WarpAffine::new([
            sx * c[1] * px,
            sx * c[2] * py,
            sx * c[0],
            sy * d[1] * px,
            sy * d[2] * py,
            sy * d[0],
        ]))
    }

    fn eval(&self, x: f64, y: f64, terms: &mut Vec<f64>) -> (f64, f64) {
        monomials(x * self.pre_scale.0, y * self.pre_scale.1, self.degree, terms);
        let (mut u, mut v) = (0.0, 0.0);
        for ((t, cx), cy) in terms.iter().zip(&self.x_coeffs).zip(&self.y_coeffs) {
            u += t * cx;
            v += t * cy;
        }
        (u * self.post_scale.0, v * self.post_scale.1)
    }
}

impl Warp for WarpPolynomial {
    fn map_sparse(&self, rect: &Rect, period_x: i32, period_y: i32, out: &mut Vec<f32>) {
        out.clear();
        let mut terms = Vec::with_capacity(self.x_coeffs.len());
        for_each_sample(rect, period_x, period_y, |x, y| {
            let (u, v) = self.eval(x as f64 + 0.5, y as f64 + 0.5, &mut terms);
            out.push((u - 0.5) as f32);
            out.push((v - 0.5) as f32);
        });
    }

    fn map_dest_point(&self, pt: Point2) -> Point2 {
        let mut terms = Vec::with_capacity(self.x_coeffs.len());
        let (u, v) = self.eval(pt.x + 0.5, pt.y + 0.5, &mut terms);
        Point2::new(u - 0.5, v - 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::{degree_of, WarpPolynomial};
    use crate::warp::{Warp, WarpError};
    use tessera_image::{Point2, Rect};

    #[test]
    fn degree_from_coefficient_count() {
        assert_eq!(degree_of(1), Some(0));
        assert_eq!(degree_of(3), Some(1));
        assert_eq!(degree_of(6), Some(2));
        assert_eq!(degree_of(10), Some(3));
        assert_eq!(degree_of(4), None);
        assert_eq!(degree_of(0), None);
    }

    #[test]
    fn invalid_coefficients() {
        assert_eq!(
            WarpPolynomial::new(vec![0.0; 3], vec![0.0; 6]),
            Err(WarpError::InvalidCoefficients(3, 6))
        );
        assert!(WarpPolynomial::new(vec![0.0; 5], vec![0.0; 5]).is_err());
    }

    #[test]
    fn linear_polynomial_is_identity() -> Result<(), WarpError> {
        let warp = WarpPolynomial::new(vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0])?;
        assert_eq!(warp.degree(), 1);
        assert_eq!(warp.map_rect(&Rect::new(4, 7, 2, 1)), vec![4.0, 7.0, 5.0, 7.0]);
        assert_eq!(warp.map_source_rect(&Rect::new(0, 0, 2, 2)), None);
        Ok(())
    }

    #[test]
    fn fit_recovers_quadratic() -> Result<(), WarpError> {
        let truth = WarpPolynomial::with_scale(
            vec![1.0, 0.9, 0.1, 0.001, 0.002, -0.001],
            vec![-2.0, 0.05, 1.1, 0.0, 0.001, 0.002],
            (1.0, 1.0),
            (1.0, 1.0),
        )?;
        let dest: Vec<Point2> = (0..5)
            .flat_map(|j| (0..5).map(move |i| Point2::new(i as f64 * 20.0, j as f64 * 15.0)))
            .collect();
        let source: Vec<Point2> = dest.iter().map(|&p| truth.map_dest_point(p)).collect();

        let fitted = WarpPolynomial::fit(&source, &dest, 2, (0.01, 0.01), (100.0, 100.0))?;
        let probe = Point2::new(33.0, 41.0);
        let a = truth.map_dest_point(probe);
        let b = fitted.map_dest_point(probe);
        approx::assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn affine_fit_converts_to_affine() -> Result<(), WarpError> {
        let dest = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(10.0, 10.0),
        ];
        let source: Vec<Point2> = dest.iter().map(|p| Point2::new(p.x + 3.0, p.y * 2.0)).collect();
        let fitted = WarpPolynomial::fit(&source, &dest, 1, (1.0, 1.0), (1.0, 1.0))?;
        let affine = fitted.to_affine().ok_or(WarpError::SingularMatrix)?;
        let p = affine.map_dest_point(Point2::new(5.0, 5.0));
        approx::assert_abs_diff_eq!(p.x, 8.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(p.y, 10.0, epsilon = 1e-9);
        Ok(())
    }

    #[test]
    fn fit_rejects_degenerate_input() {
        let pts = [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)];
        assert_eq!(
            WarpPolynomial::fit(&pts, &pts, 1, (1.0, 1.0), (1.0, 1.0)),
            Err(WarpError::NotEnoughPoints {
                degree: 1,
                needed: 3,
                got: 2
            })
        );
        let line = [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 2.0)];
        assert_eq!(
            WarpPolynomial::fit(&line, &line, 1, (1.0, 1.0), (1.0, 1.0)),
            Err(WarpError::SingularMatrix)
        );
    }
}
