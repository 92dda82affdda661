use num_traits::Zero;
use tessera_image::Padding;

use super::InterpolationError;

// Kernels taller than this fall back to a heap buffer for the vertical pass.
const STACK_ROWS: usize = 8;

// Runs `h` on every row of a row-major neighborhood, then `v` on the column of results.
#[inline]
fn separable<T: Copy + Zero>(
    samples: &[T],
    width: usize,
    height: usize,
    h: impl Fn(&[T]) -> T,
    v: impl Fn(&[T]) -> T,
) -> T {
    debug_assert_eq!(samples.len(), width * height);
    if height <= STACK_ROWS {
        let mut column = [T::zero(); STACK_ROWS];
        for (dst, row) in column.iter_mut().zip(samples.chunks_exact(width)) {
            *dst = h(row);
        }
        v(&column[..height])
    } else {
        let column: Vec<T> = samples.chunks_exact(width).map(h).collect();
        v(&column)
    }
}

/// A separable resampling kernel.
///
/// A kernel covers a `width x height` neighborhood of samples around a key sample.
/// The key sample is the one at or just before the mapped position; the paddings
/// tell how many samples the neighborhood extends on each side of it.
///
/// Integer data is resampled in fixed point: the fractional position is an
/// integer in `[0, 2^subsample_bits)`. Floating data uses a real fraction in
/// `[0, 1)`. Out of range fractions are a caller bug and are not checked in
/// release builds.
///
/// Only the horizontal 1-D forms are required. The vertical forms default to the
/// horizontal ones and every 2-D form is a horizontal pass over each row followed
/// by a vertical pass over the results. Kernels override whatever they can do
/// better.
pub trait Interpolation: Send + Sync + std::fmt::Debug {
    /// Number of samples per row of the neighborhood.
    fn width(&self) -> usize;

    /// Number of rows of the neighborhood.
    fn height(&self) -> usize;

    /// Samples needed to the left of the key sample.
    fn left_padding(&self) -> i32;

    /// Samples needed to the right of the key sample.
    fn right_padding(&self) -> i32;

    /// Rows needed above the key sample.
    fn top_padding(&self) -> i32;

    /// Rows needed below the key sample.
    fn bottom_padding(&self) -> i32;

    /// Fixed-point precision of horizontal fractions.
    fn subsample_bits_h(&self) -> u32;

    /// Fixed-point precision of vertical fractions.
    fn subsample_bits_v(&self) -> u32;

    /// All four paddings.
    fn padding(&self) -> Padding {
        Padding::new(
            self.left_padding(),
            self.right_padding(),
            self.top_padding(),
            self.bottom_padding(),
        )
    }

    /// Checks that the neighborhood is not empty and that the paddings around
    /// the key sample span exactly `width x height` samples.
    ///
    /// # Errors
    ///
    /// If either dimension is zero or a padding is negative or inconsistent.
    fn validate(&self) -> Result<(), InterpolationError> {
        let (w, h) = (self.width(), self.height());
        if w == 0 || h == 0 {
            return Err(InterpolationError::InvalidKernelSize(w, h));
        }
        let p = self.padding();
        let spans = |lo: i32, hi: i32, len: usize| {
            lo >= 0 && hi >= 0 && (lo as i64 + hi as i64 + 1) == len as i64
        };
        if !spans(p.left, p.right, w) || !spans(p.top, p.bottom, h) {
            return Err(InterpolationError::InvalidPadding(w, h, p));
        }
        Ok(())
    }

    /// Returns true for the single-sample kernel, which ignores fractions.
    fn is_identity(&self) -> bool {
        self.width() == 1 && self.height() == 1 && self.padding().is_zero()
    }

    /// Interpolates a row of `width` integer samples.
    fn interpolate_h_int(&self, samples: &[i32], xfrac: i32) -> i32;

    /// Interpolates a row of `width` 32-bit float samples.
    fn interpolate_h_f32(&self, samples: &[f32], xfrac: f32) -> f32;

    /// Interpolates a row of `width` 64-bit float samples.
    fn interpolate_h_f64(&self, samples: &[f64], xfrac: f32) -> f64;

    /// Interpolates a column of `height` integer samples.
    fn interpolate_v_int(&self, samples: &[i32], yfrac: i32) -> i32 {
        self.interpolate_h_int(samples, yfrac)
    }

    /// Interpolates a column of `height` 32-bit float samples.
    fn interpolate_v_f32(&self, samples: &[f32], yfrac: f32) -> f32 {
        self.interpolate_h_f32(samples, yfrac)
    }

    /// Interpolates a column of `height` 64-bit float samples.
    fn interpolate_v_f64(&self, samples: &[f64], yfrac: f32) -> f64 {
        self.interpolate_h_f64(samples, yfrac)
    }

    /// Interpolates a row-major `height x width` neighborhood of integer samples.
    fn interpolate_int(&self, samples: &[i32], xfrac: i32, yfrac: i32) -> i32 {
        separable(
            samples,
            self.width(),
            self.height(),
            |row| self.interpolate_h_int(row, xfrac),
            |col| self.interpolate_v_int(col, yfrac),
        )
    }

    /// Interpolates a row-major `height x width` neighborhood of 32-bit float samples.
    fn interpolate_f32(&self, samples: &[f32], xfrac: f32, yfrac: f32) -> f32 {
        separable(
            samples,
            self.width(),
            self.height(),
            |row| self.interpolate_h_f32(row, xfrac),
            |col| self.interpolate_v_f32(col, yfrac),
        )
    }

    /// Interpolates a row-major `height x width` neighborhood of 64-bit float samples.
    fn interpolate_f64(&self, samples: &[f64], xfrac: f32, yfrac: f32) -> f64 {
        separable(
            samples,
            self.width(),
            self.height(),
            |row| self.interpolate_h_f64(row, xfrac),
            |col| self.interpolate_v_f64(col, yfrac),
        )
    }

    /// Two-tap horizontal form for kernels of width 2.
    fn interpolate_h2_int(&self, s0: i32, s1: i32, xfrac: i32) -> i32 {
        self.interpolate_h_int(&[s0, s1], xfrac)
    }

    /// Four-tap horizontal form for kernels of width 4.
    fn interpolate_h4_int(&self, s_: i32, s0: i32, s1: i32, s2: i32, xfrac: i32) -> i32 {
        self.interpolate_h_int(&[s_, s0, s1, s2], xfrac)
    }

    /// Two-tap vertical form for kernels of height 2.
    fn interpolate_v2_int(&self, s0: i32, s1: i32, yfrac: i32) -> i32 {
        self.interpolate_v_int(&[s0, s1], yfrac)
    }

    /// Four-tap vertical form for kernels of height 4.
    fn interpolate_v4_int(&self, s_: i32, s0: i32, s1: i32, s2: i32, yfrac: i32) -> i32 {
        self.interpolate_v_int(&[s_, s0, s1, s2], yfrac)
    }

    /// 2x2 form for integer samples.
    fn interpolate_2x2_int(&self, s: &[i32; 4], xfrac: i32, yfrac: i32) -> i32 {
        let s0 = self.interpolate_h2_int(s[0], s[1], xfrac);
        let s1 = self.interpolate_h2_int(s[2], s[3], xfrac);
        self.interpolate_v2_int(s0, s1, yfrac)
    }

    /// 4x4 form for integer samples, row-major.
    fn interpolate_4x4_int(&self, s: &[i32; 16], xfrac: i32, yfrac: i32) -> i32 {
        let r: [i32; 4] = std::array::from_fn(|j| {
            let i = 4 * j;
            self.interpolate_h4_int(s[i], s[i + 1], s[i + 2], s[i + 3], xfrac)
        });
        self.interpolate_v4_int(r[0], r[1], r[2], r[3], yfrac)
    }

    /// Two-tap horizontal form for 32-bit floats.
    fn interpolate_h2_f32(&self, s0: f32, s1: f32, xfrac: f32) -> f32 {
        self.interpolate_h_f32(&[s0, s1], xfrac)
    }

    /// Four-tap horizontal form for 32-bit floats.
    fn interpolate_h4_f32(&self, s_: f32, s0: f32, s1: f32, s2: f32, xfrac: f32) -> f32 {
        self.interpolate_h_f32(&[s_, s0, s1, s2], xfrac)
    }

    /// Two-tap vertical form for 32-bit floats.
    fn interpolate_v2_f32(&self, s0: f32, s1: f32, yfrac: f32) -> f32 {
        self.interpolate_v_f32(&[s0, s1], yfrac)
    }

    /// Four-tap vertical form for 32-bit floats.
    fn interpolate_v4_f32(&self, s_: f32, s0: f32, s1: f32, s2: f32, yfrac: f32) -> f32 {
        self.interpolate_v_f32(&[s_, s0, s1, s2], yfrac)
    }

    /// 2x2 form for 32-bit floats.
    fn interpolate_2x2_f32(&self, s: &[f32; 4], xfrac: f32, yfrac: f32) -> f32 {
        let s0 = self.interpolate_h2_f32(s[0], s[1], xfrac);
        let s1 = self.interpolate_h2_f32(s[2], s[3], xfrac);
        self.interpolate_v2_f32(s0, s1, yfrac)
    }

    /// 4x4 form for 32-bit floats, row-major.
    fn interpolate_4x4_f32(&self, s: &[f32; 16], xfrac: f32, yfrac: f32) -> f32 {
        let r: [f32; 4] = std::array::from_fn(|j| {
            let i = 4 * j;
            self.interpolate_h4_f32(s[i], s[i + 1], s[i + 2], s[i + 3], xfrac)
        });
        self.interpolate_v4_f32(r[0], r[1], r[2], r[3], yfrac)
    }

    /// Two-tap horizontal form for 64-bit floats.
    fn interpolate_h2_f64(&self, s0: f64, s1: f64, xfrac: f32) -> f64 {
        self.interpolate_h_f64(&[s0, s1], xfrac)
    }

    /// Four-tap horizontal form for 64-bit floats.
    fn interpolate_h4_f64(&self, s_: f64, s0: f64, s1: f64, s2: f64, xfrac: f32) -> f64 {
        self.interpolate_h_f64(&[s_, s0, s1, s2], xfrac)
    }

    /// Two-tap vertical form for 64-bit floats.
    fn interpolate_v2_f64(&self, s0: f64, s1: f64, yfrac: f32) -> f64 {
        self.interpolate_v_f64(&[s0, s1], yfrac)
    }

    /// Four-tap vertical form for 64-bit floats.
    fn interpolate_v4_f64(&self, s_: f64, s0: f64, s1: f64, s2: f64, yfrac: f32) -> f64 {
        self.interpolate_v_f64(&[s_, s0, s1, s2], yfrac)
    }

    /// 2x2 form for 64-bit floats.
    fn interpolate_2x2_f64(&self, s: &[f64; 4], xfrac: f32, yfrac: f32) -> f64 {
        let s0 = self.interpolate_h2_f64(s[0], s[1], xfrac);
        let s1 = self.interpolate_h2_f64(s[2], s[3], xfrac);
        self.interpolate_v2_f64(s0, s1, yfrac)
    }

    /// 4x4 form for 64-bit floats, row-major.
    fn interpolate_4x4_f64(&self, s: &[f64; 16], xfrac: f32, yfrac: f32) -> f64 {
        let r: [f64; 4] = std::array::from_fn(|j| {
            let i = 4 * j;
            self.interpolate_h4_f64(s[i], s[i + 1], s[i + 2], s[i + 3], xfrac)
        });
        self.interpolate_v4_f64(r[0], r[1], r[2], r[3], yfrac)
    }
}

#[cfg(test)]
mod tests {
    use super::Interpolation;
    use crate::interpolation::InterpolationError;

    // Averages its two taps, ignoring the fraction.
    #[derive(Debug)]
    struct Mean;

    impl Interpolation for Mean {
        fn width(&self) -> usize {
            2
        }
        fn height(&self) -> usize {
            2
        }
        fn left_padding(&self) -> i32 {
            0
        }
        fn right_padding(&self) -> i32 {
            1
        }
        fn top_padding(&self) -> i32 {
            0
        }
        fn bottom_padding(&self) -> i32 {
            1
        }
        fn subsample_bits_h(&self) -> u32 {
            0
        }
        fn subsample_bits_v(&self) -> u32 {
            0
        }
        fn interpolate_h_int(&self, samples: &[i32], _xfrac: i32) -> i32 {
            (samples[0] + samples[1]) / 2
        }
        fn interpolate_h_f32(&self, samples: &[f32], _xfrac: f32) -> f32 {
            (samples[0] + samples[1]) / 2.0
        }
        fn interpolate_h_f64(&self, samples: &[f64], _xfrac: f32) -> f64 {
            (samples[0] + samples[1]) / 2.0
        }
    }

    // A kernel of arbitrary shape that never interpolates anything.
    #[derive(Debug)]
    struct Shape(usize, usize, [i32; 4]);

    impl Interpolation for Shape {
        fn width(&self) -> usize {
            self.0
        }
        fn height(&self) -> usize {
            self.1
        }
        fn left_padding(&self) -> i32 {
            self.2[0]
        }
        fn right_padding(&self) -> i32 {
            self.2[1]
        }
        fn top_padding(&self) -> i32 {
            self.2[2]
        }
        fn bottom_padding(&self) -> i32 {
            self.2[3]
        }
        fn subsample_bits_h(&self) -> u32 {
            0
        }
        fn subsample_bits_v(&self) -> u32 {
            0
        }
        fn interpolate_h_int(&self, _samples: &[i32], _xfrac: i32) -> i32 {
            0
        }
        fn interpolate_h_f32(&self, _samples: &[f32], _xfrac: f32) -> f32 {
            0.0
        }
        fn interpolate_h_f64(&self, _samples: &[f64], _xfrac: f32) -> f64 {
            0.0
        }
    }

    #[test]
    fn kernel_shape_validation() {
        assert_eq!(Mean.validate(), Ok(()));
        assert_eq!(Shape(4, 4, [1, 2, 1, 2]).validate(), Ok(()));
        assert_eq!(
            Shape(0, 2, [0, 0, 0, 1]).validate(),
            Err(InterpolationError::InvalidKernelSize(0, 2))
        );
        assert_eq!(
            Shape(2, 0, [0, 1, 0, 0]).validate(),
            Err(InterpolationError::InvalidKernelSize(2, 0))
        );
        assert!(matches!(
            Shape(2, 2, [0, 0, 0, 1]).validate(),
            Err(InterpolationError::InvalidPadding(2, 2, _))
        ));
        assert!(matches!(
            Shape(3, 1, [-1, 3, 0, 0]).validate(),
            Err(InterpolationError::InvalidPadding(3, 1, _))
        ));
    }

    #[test]
    fn defaults_derive_from_horizontal_pass() {
        let k = Mean;
        assert!(!k.is_identity());
        assert_eq!(k.interpolate_v_int(&[2, 4], 0), 3);
        assert_eq!(k.interpolate_int(&[0, 4, 8, 12], 0, 0), 6);
        assert_eq!(k.interpolate_2x2_int(&[0, 4, 8, 12], 0, 0), 6);
        assert_eq!(k.interpolate_f32(&[0.0, 1.0, 2.0, 3.0], 0.0, 0.0), 1.5);
        assert_eq!(k.interpolate_2x2_f64(&[0.0, 1.0, 2.0, 3.0], 0.0, 0.0), 1.5);
    }
}
