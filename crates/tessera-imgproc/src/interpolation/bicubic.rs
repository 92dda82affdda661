use super::{InterpolationError, InterpolationTable};

const BICUBIC_PRECISION_BITS: u32 = 8;

/// Keys' cubic convolution kernel with free parameter `a`.
fn keys(x: f64, a: f64) -> f64 {
    let x = x.abs();
    if x <= 1.0 {
        (a + 2.0) * x * x * x - (a + 3.0) * x * x + 1.0
    } else if x < 2.0 {
        a * x * x * x - 5.0 * a * x * x + 8.0 * a * x - 4.0 * a
    } else {
        0.0
    }
}

fn cubic_taps(a: f64, subsample_bits: u32) -> Vec<f64> {
    let n = 1usize << subsample_bits;
    (0..n)
        .flat_map(|i| {
            let t = i as f64 / n as f64;
            [keys(1.0 + t, a), keys(t, a), keys(1.0 - t, a), keys(2.0 - t, a)]
        })
        .collect()
}

impl InterpolationTable {
    /// Cubic convolution over a 4x4 neighborhood with `a = -0.5`.
    ///
    /// The key sample is the second tap, so one sample is needed before it and
    /// two after it in each direction. Integer coefficients use 8 bits of
    /// precision and sum to one in every phase.
    ///
    /// # Errors
    ///
    /// If `subsample_bits` exceeds 16.
    pub fn bicubic(subsample_bits: u32) -> Result<Self, InterpolationError> {
        Self::cubic(-0.5, subsample_bits)
    }

    /// Cubic convolution over a 4x4 neighborhood with `a = -1.0`, which sharpens
    /// more than [`InterpolationTable::bicubic`].
    pub fn bicubic2(subsample_bits: u32) -> Result<Self, InterpolationError> {
        Self::cubic(-1.0, subsample_bits)
    }

    /// Cubic convolution with an arbitrary parameter `a`.
    pub fn cubic(a: f64, subsample_bits: u32) -> Result<Self, InterpolationError> {
        let data = cubic_taps(a, subsample_bits);
        let mut table = Self::new(1, 4, subsample_bits, BICUBIC_PRECISION_BITS, &data)?;
        table.normalize_integer_taps();
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use crate::interpolation::{Interpolation, InterpolationError, InterpolationTable};

    #[test]
    fn bicubic_geometry() -> Result<(), InterpolationError> {
        let k = InterpolationTable::bicubic(8)?;
        assert_eq!((k.width(), k.height()), (4, 4));
        assert_eq!(k.left_padding(), 1);
        assert_eq!(k.right_padding(), 2);
        assert_eq!(k.top_padding(), 1);
        assert_eq!(k.bottom_padding(), 2);
        assert_eq!(k.precision_bits(), 8);
        Ok(())
    }

    #[test]
    fn bicubic_preserves_flat_fields() -> Result<(), InterpolationError> {
        for k in [InterpolationTable::bicubic(8)?, InterpolationTable::bicubic2(8)?] {
            for phase in k.horizontal_table().chunks_exact(4) {
                assert_eq!(phase.iter().sum::<i32>(), 256);
            }
            for frac in [0, 17, 128, 255] {
                assert_eq!(k.interpolate_h_int(&[90, 90, 90, 90], frac), 90);
                assert_eq!(k.interpolate_4x4_int(&[200; 16], frac, 255 - frac), 200);
            }
        }
        Ok(())
    }

    #[test]
    fn bicubic_interpolates_at_key() -> Result<(), InterpolationError> {
        let k = InterpolationTable::bicubic(8)?;
        assert_eq!(k.interpolate_h_int(&[10, 20, 30, 40], 0), 20);
        approx::assert_relative_eq!(k.interpolate_h_f64(&[10.0, 20.0, 30.0, 40.0], 0.5), 25.0);
        // Both variants ring next to an impulse; a = -1 rings harder.
        let sharp = InterpolationTable::bicubic2(8)?;
        let soft = k.interpolate_h_f32(&[100.0, 0.0, 0.0, 0.0], 0.25);
        let hard = sharp.interpolate_h_f32(&[100.0, 0.0, 0.0, 0.0], 0.25);
        assert!(soft < 0.0);
        assert!(hard < soft);
        Ok(())
    }
}
