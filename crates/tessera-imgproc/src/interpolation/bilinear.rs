use super::{Interpolation, InterpolationError, MAX_SUBSAMPLE_BITS};

/// Bilinear resampling over a 2x2 neighborhood.
///
/// Integer data is resampled in fixed point with `subsample_bits` of fraction.
/// The 2-D integer form keeps full precision between the two passes and rounds
/// once at the end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterpolationBilinear {
    subsample_bits: u32,
    one: i64,
    round: i64,
    round2: i64,
}

impl Default for InterpolationBilinear {
    fn default() -> Self {
        Self::with_bits(8)
    }
}

impl InterpolationBilinear {
    /// Create a bilinear kernel with the given fixed-point precision.
    ///
    /// # Errors
    ///
    /// If `subsample_bits` exceeds 16.
    pub fn new(subsample_bits: u32) -> Result<Self, InterpolationError> {
        if subsample_bits > MAX_SUBSAMPLE_BITS {
            return Err(InterpolationError::InvalidSubsampleBits(subsample_bits));
        }
        Ok(Self::with_bits(subsample_bits))
    }

    fn with_bits(subsample_bits: u32) -> Self {
        let round = if subsample_bits > 0 {
            1 << (subsample_bits - 1)
        } else {
            0
        };
        let round2 = if subsample_bits > 0 {
            1 << (2 * subsample_bits - 1)
        } else {
            0
        };
        Self {
            subsample_bits,
            one: 1 << subsample_bits,
            round,
            round2,
        }
    }

    #[inline]
    fn lerp_int(&self, s0: i64, s1: i64, frac: i32) -> i64 {
        ((s1 - s0) * frac as i64 + (s0 << self.subsample_bits) + self.round) >> self.subsample_bits
    }
}

impl Interpolation for InterpolationBilinear {
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
        self.subsample_bits
    }

    fn subsample_bits_v(&self) -> u32 {
        self.subsample_bits
    }

    #[inline]
    fn interpolate_h_int(&self, samples: &[i32], xfrac: i32) -> i32 {
        self.interpolate_h2_int(samples[0], samples[1], xfrac)
    }

    #[inline]
    fn interpolate_h_f32(&self, samples: &[f32], xfrac: f32) -> f32 {
        self.interpolate_h2_f32(samples[0], samples[1], xfrac)
    }

    #[inline]
    fn interpolate_h_f64(&self, samples: &[f64], xfrac: f32) -> f64 {
        self.interpolate_h2_f64(samples[0], samples[1], xfrac)
    }

    #[inline]
    fn interpolate_int(&self, samples: &[i32], xfrac: i32, yfrac: i32) -> i32 {
        self.interpolate_2x2_int(&[samples[0], samples[1], samples[2], samples[3]], xfrac, yfrac)
    }

    #[inline]
    fn interpolate_f32(&self, samples: &[f32], xfrac: f32, yfrac: f32) -> f32 {
        self.interpolate_2x2_f32(&[samples[0], samples[1], samples[2], samples[3]], xfrac, yfrac)
    }

    #[inline]
    fn interpolate_f64(&self, samples: &[f64], xfrac: f32, yfrac: f32) -> f64 {
        self.interpolate_2x2_f64(&[samples[0], samples[1], samples[2], samples[3]], xfrac, yfrac)
    }

    #[inline]
    fn interpolate_h2_int(&self, s0: i32, s1: i32, xfrac: i32) -> i32 {
        debug_assert!((0..self.one).contains(&(xfrac as i64)));
        self.lerp_int(s0 as i64, s1 as i64, xfrac) as i32
    }

    #[inline]
    fn interpolate_2x2_int(&self, s: &[i32; 4], xfrac: i32, yfrac: i32) -> i32 {
        let bits = self.subsample_bits;
        let xf = xfrac as i64;
        let s0 = (s[1] as i64 - s[0] as i64) * xf + ((s[0] as i64) << bits);
        let s1 = (s[3] as i64 - s[2] as i64) * xf + ((s[2] as i64) << bits);
        (((s1 - s0) * yfrac as i64 + (s0 << bits) + self.round2) >> (2 * bits)) as i32
    }

    #[inline]
    fn interpolate_h2_f32(&self, s0: f32, s1: f32, xfrac: f32) -> f32 {
        (s1 - s0) * xfrac + s0
    }

    #[inline]
    fn interpolate_2x2_f32(&self, s: &[f32; 4], xfrac: f32, yfrac: f32) -> f32 {
        let s0 = (s[1] - s[0]) * xfrac + s[0];
        let s1 = (s[3] - s[2]) * xfrac + s[2];
        (s1 - s0) * yfrac + s0
    }

    #[inline]
    fn interpolate_h2_f64(&self, s0: f64, s1: f64, xfrac: f32) -> f64 {
        (s1 - s0) * xfrac as f64 + s0
    }

    #[inline]
    fn interpolate_2x2_f64(&self, s: &[f64; 4], xfrac: f32, yfrac: f32) -> f64 {
        let (xf, yf) = (xfrac as f64, yfrac as f64);
        let s0 = (s[1] - s[0]) * xf + s[0];
        let s1 = (s[3] - s[2]) * xf + s[2];
        (s1 - s0) * yf + s0
    }
}
