use super::Interpolation;

/// Nearest neighbor resampling: the key sample is returned unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterpolationNearest;

impl InterpolationNearest {
    /// Create a new nearest neighbor kernel.
    pub fn new() -> Self {
        Self
    }
}

impl Interpolation for InterpolationNearest {
    fn width(&self) -> usize {
        1
    }

    fn height(&self) -> usize {
        1
    }

    fn left_padding(&self) -> i32 {
        0
    }

    fn right_padding(&self) -> i32 {
        0
    }

    fn top_padding(&self) -> i32 {
        0
    }

    fn bottom_padding(&self) -> i32 {
        0
    }

    fn subsample_bits_h(&self) -> u32 {
        0
    }

    fn subsample_bits_v(&self) -> u32 {
        0
    }

    #[inline]
    fn interpolate_h_int(&self, samples: &[i32], _xfrac: i32) -> i32 {
        samples[0]
    }

    #[inline]
    fn interpolate_h_f32(&self, samples: &[f32], _xfrac: f32) -> f32 {
        samples[0]
    }

    #[inline]
    fn interpolate_h_f64(&self, samples: &[f64], _xfrac: f32) -> f64 {
        samples[0]
    }

    #[inline]
    fn interpolate_int(&self, samples: &[i32], _xfrac: i32, _yfrac: i32) -> i32 {
        samples[0]
    }

    #[inline]
    fn interpolate_f32(&self, samples: &[f32], _xfrac: f32, _yfrac: f32) -> f32 {
        samples[0]
    }

    #[inline]
    fn interpolate_f64(&self, samples: &[f64], _xfrac: f32, _yfrac: f32) -> f64 {
        samples[0]
    }
}
