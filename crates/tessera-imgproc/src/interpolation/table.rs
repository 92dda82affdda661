use super::{Interpolation, InterpolationError, MAX_PRECISION_BITS, MAX_SUBSAMPLE_BITS};

/// Coefficients of one direction of a table kernel, in the three sample domains.
#[derive(Clone, Debug, PartialEq)]
struct Taps {
    len: usize,
    subsample_bits: u32,
    ints: Vec<i32>,
    floats: Vec<f32>,
    doubles: Vec<f64>,
}

impl Taps {
    fn new(
        len: usize,
        subsample_bits: u32,
        precision_bits: u32,
        data: &[f64],
    ) -> Result<Self, InterpolationError> {
        if subsample_bits > MAX_SUBSAMPLE_BITS {
            return Err(InterpolationError::InvalidSubsampleBits(subsample_bits));
        }
        let expected = len << subsample_bits;
        if data.len() != expected {
            return Err(InterpolationError::InvalidTableLength {
                expected,
                actual: data.len(),
            });
        }
        let scale = (1i64 << precision_bits) as f64;
        Ok(Self {
            len,
            subsample_bits,
            ints: data.iter().map(|d| (d * scale).round() as i32).collect(),
            floats: data.iter().map(|&d| d as f32).collect(),
            doubles: data.to_vec(),
        })
    }

    #[inline]
    fn float_offset(&self, frac: f32) -> usize {
        debug_assert!((0.0..1.0).contains(&frac));
        let ifrac = (frac * (1u32 << self.subsample_bits) as f32) as usize;
        self.len * ifrac
    }

    // Makes every fixed-point phase sum to exactly `one` by adjusting its largest tap.
    fn normalize(&mut self, one: i32) {
        for phase in self.ints.chunks_exact_mut(self.len) {
            let sum: i32 = phase.iter().sum();
            if let Some(largest) = phase.iter_mut().max_by_key(|t| t.abs()) {
                *largest += one - sum;
            }
        }
    }
}

/// A separable kernel defined by tabulated coefficients.
///
/// For each of the `2^subsample_bits` fractional phases the table holds one
/// coefficient per tap. The key sample sits at index `key` of the taps, so the
/// left padding is `key` and the right padding is `width - key - 1`. Integer
/// data is filtered with coefficients scaled by `2^precision_bits` and the sum is
/// rounded back.
///
/// # Example
///
/// ```
/// use tessera_imgproc::interpolation::{Interpolation, InterpolationTable};
///
/// // A 2-tap linear kernel with a single bit of fraction.
/// let table = InterpolationTable::new(0, 2, 1, 8, &[1.0, 0.0, 0.5, 0.5]).unwrap();
///
/// assert_eq!(table.interpolate_h_int(&[10, 20], 1), 15);
/// assert_eq!(table.interpolate_h_f32(&[10.0, 20.0], 0.75), 15.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct InterpolationTable {
    key_x: i32,
    key_y: i32,
    precision_bits: u32,
    round: i64,
    h: Taps,
    v: Taps,
}

impl InterpolationTable {
    /// Create a kernel using the same table in both directions.
    ///
    /// # Arguments
    ///
    /// * `key` - Index of the key tap.
    /// * `width` - Number of taps.
    /// * `subsample_bits` - Number of fraction bits; the table has `width << subsample_bits` entries.
    /// * `precision_bits` - Fixed-point precision of the integer coefficients.
    /// * `data` - Coefficients, one row of `width` taps per phase.
    pub fn new(
        key: i32,
        width: usize,
        subsample_bits: u32,
        precision_bits: u32,
        data: &[f64],
    ) -> Result<Self, InterpolationError> {
        Self::separable(
            key,
            key,
            width,
            width,
            subsample_bits,
            subsample_bits,
            precision_bits,
            data,
            None,
        )
    }

    /// Create a kernel with independent horizontal and vertical tables.
    ///
    /// When `data_v` is `None` the horizontal table, width and precision are
    /// used vertically too and `height`/`subsample_bits_v` are ignored.
    ///
    /// # Errors
    ///
    /// If a dimension is zero, a key is outside its taps, a precision is too
    /// large or a table has the wrong length.
    #[allow(clippy::too_many_arguments)]
    pub fn separable(
        key_x: i32,
        key_y: i32,
        width: usize,
        height: usize,
        subsample_bits_h: u32,
        subsample_bits_v: u32,
        precision_bits: u32,
        data_h: &[f64],
        data_v: Option<&[f64]>,
    ) -> Result<Self, InterpolationError> {
        if precision_bits > MAX_PRECISION_BITS {
            return Err(InterpolationError::InvalidPrecisionBits(precision_bits));
        }
        let height = if data_v.is_some() { height } else { width };
        if width == 0 || height == 0 {
            return Err(InterpolationError::InvalidKernelSize(width, height));
        }
        if key_x < 0 || key_x as usize >= width {
            return Err(InterpolationError::InvalidKey(key_x, width));
        }
        if key_y < 0 || key_y as usize >= height {
            return Err(InterpolationError::InvalidKey(key_y, height));
        }
        let h = Taps::new(width, subsample_bits_h, precision_bits, data_h)?;
        let v = match data_v {
            Some(data) => Taps::new(height, subsample_bits_v, precision_bits, data)?,
            None => h.clone(),
        };
        Ok(Self {
            key_x,
            key_y,
            precision_bits,
            round: if precision_bits > 0 {
                1 << (precision_bits - 1)
            } else {
                0
            },
            h,
            v,
        })
    }

    /// Fixed-point precision of the integer coefficients.
    pub fn precision_bits(&self) -> u32 {
        self.precision_bits
    }

    /// Integer horizontal coefficients.
    pub fn horizontal_table(&self) -> &[i32] {
        &self.h.ints
    }

    /// Integer vertical coefficients.
    pub fn vertical_table(&self) -> &[i32] {
        &self.v.ints
    }

    /// Floating horizontal coefficients.
    pub fn horizontal_table_f64(&self) -> &[f64] {
        &self.h.doubles
    }

    /// Floating vertical coefficients.
    pub fn vertical_table_f64(&self) -> &[f64] {
        &self.v.doubles
    }

    /// Adjusts the integer tables so that every phase preserves flat fields exactly.
    pub(crate) fn normalize_integer_taps(&mut self) {
        let one = 1i32 << self.precision_bits;
        self.h.normalize(one);
        self.v.normalize(one);
    }

    #[inline]
    fn sum_int(&self, taps: &Taps, samples: &[i32], frac: i32) -> i32 {
        debug_assert!(frac >= 0 && (frac as usize) < (1usize << taps.subsample_bits));
        let offset = taps.len * frac as usize;
        let sum: i64 = taps.ints[offset..offset + taps.len]
            .iter()
            .zip(samples)
            .map(|(&c, &s)| c as i64 * s as i64)
            .sum();
        ((sum + self.round) >> self.precision_bits) as i32
    }
}

impl Interpolation for InterpolationTable {
    fn width(&self) -> usize {
        self.h.len
    }

    fn height(&self) -> usize {
        self.v.len
    }

    fn left_padding(&self) -> i32 {
        self.key_x
    }

    fn right_padding(&self) -> i32 {
        self.h.len as i32 - self.key_x - 1
    }

    fn top_padding(&self) -> i32 {
        self.key_y
    }

    fn bottom_padding(&self) -> i32 {
        self.v.len as i32 - self.key_y - 1
    }

    fn subsample_bits_h(&self) -> u32 {
        self.h.subsample_bits
    }

    fn subsample_bits_v(&self) -> u32 {
        self.v.subsample_bits
    }

    #[inline]
    fn interpolate_h_int(&self, samples: &[i32], xfrac: i32) -> i32 {
        self.sum_int(&self.h, samples, xfrac)
    }

    #[inline]
    fn interpolate_v_int(&self, samples: &[i32], yfrac: i32) -> i32 {
        self.sum_int(&self.v, samples, yfrac)
    }

    #[inline]
    fn interpolate_h_f32(&self, samples: &[f32], xfrac: f32) -> f32 {
        let offset = self.h.float_offset(xfrac);
        self.h.floats[offset..offset + self.h.len]
            .iter()
            .zip(samples)
            .map(|(c, s)| c * s)
            .sum()
    }

    #[inline]
    fn interpolate_v_f32(&self, samples: &[f32], yfrac: f32) -> f32 {
        let offset = self.v.float_offset(yfrac);
        self.v.floats[offset..offset + self.v.len]
            .iter()
            .zip(samples)
            .map(|(c, s)| c * s)
            .sum()
    }

    #[inline]
    fn interpolate_h_f64(&self, samples: &[f64], xfrac: f32) -> f64 {
        let offset = self.h.float_offset(xfrac);
        self.h.doubles[offset..offset + self.h.len]
            .iter()
            .zip(samples)
            .map(|(c, s)| c * s)
            .sum()
    }

    #[inline]
    fn interpolate_v_f64(&self, samples: &[f64], yfrac: f32) -> f64 {
        let offset = self.v.float_offset(yfrac);
        self.v.doubles[offset..offset + self.v.len]
            .iter()
            .zip(samples)
            .map(|(c, s)| c * s)
            .sum()
    }
}
