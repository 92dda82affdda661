use std::sync::Arc;

use crate::error::ImageError;

/// Numeric type of the samples stored in a raster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// 1-bit binary samples, stored one per byte.
    Bit,
    /// Unsigned 8-bit samples.
    Byte,
    /// Unsigned 16-bit samples.
    UShort,
    /// Signed 16-bit samples.
    Short,
    /// Signed 32-bit samples.
    Int,
    /// 32-bit floating point samples.
    Float,
    /// 64-bit floating point samples.
    Double,
}

impl SampleType {
    /// Number of significant bits of one sample.
    pub fn bits(&self) -> u32 {
        match self {
            SampleType::Bit => 1,
            SampleType::Byte => 8,
            SampleType::UShort | SampleType::Short => 16,
            SampleType::Int | SampleType::Float => 32,
            SampleType::Double => 64,
        }
    }

    /// Returns true for the integer sample types, which resample in fixed point.
    pub fn is_integral(&self) -> bool {
        !matches!(self, SampleType::Float | SampleType::Double)
    }

    /// Smallest representable sample value.
    pub fn min_value(&self) -> f64 {
        match self {
            SampleType::Bit | SampleType::Byte | SampleType::UShort => 0.0,
            SampleType::Short => i16::MIN as f64,
            SampleType::Int => i32::MIN as f64,
            SampleType::Float => f32::MIN as f64,
            SampleType::Double => f64::MIN,
        }
    }

    /// Largest representable sample value.
    pub fn max_value(&self) -> f64 {
        match self {
            SampleType::Bit => 1.0,
            SampleType::Byte => u8::MAX as f64,
            SampleType::UShort => u16::MAX as f64,
            SampleType::Short => i16::MAX as f64,
            SampleType::Int => i32::MAX as f64,
            SampleType::Float => f32::MAX as f64,
            SampleType::Double => f64::MAX,
        }
    }

    /// Clamps an integer to the range of this type. Floating types are returned unchanged.
    pub fn clamp_i32(&self, v: i32) -> i32 {
        match self {
            SampleType::Bit => v.clamp(0, 1),
            SampleType::Byte => v.clamp(0, u8::MAX as i32),
            SampleType::UShort => v.clamp(0, u16::MAX as i32),
            SampleType::Short => v.clamp(i16::MIN as i32, i16::MAX as i32),
            _ => v,
        }
    }

    /// Narrows a real value to this type: clamped to the representable range, then
    /// rounded to the nearest integer for integer types. `NaN` narrows to zero.
    pub fn narrow(&self, v: f64) -> f64 {
        if v.is_nan() {
            return if self.is_integral() { 0.0 } else { v };
        }
        let v = v.clamp(self.min_value(), self.max_value());
        if self.is_integral() {
            v.round()
        } else {
            v
        }
    }

    // Position in the promotion lattice; `Short` and `UShort` share a level.
    fn rank(&self) -> u8 {
        match self {
            SampleType::Bit => 0,
            SampleType::Byte => 1,
            SampleType::UShort | SampleType::Short => 2,
            SampleType::Int => 3,
            SampleType::Float => 4,
            SampleType::Double => 5,
        }
    }

    /// The smallest type able to hold the values of both types.
    ///
    /// Mixing `UShort` with a signed 16-bit or an 8-bit type promotes to `Int`.
    pub fn merge(self, other: SampleType) -> SampleType {
        use SampleType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (UShort, Short) | (Short, UShort) => Int,
            (UShort, Byte) | (Byte, UShort) => Int,
            (a, b) => {
                if a.rank() >= b.rank() {
                    a
                } else {
                    b
                }
            }
        }
    }
}

/// Band count and sample type of an image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelLayout {
    /// Numeric type of every band.
    pub sample_type: SampleType,
    /// Number of bands per pixel.
    pub num_bands: usize,
}

impl PixelLayout {
    /// Create a new pixel layout.
    ///
    /// # Errors
    ///
    /// If `num_bands` is zero, an error is returned.
    pub fn new(sample_type: SampleType, num_bands: usize) -> Result<Self, ImageError> {
        if num_bands == 0 {
            return Err(ImageError::InvalidBandCount);
        }
        Ok(Self {
            sample_type,
            num_bands,
        })
    }

    /// Merge several layouts into the smallest layout able to represent all of them.
    ///
    /// The sample type is the join of the sample types, the band count is the
    /// largest band count, and binary data is promoted to bytes once the merged
    /// layout has more than one band.
    ///
    /// # Example
    ///
    /// ```
    /// use tessera_image::{PixelLayout, SampleType};
    ///
    /// let a = PixelLayout::new(SampleType::Byte, 1).unwrap();
    /// let b = PixelLayout::new(SampleType::UShort, 1).unwrap();
    ///
    /// let merged = PixelLayout::merge(&[a, b]).unwrap();
    /// assert_eq!(merged.sample_type, SampleType::Int);
    /// ```
    pub fn merge(layouts: &[PixelLayout]) -> Result<PixelLayout, ImageError> {
        let (first, rest) = layouts.split_first().ok_or(ImageError::EmptyLayoutSet)?;
        let mut merged = *first;
        for layout in rest {
            merged.sample_type = merged.sample_type.merge(layout.sample_type);
            merged.num_bands = merged.num_bands.max(layout.num_bands);
        }
        if merged.sample_type == SampleType::Bit && merged.num_bands > 1 {
            merged.sample_type = SampleType::Byte;
        }
        Ok(merged)
    }
}

/// How the bands of a raster are arranged in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arrangement {
    /// All bands of a pixel are stored next to each other.
    Interleaved,
    /// Each band is stored as a separate plane.
    Banded,
}

/// A lookup table of byte colors used by indexed images.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    num_components: usize,
    entries: Vec<u8>,
}

impl Palette {
    /// Create a palette from packed entries of `num_components` bytes each.
    ///
    /// # Errors
    ///
    /// If `num_components` is zero or the entries are not a whole number of colors.
    pub fn new(num_components: usize, entries: Vec<u8>) -> Result<Self, ImageError> {
        if num_components == 0 {
            return Err(ImageError::InvalidBandCount);
        }
        if entries.len() % num_components != 0 {
            return Err(ImageError::InvalidChannelShape(
                entries.len(),
                entries.len() / num_components * num_components,
            ));
        }
        Ok(Self {
            num_components,
            entries,
        })
    }

    /// Number of color components per entry.
    pub fn num_components(&self) -> usize {
        self.num_components
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len() / self.num_components
    }

    /// Returns true if the palette has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The components of entry `index`, if present.
    pub fn entry(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(self.num_components)?;
        self.entries.get(start..start + self.num_components)
    }

    /// A new palette with `f(component, value)` applied to every component.
    pub fn map(&self, f: impl Fn(usize, f64) -> f64) -> Palette {
        let entries = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, &v)| SampleType::Byte.narrow(f(i % self.num_components, v as f64)) as u8)
            .collect();
        Palette {
            num_components: self.num_components,
            entries,
        }
    }
}

/// The structural layout of a raster of a given size.
///
/// Two buffers with compatible sample layouts can be used interchangeably by
/// any computation, which is what in-place reuse of a source tile requires.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleLayout {
    /// Band count and sample type.
    pub pixel: PixelLayout,
    /// Width of the raster in pixels.
    pub width: i32,
    /// Height of the raster in pixels.
    pub height: i32,
    /// Memory arrangement of the bands.
    pub arrangement: Arrangement,
    /// Position of each band within a pixel (interleaved) or plane order (banded).
    pub band_offsets: Vec<usize>,
    /// Color table of indexed images.
    pub palette: Option<Arc<Palette>>,
}

impl SampleLayout {
    /// Create an interleaved layout with bands in natural order.
    ///
    /// # Errors
    ///
    /// If a dimension is not positive or the sample count overflows.
    pub fn new(pixel: PixelLayout, width: i32, height: i32) -> Result<Self, ImageError> {
        let layout = Self {
            pixel,
            width,
            height,
            arrangement: Arrangement::Interleaved,
            band_offsets: (0..pixel.num_bands).collect(),
            palette: None,
        };
        layout.num_samples()?;
        Ok(layout)
    }

    /// Create a banded layout with planes in natural order.
    pub fn banded(pixel: PixelLayout, width: i32, height: i32) -> Result<Self, ImageError> {
        let mut layout = Self::new(pixel, width, height)?;
        layout.arrangement = Arrangement::Banded;
        Ok(layout)
    }

    /// Replace the band offsets, which must be a permutation of the bands.
    pub fn with_band_offsets(mut self, band_offsets: Vec<usize>) -> Result<Self, ImageError> {
        let n = self.pixel.num_bands;
        let mut seen = vec![false; n];
        let is_permutation = band_offsets.len() == n
            && band_offsets.iter().all(|&offset| match seen.get_mut(offset) {
                Some(slot) if !*slot => {
                    *slot = true;
                    true
                }
                _ => false,
            });
        if !is_permutation {
            return Err(ImageError::InvalidBandOffsets(band_offsets, n));
        }
        self.band_offsets = band_offsets;
        Ok(self)
    }

    /// Attach a color table.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = Some(Arc::new(palette));
        self
    }

    /// The same layout for a raster of another size.
    pub fn with_size(&self, width: i32, height: i32) -> Result<Self, ImageError> {
        let layout = Self {
            width,
            height,
            ..self.clone()
        };
        layout.num_samples()?;
        Ok(layout)
    }

    /// Total number of samples of a raster with this layout.
    ///
    /// # Errors
    ///
    /// If a dimension is not positive, or if the sample count does not fit the
    /// `i32` index range of a raster.
    pub fn num_samples(&self) -> Result<usize, ImageError> {
        if self.width <= 0 || self.height <= 0 {
            return Err(ImageError::InvalidImageSize(self.width, self.height));
        }
        let overflow = || ImageError::LatticeOverflow {
            width: self.width as i64,
            height: self.height as i64,
            bands: self.pixel.num_bands,
        };
        let count = (self.width as i64)
            .checked_mul(self.height as i64)
            .and_then(|v| v.checked_mul(self.pixel.num_bands as i64))
            .ok_or_else(overflow)?;
        if count > i32::MAX as i64 {
            return Err(overflow());
        }
        Ok(count as usize)
    }

    /// Linear index of a sample given its column and row relative to the raster origin.
    #[inline]
    pub fn index(&self, col: usize, row: usize, band: usize) -> usize {
        let w = self.width as usize;
        match self.arrangement {
            Arrangement::Interleaved => {
                (row * w + col) * self.pixel.num_bands + self.band_offsets[band]
            }
            Arrangement::Banded => self.band_offsets[band] * w * self.height as usize + row * w + col,
        }
    }

    /// Returns true if a buffer of this layout may stand in for a buffer of `other`.
    ///
    /// Sample type, dimensions, band count, arrangement and band offsets must all
    /// agree. The palette is not part of the memory layout and is ignored.
    pub fn is_compatible(&self, other: &SampleLayout) -> bool {
        self.pixel == other.pixel
            && self.width == other.width
            && self.height == other.height
            && self.arrangement == other.arrangement
            && self.band_offsets == other.band_offsets
    }
}
