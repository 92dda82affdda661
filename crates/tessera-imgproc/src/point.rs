use std::fmt::Debug;
use std::sync::Arc;

use tessera_image::{Palette, SampleType};

/// A per-pixel computation over one or more aligned sources.
///
/// Destination sample `band` of a pixel is `apply(band, inputs)`, where `inputs`
/// holds the same sample of every source at the same position. The result is
/// clamped and rounded to the destination sample type by the operator.
pub trait PointKernel: Send + Sync + Debug {
    /// Number of sources the kernel combines, or `None` for any number.
    fn arity(&self) -> Option<usize> {
        Some(1)
    }

    /// Computes one destination sample.
    fn apply(&self, band: usize, inputs: &[f64]) -> f64;

    /// Returns true if the destination may overwrite the first source's samples
    /// while they are being read. Holds for kernels reading every input sample
    /// exactly once before writing the output sample at the same position.
    fn supports_in_place(&self) -> bool {
        false
    }

    /// Returns true if the kernel only transforms a color lookup, so that for an
    /// indexed source it applies to the palette and leaves the indices untouched.
    fn is_colormap(&self) -> bool {
        false
    }

    /// Palette of the destination of an indexed source.
    fn transform_palette(&self, palette: &Palette) -> Palette {
        palette.map(|component, v| self.apply(component, &[v]))
    }
}

fn per_band(values: &[f64], band: usize, default: f64) -> f64 {
    values
        .get(band)
        .or_else(|| values.first())
        .copied()
        .unwrap_or(default)
}

/// `v * scale + offset` with per-band constants.
///
/// Constant arrays shorter than the band count are broadcast from their first element.
#[derive(Debug, Clone, PartialEq)]
pub struct Rescale {
    scale: Vec<f64>,
    offset: Vec<f64>,
}

impl Rescale {
    /// Create a rescale with per-band factors and offsets.
    pub fn new(scale: Vec<f64>, offset: Vec<f64>) -> Self {
        Self { scale, offset }
    }
}

impl PointKernel for Rescale {
    fn apply(&self, band: usize, inputs: &[f64]) -> f64 {
        inputs[0] * per_band(&self.scale, band, 1.0) + per_band(&self.offset, band, 0.0)
    }

    fn supports_in_place(&self) -> bool {
        true
    }
}

/// Sum of every source.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Add;

impl PointKernel for Add {
    fn arity(&self) -> Option<usize> {
        None
    }

    fn apply(&self, _band: usize, inputs: &[f64]) -> f64 {
        inputs.iter().sum()
    }

    fn supports_in_place(&self) -> bool {
        true
    }
}

/// Negative of the source: `max - v` for integer samples, `-v` for floating point ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Invert {
    max: f64,
}

impl Invert {
    /// Create an inversion for samples of `sample_type`.
    pub fn new(sample_type: SampleType) -> Self {
        let max = if sample_type.is_integral() {
            sample_type.max_value()
        } else {
            0.0
        };
        Self { max }
    }
}

impl PointKernel for Invert {
    fn apply(&self, _band: usize, inputs: &[f64]) -> f64 {
        self.max - inputs[0]
    }

    fn supports_in_place(&self) -> bool {
        true
    }
}

/// Applies a unary kernel to the palette of an indexed source.
///
/// For sources without a palette the inner kernel is applied to the samples.
#[derive(Debug, Clone)]
pub struct Colormap {
    inner: Arc<dyn PointKernel>,
}

impl Colormap {
    /// Wrap a unary kernel.
    pub fn new(inner: Arc<dyn PointKernel>) -> Self {
        Self { inner }
    }
}

impl PointKernel for Colormap {
    fn apply(&self, band: usize, inputs: &[f64]) -> f64 {
        self.inner.apply(band, inputs)
    }

    fn supports_in_place(&self) -> bool {
        self.inner.supports_in_place()
    }

    fn is_colormap(&self) -> bool {
        true
    }

    fn transform_palette(&self, palette: &Palette) -> Palette {
        self.inner.transform_palette(palette)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Add, Colormap, Invert, PointKernel, Rescale};
    use tessera_image::{ImageError, Palette, SampleType};

    #[test]
    fn rescale_broadcasts_constants() {
        let k = Rescale::new(vec![2.0], vec![1.0, -1.0]);
        assert_eq!(k.apply(0, &[3.0]), 7.0);
        assert_eq!(k.apply(1, &[3.0]), 5.0);
        assert_eq!(k.apply(2, &[3.0]), 7.0);
        assert_eq!(Rescale::new(vec![], vec![]).apply(0, &[4.0]), 4.0);
    }

    #[test]
    fn add_and_invert() {
        assert_eq!(Add.apply(0, &[1.0, 2.0, 3.5]), 6.5);
        assert_eq!(Add.arity(), None);
        assert_eq!(Invert::new(SampleType::Byte).apply(0, &[5.0]), 250.0);
        assert_eq!(Invert::new(SampleType::Short).apply(0, &[0.0]), 32767.0);
        assert_eq!(Invert::new(SampleType::Float).apply(0, &[1.5]), -1.5);
    }

    #[test]
    fn colormap_transforms_palette() -> Result<(), ImageError> {
        let palette = Palette::new(3, vec![0, 10, 20, 100, 200, 250])?;
        let k = Colormap::new(Arc::new(Invert::new(SampleType::Byte)));
        assert!(k.is_colormap());
        let inverted = k.transform_palette(&palette);
        assert_eq!(inverted.entry(0), Some(&[255, 245, 235][..]));
        assert_eq!(inverted.entry(1), Some(&[155, 55, 5][..]));
        assert!(!Rescale::new(vec![1.0], vec![0.0]).is_colormap());
        Ok(())
    }
}
