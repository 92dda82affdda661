//! Per-rectangle compute primitives of warp and point operators.

use tessera_image::{Palette, PixelBuffer, Rect, SampleData, SampleType};

use crate::interpolation::Interpolation;
use crate::point::PointKernel;
use crate::warp::Warp;

// The arithmetic domain a kernel runs in for a destination sample type.
trait Domain: Copy + Default {
    type Frac: Copy;

    fn frac(f: f32, bits: u32) -> Self::Frac;
    fn read(data: &SampleData, i: usize) -> Self;
    fn from_byte(v: u8) -> Self;
    fn write(data: &mut SampleData, i: usize, v: Self, sample_type: SampleType);
    fn interpolate(k: &dyn Interpolation, s: &[Self], xfrac: Self::Frac, yfrac: Self::Frac) -> Self;
    fn interpolate_2x2(k: &dyn Interpolation, s: &[Self; 4], xfrac: Self::Frac, yfrac: Self::Frac) -> Self;
    fn interpolate_4x4(k: &dyn Interpolation, s: &[Self; 16], xfrac: Self::Frac, yfrac: Self::Frac) -> Self;
}

impl Domain for i32 {
    type Frac = i32;

    #[inline]
    fn frac(f: f32, bits: u32) -> i32 {
        (f * (1u32 << bits) as f32) as i32
    }
    #[inline]
    fn read(data: &SampleData, i: usize) -> i32 {
        data.get_i32(i)
    }
    #[inline]
    fn from_byte(v: u8) -> i32 {
        v as i32
    }
    #[inline]
    fn write(data: &mut SampleData, i: usize, v: i32, sample_type: SampleType) {
        data.set_i32(i, sample_type.clamp_i32(v));
    }
    #[inline]
    fn interpolate(k: &dyn Interpolation, s: &[i32], xfrac: i32, yfrac: i32) -> i32 {
        k.interpolate_int(s, xfrac, yfrac)
    }
    #[inline]
    fn interpolate_2x2(k: &dyn Interpolation, s: &[i32; 4], xfrac: i32, yfrac: i32) -> i32 {
        k.interpolate_2x2_int(s, xfrac, yfrac)
    }
    #[inline]
    fn interpolate_4x4(k: &dyn Interpolation, s: &[i32; 16], xfrac: i32, yfrac: i32) -> i32 {
        k.interpolate_4x4_int(s, xfrac, yfrac)
    }
}

impl Domain for f32 {
    type Frac = f32;

    #[inline]
    fn frac(f: f32, _bits: u32) -> f32 {
        f
    }
    #[inline]
    fn read(data: &SampleData, i: usize) -> f32 {
        data.get_f32(i)
    }
    #[inline]
    fn from_byte(v: u8) -> f32 {
        v as f32
    }
    #[inline]
    fn write(data: &mut SampleData, i: usize, v: f32, _sample_type: SampleType) {
        data.set_f32(i, v);
    }
    #[inline]
    fn interpolate(k: &dyn Interpolation, s: &[f32], xfrac: f32, yfrac: f32) -> f32 {
        k.interpolate_f32(s, xfrac, yfrac)
    }
    #[inline]
    fn interpolate_2x2(k: &dyn Interpolation, s: &[f32; 4], xfrac: f32, yfrac: f32) -> f32 {
        k.interpolate_2x2_f32(s, xfrac, yfrac)
    }
    #[inline]
    fn interpolate_4x4(k: &dyn Interpolation, s: &[f32; 16], xfrac: f32, yfrac: f32) -> f32 {
        k.interpolate_4x4_f32(s, xfrac, yfrac)
    }
}

impl Domain for f64 {
    type Frac = f32;

    #[inline]
    fn frac(f: f32, _bits: u32) -> f32 {
        f
    }
    #[inline]
    fn read(data: &SampleData, i: usize) -> f64 {
        data.get_f64(i)
    }
    #[inline]
    fn from_byte(v: u8) -> f64 {
        v as f64
    }
    #[inline]
    fn write(data: &mut SampleData, i: usize, v: f64, _sample_type: SampleType) {
        data.set_f64(i, v);
    }
    #[inline]
    fn interpolate(k: &dyn Interpolation, s: &[f64], xfrac: f32, yfrac: f32) -> f64 {
        k.interpolate_f64(s, xfrac, yfrac)
    }
    #[inline]
    fn interpolate_2x2(k: &dyn Interpolation, s: &[f64; 4], xfrac: f32, yfrac: f32) -> f64 {
        k.interpolate_2x2_f64(s, xfrac, yfrac)
    }
    #[inline]
    fn interpolate_4x4(k: &dyn Interpolation, s: &[f64; 16], xfrac: f32, yfrac: f32) -> f64 {
        k.interpolate_4x4_f64(s, xfrac, yfrac)
    }
}

/// Inputs of the warp resampling of one destination rectangle.
pub(crate) struct WarpSampler<'a> {
    pub warp: &'a dyn Warp,
    pub interp: &'a dyn Interpolation,
    /// Source samples around the mapped rectangle.
    pub src: &'a PixelBuffer,
    /// Key positions whose whole neighborhood can be read.
    pub valid: Rect,
    /// Color table to expand the indices of an indexed source through.
    pub palette: Option<&'a Palette>,
}

impl WarpSampler<'_> {
    #[inline]
    fn sample<T: Domain>(&self, x: i32, y: i32, band: usize) -> T {
        match self.palette {
            Some(palette) => {
                let index = self.src.data().get_i32(self.src.index(x, y, 0));
                let value = usize::try_from(index)
                    .ok()
                    .and_then(|i| palette.entry(i))
                    .and_then(|entry| entry.get(band))
                    .copied()
                    .unwrap_or(0);
                T::from_byte(value)
            }
            None => {
                let band = band.min(self.src.num_bands() - 1);
                T::read(self.src.data(), self.src.index(x, y, band))
            }
        }
    }

    /// Resamples the pixels of `rect` into `dest`.
    ///
    /// Pixels mapping outside the valid key range are left untouched, so `dest`
    /// is expected to hold the background already.
    pub fn resample(&self, dest: &mut PixelBuffer, rect: &Rect) -> usize {
        match dest.sample_type() {
            SampleType::Float => self.resample_typed::<f32>(dest, rect),
            SampleType::Double => self.resample_typed::<f64>(dest, rect),
            _ => self.resample_typed::<i32>(dest, rect),
        }
    }

    fn resample_typed<T: Domain>(&self, dest: &mut PixelBuffer, rect: &Rect) -> usize {
        let interp = self.interp;
        let (kw, kh) = (interp.width(), interp.height());
        let pad = interp.padding();
        let (bits_h, bits_v) = (interp.subsample_bits_h(), interp.subsample_bits_v());
        let identity = interp.is_identity();
        let sample_type = dest.sample_type();
        let bands = dest.num_bands();
        let valid = self.valid;

        let mut coords = Vec::with_capacity(2 * rect.width.max(0) as usize);
        let mut samples = vec![T::default(); kw * kh];
        let mut written = 0;

        for y in rect.y..rect.max_y() as i32 {
            self.warp
                .map_sparse(&Rect::new(rect.x, y, rect.width, 1), 1, 1, &mut coords);
            for (x, p) in (rect.x..).zip(coords.chunks_exact(2)) {
                let (sx, sy) = (p[0], p[1]);
                if !sx.is_finite() || !sy.is_finite() {
                    continue;
                }
                let (fx, fy) = (sx.floor(), sy.floor());
                let (xint, yint) = (fx as i64, fy as i64);
                if xint < valid.x as i64
                    || xint >= valid.max_x()
                    || yint < valid.y as i64
                    || yint >= valid.max_y()
                {
                    continue;
                }
                let xfrac = T::frac(sx - fx, bits_h);
                let yfrac = T::frac(sy - fy, bits_v);
                let x0 = xint as i32 - pad.left;
                let y0 = yint as i32 - pad.top;

                for b in 0..bands {
                    let read = |i: usize, j: usize| -> T {
                        self.sample(x0 + i as i32, y0 + j as i32, b)
                    };
                    let v = if identity {
                        read(0, 0)
                    } else {
                        match (kw, kh) {
                            (2, 2) => T::interpolate_2x2(
                                interp,
                                &[read(0, 0), read(1, 0), read(0, 1), read(1, 1)],
                                xfrac,
                                yfrac,
                            ),
                            (4, 4) => {
                                let mut s = [T::default(); 16];
                                for (k, v) in s.iter_mut().enumerate() {
                                    *v = read(k % 4, k / 4);
                                }
                                T::interpolate_4x4(interp, &s, xfrac, yfrac)
                            }
                            _ => {
                                for (k, v) in samples.iter_mut().enumerate() {
                                    *v = read(k % kw, k / kw);
                                }
                                T::interpolate(interp, &samples, xfrac, yfrac)
                            }
                        }
                    };
                    let i = dest.index(x, y, b);
                    T::write(dest.data_mut(), i, v, sample_type);
                }
                written += 1;
            }
        }
        written
    }
}

/// Applies a point kernel over `rect`.
///
/// Input `k` of every destination sample is read from `sources[k]`; when
/// `in_place` is set, `dest` itself is the first input and `sources` holds the
/// remaining ones. Sources with fewer bands than `dest` repeat their last band.
pub(crate) fn apply_point(
    kernel: &dyn PointKernel,
    dest: &mut PixelBuffer,
    sources: &[&PixelBuffer],
    rect: &Rect,
    in_place: bool,
) {
    let sample_type = dest.sample_type();
    let bands = dest.num_bands();
    let mut inputs = Vec::with_capacity(sources.len() + 1);
    for y in rect.y..rect.max_y() as i32 {
        for x in rect.x..rect.max_x() as i32 {
            for b in 0..bands {
                inputs.clear();
                let i = dest.index(x, y, b);
                if in_place {
                    inputs.push(dest.data().get_f64(i));
                }
                for src in sources {
                    let sb = b.min(src.num_bands() - 1);
                    inputs.push(src.data().get_f64(src.index(x, y, sb)));
                }
                let v = sample_type.narrow(kernel.apply(b, &inputs));
                dest.data_mut().set_f64(i, v);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_point, WarpSampler};
    use crate::interpolation::{InterpolationBilinear, InterpolationNearest};
    use crate::point::{Add, Rescale};
    use crate::warp::WarpAffine;
    use tessera_image::{ImageError, Palette, PixelBuffer, PixelLayout, Rect, SampleLayout, SampleType};

    fn buffer(
        sample_type: SampleType,
        bands: usize,
        rect: Rect,
        f: impl Fn(i32, i32, usize) -> f64,
    ) -> Result<PixelBuffer, ImageError> {
        let layout = SampleLayout::new(PixelLayout::new(sample_type, bands)?, rect.width, rect.height)?;
        let mut buf = PixelBuffer::new(layout, rect.x, rect.y)?;
        for y in rect.y..rect.max_y() as i32 {
            for x in rect.x..rect.max_x() as i32 {
                for b in 0..bands {
                    buf.set_sample(x, y, b, f(x, y, b))?;
                }
            }
        }
        Ok(buf)
    }

    #[test]
    fn bilinear_half_pixel_shift() -> Result<(), ImageError> {
        let src = buffer(SampleType::Byte, 1, Rect::new(0, 0, 8, 2), |x, _, _| (x * 10) as f64)?;
        let warp = WarpAffine::translation(0.5, 0.0);
        let interp = InterpolationBilinear::default();
        let sampler = WarpSampler {
            warp: &warp,
            interp: &interp,
            src: &src,
            valid: Rect::new(0, 0, 7, 1),
            palette: None,
        };
        let mut dest = buffer(SampleType::Byte, 1, Rect::new(0, 0, 8, 1), |_, _, _| 99.0)?;
        let written = sampler.resample(&mut dest, &Rect::new(0, 0, 8, 1));
        assert_eq!(written, 7);
        assert_eq!(dest.get_sample(0, 0, 0)?, 5.0);
        assert_eq!(dest.get_sample(6, 0, 0)?, 65.0);
        // x = 7 maps to 7.5, whose right neighbor is missing.
        assert_eq!(dest.get_sample(7, 0, 0)?, 99.0);
        Ok(())
    }

    #[test]
    fn float_destination_keeps_fraction() -> Result<(), ImageError> {
        let src = buffer(SampleType::Float, 1, Rect::new(0, 0, 4, 4), |x, y, _| (x + y) as f64)?;
        let warp = WarpAffine::translation(0.25, 0.5);
        let interp = InterpolationBilinear::default();
        let sampler = WarpSampler {
            warp: &warp,
            interp: &interp,
            src: &src,
            valid: Rect::new(0, 0, 3, 3),
            palette: None,
        };
        let mut dest = buffer(SampleType::Float, 1, Rect::new(0, 0, 2, 2), |_, _, _| 0.0)?;
        sampler.resample(&mut dest, &Rect::new(0, 0, 2, 2));
        approx::assert_relative_eq!(dest.get_sample(1, 1, 0)?, 2.75);
        Ok(())
    }

    #[test]
    fn palette_sources_are_expanded() -> Result<(), ImageError> {
        let palette = Palette::new(3, vec![0, 0, 0, 200, 100, 50])?;
        let src = buffer(SampleType::Byte, 1, Rect::new(0, 0, 2, 1), |x, _, _| x as f64)?;
        let warp = WarpAffine::translation(1.0, 0.0);
        let sampler = WarpSampler {
            warp: &warp,
            interp: &InterpolationNearest,
            src: &src,
            valid: Rect::new(0, 0, 2, 1),
            palette: Some(&palette),
        };
        let mut dest = buffer(SampleType::Byte, 3, Rect::new(0, 0, 1, 1), |_, _, _| 0.0)?;
        sampler.resample(&mut dest, &Rect::new(0, 0, 1, 1));
        assert_eq!(dest.get_sample(0, 0, 0)?, 200.0);
        assert_eq!(dest.get_sample(0, 0, 2)?, 50.0);
        Ok(())
    }

    #[test]
    fn point_kernels_narrow_results() -> Result<(), ImageError> {
        let rect = Rect::new(2, 2, 2, 1);
        let a = buffer(SampleType::Byte, 2, rect, |x, _, b| (100 * x) as f64 + b as f64)?;
        let b = buffer(SampleType::Byte, 1, rect, |_, _, _| 7.0)?;
        let mut dest = buffer(SampleType::Byte, 2, rect, |_, _, _| 0.0)?;
        apply_point(&Add, &mut dest, &[&a, &b], &rect, false);
        assert_eq!(dest.get_sample(2, 2, 1)?, 208.0);
        assert_eq!(dest.get_sample(3, 2, 0)?, 255.0);

        let mut inplace = a.clone();
        apply_point(&Rescale::new(vec![0.5], vec![0.0]), &mut inplace, &[], &rect, true);
        assert_eq!(inplace.get_sample(2, 2, 0)?, 100.0);
        assert_eq!(inplace.get_sample(2, 2, 1)?, 101.0);
        Ok(())
    }
}
