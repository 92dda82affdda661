use std::sync::atomic::{AtomicU64, Ordering};

use num_traits::{NumCast, PrimInt, ToPrimitive};

use crate::error::ImageError;
use crate::layout::{PixelLayout, SampleLayout, SampleType};
use crate::rect::Rect;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a pixel buffer allocation.
///
/// Every allocation gets a fresh id. Moving a buffer keeps its id, so two handles
/// with the same id refer to the same storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u64);

impl BufferId {
    pub(crate) fn next() -> Self {
        BufferId(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Typed storage of the samples of a buffer.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleData {
    /// Storage for [`SampleType::Bit`] and [`SampleType::Byte`].
    Byte(Vec<u8>),
    /// Storage for [`SampleType::UShort`].
    UShort(Vec<u16>),
    /// Storage for [`SampleType::Short`].
    Short(Vec<i16>),
    /// Storage for [`SampleType::Int`].
    Int(Vec<i32>),
    /// Storage for [`SampleType::Float`].
    Float(Vec<f32>),
    /// Storage for [`SampleType::Double`].
    Double(Vec<f64>),
}

fn narrow_int<T: PrimInt>(v: f64) -> T {
    let lo = T::min_value().to_f64().unwrap_or(0.0);
    let hi = T::max_value().to_f64().unwrap_or(0.0);
    <T as NumCast>::from(v.round().clamp(lo, hi)).unwrap_or_else(T::zero)
}

fn cast_int<T: PrimInt>(v: i32) -> T {
    let lo = T::min_value().to_i64().unwrap_or(0);
    let hi = T::max_value().to_i64().unwrap_or(0);
    <T as NumCast>::from((v as i64).clamp(lo, hi)).unwrap_or_else(T::zero)
}

impl SampleData {
    /// Zero filled storage for `len` samples of `sample_type`.
    pub fn zeros(sample_type: SampleType, len: usize) -> Self {
        match sample_type {
            SampleType::Bit | SampleType::Byte => SampleData::Byte(vec![0; len]),
            SampleType::UShort => SampleData::UShort(vec![0; len]),
            SampleType::Short => SampleData::Short(vec![0; len]),
            SampleType::Int => SampleData::Int(vec![0; len]),
            SampleType::Float => SampleData::Float(vec![0.0; len]),
            SampleType::Double => SampleData::Double(vec![0.0; len]),
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            SampleData::Byte(v) => v.len(),
            SampleData::UShort(v) => v.len(),
            SampleData::Short(v) => v.len(),
            SampleData::Int(v) => v.len(),
            SampleData::Float(v) => v.len(),
            SampleData::Double(v) => v.len(),
        }
    }

    /// Returns true if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the storage can hold samples of `sample_type`.
    pub fn matches(&self, sample_type: SampleType) -> bool {
        matches!(
            (self, sample_type),
            (SampleData::Byte(_), SampleType::Bit | SampleType::Byte)
                | (SampleData::UShort(_), SampleType::UShort)
                | (SampleData::Short(_), SampleType::Short)
                | (SampleData::Int(_), SampleType::Int)
                | (SampleData::Float(_), SampleType::Float)
                | (SampleData::Double(_), SampleType::Double)
        )
    }

    /// Sample `i` as a real value.
    #[inline]
    pub fn get_f64(&self, i: usize) -> f64 {
        match self {
            SampleData::Byte(v) => v[i] as f64,
            SampleData::UShort(v) => v[i] as f64,
            SampleData::Short(v) => v[i] as f64,
            SampleData::Int(v) => v[i] as f64,
            SampleData::Float(v) => v[i] as f64,
            SampleData::Double(v) => v[i],
        }
    }

    /// Sample `i` as an integer; floating samples are truncated.
    #[inline]
    pub fn get_i32(&self, i: usize) -> i32 {
        match self {
            SampleData::Byte(v) => v[i] as i32,
            SampleData::UShort(v) => v[i] as i32,
            SampleData::Short(v) => v[i] as i32,
            SampleData::Int(v) => v[i],
            SampleData::Float(v) => v[i] as i32,
            SampleData::Double(v) => v[i] as i32,
        }
    }

    /// Sample `i` as a 32-bit float.
    #[inline]
    pub fn get_f32(&self, i: usize) -> f32 {
        match self {
            SampleData::Float(v) => v[i],
            other => other.get_f64(i) as f32,
        }
    }

    /// Stores a real value, clamping and rounding it for integer storage.
    #[inline]
    pub fn set_f64(&mut self, i: usize, value: f64) {
        match self {
            SampleData::Byte(v) => v[i] = narrow_int(value),
            SampleData::UShort(v) => v[i] = narrow_int(value),
            SampleData::Short(v) => v[i] = narrow_int(value),
            SampleData::Int(v) => v[i] = narrow_int(value),
            SampleData::Float(v) => v[i] = value as f32,
            SampleData::Double(v) => v[i] = value,
        }
    }

    /// Stores an integer, clamping it to the storage range.
    #[inline]
    pub fn set_i32(&mut self, i: usize, value: i32) {
        match self {
            SampleData::Byte(v) => v[i] = cast_int(value),
            SampleData::UShort(v) => v[i] = cast_int(value),
            SampleData::Short(v) => v[i] = cast_int(value),
            SampleData::Int(v) => v[i] = value,
            SampleData::Float(v) => v[i] = value as f32,
            SampleData::Double(v) => v[i] = value as f64,
        }
    }

    /// Stores a 32-bit float.
    #[inline]
    pub fn set_f32(&mut self, i: usize, value: f32) {
        match self {
            SampleData::Float(v) => v[i] = value,
            other => other.set_f64(i, value as f64),
        }
    }
}

/// A rectangular array of samples positioned in image coordinates.
///
/// A buffer is exclusively owned: it is handed from the computation that filled
/// it to a cache or a consumer by value, or shared read-only behind an `Arc`.
#[derive(Debug, PartialEq)]
pub struct PixelBuffer {
    id: BufferId,
    rect: Rect,
    layout: SampleLayout,
    data: SampleData,
}

impl PixelBuffer {
    /// Create a zero filled buffer of `layout` with its top-left pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// If the layout is empty or its sample count overflows.
    pub fn new(layout: SampleLayout, x: i32, y: i32) -> Result<Self, ImageError> {
        let len = layout.num_samples()?;
        let rect = Rect::new(x, y, layout.width, layout.height).checked()?;
        Ok(Self {
            id: BufferId::next(),
            rect,
            data: SampleData::zeros(layout.pixel.sample_type, len),
            layout,
        })
    }

    /// Create a buffer from existing samples.
    ///
    /// # Errors
    ///
    /// If the storage type does not match the layout or the length is wrong.
    pub fn from_data(
        layout: SampleLayout,
        x: i32,
        y: i32,
        data: SampleData,
    ) -> Result<Self, ImageError> {
        let len = layout.num_samples()?;
        if !data.matches(layout.pixel.sample_type) {
            return Err(ImageError::UnsupportedSampleType(layout.pixel.sample_type));
        }
        if data.len() != len {
            return Err(ImageError::InvalidChannelShape(data.len(), len));
        }
        let rect = Rect::new(x, y, layout.width, layout.height).checked()?;
        Ok(Self {
            id: BufferId::next(),
            rect,
            layout,
            data,
        })
    }

    /// The identity of the underlying storage.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Area covered by the buffer in image coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Structural layout of the samples.
    pub fn layout(&self) -> &SampleLayout {
        &self.layout
    }

    /// Band count and sample type.
    pub fn pixel_layout(&self) -> PixelLayout {
        self.layout.pixel
    }

    /// Sample type of every band.
    pub fn sample_type(&self) -> SampleType {
        self.layout.pixel.sample_type
    }

    /// Number of bands.
    pub fn num_bands(&self) -> usize {
        self.layout.pixel.num_bands
    }

    /// The raw samples.
    pub fn data(&self) -> &SampleData {
        &self.data
    }

    /// The raw samples, mutably.
    pub fn data_mut(&mut self) -> &mut SampleData {
        &mut self.data
    }

    /// Consumes the buffer, returning its storage.
    pub fn into_data(self) -> SampleData {
        self.data
    }

    /// Size of the sample storage in bytes.
    pub fn size_in_bytes(&self) -> usize {
        let bytes = (self.sample_type().bits() as usize).div_ceil(8);
        self.data.len() * bytes
    }

    /// Reinterprets the buffer under a structurally compatible layout, keeping
    /// its identity and samples.
    ///
    /// # Errors
    ///
    /// If `layout` is not compatible with the current one.
    pub fn with_layout(mut self, layout: SampleLayout) -> Result<Self, ImageError> {
        if !self.layout.is_compatible(&layout) {
            return Err(ImageError::IncompatibleLayout(layout.width, layout.height));
        }
        self.layout = layout;
        Ok(self)
    }

    /// Moves the buffer so that its top-left pixel is at `(x, y)`.
    pub fn set_origin(&mut self, x: i32, y: i32) -> Result<(), ImageError> {
        self.rect = Rect::new(x, y, self.rect.width, self.rect.height).checked()?;
        Ok(())
    }

    /// Gives the storage a new identity; used when recycled storage is handed out again.
    pub fn renew_id(&mut self) {
        self.id = BufferId::next();
    }

    /// Linear index of sample `band` of pixel `(x, y)` in image coordinates.
    ///
    /// The pixel must lie inside the buffer.
    #[inline]
    pub fn index(&self, x: i32, y: i32, band: usize) -> usize {
        debug_assert!(self.rect.contains_point(x, y));
        self.layout.index(
            (x - self.rect.x) as usize,
            (y - self.rect.y) as usize,
            band,
        )
    }

    fn checked_index(&self, x: i32, y: i32, band: usize) -> Result<usize, ImageError> {
        if !self.rect.contains_point(x, y) {
            return Err(ImageError::PixelIndexOutOfBounds(x, y, self.rect));
        }
        if band >= self.num_bands() {
            return Err(ImageError::BandIndexOutOfBounds(band, self.num_bands()));
        }
        Ok(self.index(x, y, band))
    }

    /// Sample `band` of pixel `(x, y)` as a real value.
    pub fn get_sample(&self, x: i32, y: i32, band: usize) -> Result<f64, ImageError> {
        let i = self.checked_index(x, y, band)?;
        Ok(self.data.get_f64(i))
    }

    /// Stores `value` into sample `band` of pixel `(x, y)`, narrowed to the sample type.
    pub fn set_sample(&mut self, x: i32, y: i32, band: usize, value: f64) -> Result<(), ImageError> {
        let i = self.checked_index(x, y, band)?;
        self.data.set_f64(i, self.sample_type().narrow(value));
        Ok(())
    }

    /// Fills the whole buffer with per-band values. See [`PixelBuffer::fill_rect`].
    pub fn fill(&mut self, values: &[f64]) {
        let rect = self.rect;
        self.fill_rect(&rect, values);
    }

    /// Fills the part of `rect` inside the buffer with per-band values.
    ///
    /// A value array shorter than the band count is broadcast from its first
    /// element; an empty array fills zeros. Values are clamped to the sample
    /// range and rounded for integer types.
    pub fn fill_rect(&mut self, rect: &Rect, values: &[f64]) {
        let area = self.rect.intersection(rect);
        if area.is_empty() {
            return;
        }
        let sample_type = self.sample_type();
        let bands: Vec<f64> = (0..self.num_bands())
            .map(|b| {
                let v = if values.len() >= self.num_bands() {
                    values[b]
                } else {
                    values.first().copied().unwrap_or(0.0)
                };
                sample_type.narrow(v)
            })
            .collect();
        for y in area.y..area.max_y() as i32 {
            for x in area.x..area.max_x() as i32 {
                for (b, &v) in bands.iter().enumerate() {
                    let i = self.index(x, y, b);
                    self.data.set_f64(i, v);
                }
            }
        }
    }

    /// Copies the samples of `src` that overlap this buffer, converting between
    /// sample types. Bands beyond the source band count are left untouched.
    ///
    /// Returns the copied area.
    pub fn copy_from(&mut self, src: &PixelBuffer) -> Rect {
        let area = self.rect.intersection(&src.rect);
        if area.is_empty() {
            return area;
        }
        let bands = self.num_bands().min(src.num_bands());
        let dst_type = self.sample_type();
        let integral = dst_type.is_integral() && src.sample_type().is_integral();
        for y in area.y..area.max_y() as i32 {
            for x in area.x..area.max_x() as i32 {
                for b in 0..bands {
                    let si = src.index(x, y, b);
                    let di = self.index(x, y, b);
                    if integral {
                        self.data.set_i32(di, dst_type.clamp_i32(src.data.get_i32(si)));
                    } else {
                        self.data.set_f64(di, dst_type.narrow(src.data.get_f64(si)));
                    }
                }
            }
        }
        area
    }

    /// A new buffer with the samples of `rect`, which must lie inside this buffer.
    pub fn crop(&self, rect: &Rect) -> Result<PixelBuffer, ImageError> {
        if !self.rect.contains(rect) {
            return Err(ImageError::PixelIndexOutOfBounds(rect.x, rect.y, self.rect));
        }
        let layout = self.layout.with_size(rect.width, rect.height)?;
        let mut out = PixelBuffer::new(layout, rect.x, rect.y)?;
        out.copy_from(self);
        Ok(out)
    }
}

impl Clone for PixelBuffer {
    /// Clones the samples into new storage with a new identity.
    fn clone(&self) -> Self {
        Self {
            id: BufferId::next(),
            rect: self.rect,
            layout: self.layout.clone(),
            data: self.data.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PixelBuffer, SampleData};
    use crate::{ImageError, PixelLayout, Rect, SampleLayout, SampleType};

    fn byte_layout(bands: usize, w: i32, h: i32) -> Result<SampleLayout, ImageError> {
        SampleLayout::new(PixelLayout::new(SampleType::Byte, bands)?, w, h)
    }

    #[test]
    fn new_buffer_is_zeroed() -> Result<(), ImageError> {
        let buf = PixelBuffer::new(byte_layout(3, 4, 2)?, 10, 20)?;
        assert_eq!(buf.rect(), Rect::new(10, 20, 4, 2));
        assert_eq!(buf.data().len(), 24);
        assert_eq!(buf.get_sample(13, 21, 2)?, 0.0);
        assert!(buf.get_sample(14, 21, 0).is_err());
        assert!(buf.get_sample(13, 21, 3).is_err());
        Ok(())
    }

    #[test]
    fn from_data_checks_length_and_type() -> Result<(), ImageError> {
        let layout = byte_layout(1, 2, 2)?;
        assert_eq!(
            PixelBuffer::from_data(layout.clone(), 0, 0, SampleData::Byte(vec![0; 3])),
            Err(ImageError::InvalidChannelShape(3, 4))
        );
        assert!(PixelBuffer::from_data(layout.clone(), 0, 0, SampleData::Int(vec![0; 4])).is_err());
        let buf = PixelBuffer::from_data(layout, 0, 0, SampleData::Byte(vec![1, 2, 3, 4]))?;
        assert_eq!(buf.get_sample(1, 1, 0)?, 4.0);
        Ok(())
    }

    #[test]
    fn fill_broadcasts_and_narrows() -> Result<(), ImageError> {
        let mut buf = PixelBuffer::new(byte_layout(3, 2, 2)?, 0, 0)?;
        buf.fill(&[255.0, 0.0, 0.0]);
        assert_eq!(buf.get_sample(1, 1, 0)?, 255.0);
        assert_eq!(buf.get_sample(1, 1, 2)?, 0.0);

        buf.fill(&[300.7]);
        for b in 0..3 {
            assert_eq!(buf.get_sample(0, 0, b)?, 255.0);
        }

        buf.fill_rect(&Rect::new(1, 0, 5, 5), &[7.4]);
        assert_eq!(buf.get_sample(0, 0, 0)?, 255.0);
        assert_eq!(buf.get_sample(1, 1, 1)?, 7.0);
        Ok(())
    }

    #[test]
    fn copy_and_crop() -> Result<(), ImageError> {
        let mut src = PixelBuffer::new(byte_layout(1, 4, 4)?, 0, 0)?;
        for y in 0..4 {
            for x in 0..4 {
                src.set_sample(x, y, 0, (y * 4 + x) as f64)?;
            }
        }
        let crop = src.crop(&Rect::new(1, 2, 2, 2))?;
        assert_eq!(crop.data(), &SampleData::Byte(vec![9, 10, 13, 14]));
        assert_ne!(crop.id(), src.id());

        let mut dst = PixelBuffer::new(
            SampleLayout::new(PixelLayout::new(SampleType::Float, 1)?, 2, 2)?,
            3,
            3,
        )?;
        let copied = dst.copy_from(&src);
        assert_eq!(copied, Rect::new(3, 3, 1, 1));
        assert_eq!(dst.get_sample(3, 3, 0)?, 15.0);
        Ok(())
    }

    #[test]
    fn copy_narrows_to_the_destination_type() -> Result<(), ImageError> {
        let mut src = PixelBuffer::new(
            SampleLayout::new(PixelLayout::new(SampleType::Byte, 1)?, 3, 1)?,
            0,
            0,
        )?;
        for (x, v) in [0.0, 1.0, 200.0].into_iter().enumerate() {
            src.set_sample(x as i32, 0, 0, v)?;
        }
        let mut bits = PixelBuffer::new(
            SampleLayout::new(PixelLayout::new(SampleType::Bit, 1)?, 3, 1)?,
            0,
            0,
        )?;
        bits.copy_from(&src);
        assert_eq!(bits.data(), &SampleData::Byte(vec![0, 1, 1]));

        let mut real = PixelBuffer::new(
            SampleLayout::new(PixelLayout::new(SampleType::Double, 1)?, 2, 1)?,
            0,
            0,
        )?;
        real.set_sample(0, 0, 0, -3.6)?;
        real.set_sample(1, 0, 0, 0.6)?;
        bits.copy_from(&real);
        assert_eq!(bits.data(), &SampleData::Byte(vec![0, 1, 1]));
        Ok(())
    }

    #[test]
    fn integer_storage_clamps() -> Result<(), ImageError> {
        let mut data = SampleData::zeros(SampleType::Short, 2);
        data.set_i32(0, 70000);
        data.set_f64(1, -1.0e9);
        assert_eq!(data.get_i32(0), i16::MAX as i32);
        assert_eq!(data.get_i32(1), i16::MIN as i32);
        Ok(())
    }

    #[test]
    fn clone_has_new_identity() -> Result<(), ImageError> {
        let buf = PixelBuffer::new(byte_layout(1, 1, 1)?, 0, 0)?;
        let copy = buf.clone();
        assert_ne!(buf.id(), copy.id());
        assert_eq!(buf.data(), copy.data());
        Ok(())
    }

    #[test]
    fn reinterpret_keeps_identity() -> Result<(), ImageError> {
        let layout = SampleLayout::new(PixelLayout::new(SampleType::UShort, 2)?, 4, 2)?;
        let buf = PixelBuffer::new(layout.clone(), 0, 0)?;
        assert_eq!(buf.size_in_bytes(), 4 * 2 * 2 * 2);
        let id = buf.id();
        let moved = buf.with_layout(layout.clone())?;
        assert_eq!(moved.id(), id);

        let banded = SampleLayout::banded(layout.pixel, 4, 2)?;
        assert_eq!(
            moved.with_layout(banded),
            Err(ImageError::IncompatibleLayout(4, 2))
        );
        Ok(())
    }
}
