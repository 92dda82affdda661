use std::fmt::Debug;

use tessera_image::{PixelBuffer, Rect};

use crate::error::OperatorError;
use crate::source::Source;

/// Supplies samples of an image outside its bounds.
pub trait BorderExtender: Send + Sync + Debug {
    /// Returns the samples of `source` over `rect`, synthesizing the part of
    /// `rect` that lies outside the source bounds.
    fn extend(&self, source: &dyn Source, rect: &Rect) -> Result<PixelBuffer, OperatorError>;
}

/// The stock border extension policies.
#[derive(Debug, Clone, PartialEq)]
pub enum BorderMode {
    /// Fills the border with constant per-band values.
    ///
    /// Example: ...d c b a | 0 0 0 0...
    Constant(Vec<f64>),

    /// Repeats the outermost row or column.
    ///
    /// Example: ...d c b a | a a a a...
    Copy,

    /// Mirrors the image, starting with the edge pixel itself.
    ///
    /// Example: ...d c b a | a b c d...
    Reflect,

    /// Mirrors the image, starting with the pixel next to the edge.
    ///
    /// Example: ...d c b a | b c d e...
    Reflect101,

    /// Tiles the image periodically.
    ///
    /// Example: ...d c b a | w x y z...
    Wrap,
}

impl BorderMode {
    /// Maps index `i` to a valid index within `[0, len)`.
    ///
    /// - `Copy`: clamp to edge
    /// - `Reflect`: mirror including edge
    /// - `Reflect101`: mirror excluding edge
    /// - `Wrap`: circular wrap
    /// - `Constant`: returns `i` unchanged (never read outside the image)
    #[inline]
    pub fn map_index(&self, i: i64, len: i64) -> i64 {
        debug_assert!(len > 0);
        match self {
            BorderMode::Constant(_) => i,
            BorderMode::Copy => i.clamp(0, len - 1),
            BorderMode::Reflect => {
                let m = i.rem_euclid(2 * len);
                if m < len {
                    m
                } else {
                    2 * len - 1 - m
                }
            }
            BorderMode::Reflect101 => {
                if len == 1 {
                    return 0;
                }
                let period = 2 * len - 2;
                let m = i.rem_euclid(period);
                if m < len {
                    m
                } else {
                    period - m
                }
            }
            BorderMode::Wrap => i.rem_euclid(len),
        }
    }

    #[inline]
    fn map_coord(&self, v: i32, origin: i32, len: i32) -> i32 {
        (origin as i64 + self.map_index(v as i64 - origin as i64, len as i64)) as i32
    }

    // Native columns (or rows) read for `start..end`.
    fn span(&self, start: i32, end: i64, origin: i32, len: i32) -> (i64, i64) {
        if end - start as i64 >= 2 * len as i64 {
            return (origin as i64, origin as i64 + len as i64);
        }
        (start..end as i32)
            .map(|v| self.map_coord(v, origin, len) as i64)
            .fold((i64::MAX, i64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v + 1)))
    }

    /// The part of an image with `bounds` that is read when extending it over `rect`.
    pub fn required_region(&self, rect: &Rect, bounds: &Rect) -> Rect {
        if rect.is_empty() || bounds.is_empty() {
            return Rect::default();
        }
        if let BorderMode::Constant(_) = self {
            return rect.intersection(bounds);
        }
        let (x0, x1) = self.span(rect.x, rect.max_x(), bounds.x, bounds.width);
        let (y0, y1) = self.span(rect.y, rect.max_y(), bounds.y, bounds.height);
        Rect::from_edges(x0, y0, x1, y1)
    }
}

impl BorderExtender for BorderMode {
    fn extend(&self, source: &dyn Source, rect: &Rect) -> Result<PixelBuffer, OperatorError> {
        let bounds = source.bounds();
        if bounds.contains(rect) {
            return source.data(rect);
        }
        let layout = source.sample_layout().with_size(rect.width, rect.height)?;
        let mut out = PixelBuffer::new(layout, rect.x, rect.y)?;

        let native_rect = self.required_region(rect, &bounds);
        if let BorderMode::Constant(values) = self {
            out.fill(values);
            if !native_rect.is_empty() {
                out.copy_from(&source.data(&native_rect)?);
            }
            return Ok(out);
        }

        let native = source.data(&native_rect)?;
        let xs: Vec<i32> = (rect.x..rect.max_x() as i32)
            .map(|x| self.map_coord(x, bounds.x, bounds.width))
            .collect();
        let bands = out.num_bands().min(native.num_bands());
        for y in rect.y..rect.max_y() as i32 {
            let sy = self.map_coord(y, bounds.y, bounds.height);
            for (x, &sx) in (rect.x..).zip(xs.iter()) {
                for b in 0..bands {
                    let v = native.data().get_f64(native.index(sx, sy, b));
                    let i = out.index(x, y, b);
                    out.data_mut().set_f64(i, v);
                }
            }
        }
        log::trace!("extended {native_rect} over {rect}");
        Ok(out)
    }
}
