use crate::error::ImageError;

/// An integer rectangle in pixel coordinates.
///
/// The rectangle covers the pixels `x..x + width` horizontally and `y..y + height`
/// vertically. Rectangles with a non-positive width or height are empty; they are
/// legal values and come out of intersections or padding shrinks.
///
/// # Examples
///
/// ```
/// use tessera_image::Rect;
///
/// let a = Rect::new(0, 0, 100, 100);
/// let b = Rect::new(64, 64, 64, 64);
///
/// assert_eq!(a.intersection(&b), Rect::new(64, 64, 36, 36));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rect {{ x: {}, y: {}, width: {}, height: {} }}",
            self.x, self.y, self.width, self.height
        )
    }
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from its inclusive top-left and exclusive bottom-right corners.
    ///
    /// Coordinates are given in `i64` so that callers can combine edges without
    /// overflowing; the result saturates to the `i32` range.
    pub fn from_edges(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        let clamp = |v: i64| v.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
        Self {
            x: clamp(x0),
            y: clamp(y0),
            width: clamp(x1 - x0),
            height: clamp(y1 - y0),
        }
    }

    /// Returns true if the rectangle covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// The exclusive right edge.
    pub fn max_x(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// The exclusive bottom edge.
    pub fn max_y(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Number of pixels covered, zero for empty rectangles.
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    /// Verifies that the right and bottom edges fit in the `i32` coordinate range.
    pub fn checked(self) -> Result<Self, ImageError> {
        if self.max_x() > i32::MAX as i64 || self.max_y() > i32::MAX as i64 {
            return Err(ImageError::CoordinateOverflow(self));
        }
        Ok(self)
    }

    /// The overlap of two rectangles. Disjoint rectangles yield an empty rectangle
    /// whose dimensions are clamped to zero.
    pub fn intersection(&self, other: &Rect) -> Rect {
        let x0 = (self.x as i64).max(other.x as i64);
        let y0 = (self.y as i64).max(other.y as i64);
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        Rect::from_edges(x0, y0, x1.max(x0), y1.max(y0))
    }

    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty() && !other.is_empty() && !self.intersection(other).is_empty()
    }

    /// Returns true if `other` is non-empty and lies completely inside `self`.
    pub fn contains(&self, other: &Rect) -> bool {
        !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.max_x() <= self.max_x()
            && other.max_y() <= self.max_y()
    }

    /// Returns true if the pixel `(x, y)` lies inside the rectangle.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && (x as i64) < self.max_x() && (y as i64) < self.max_y()
    }

    /// The smallest rectangle covering both rectangles. Empty inputs are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect::from_edges(
            (self.x as i64).min(other.x as i64),
            (self.y as i64).min(other.y as i64),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Moves the rectangle by `(dx, dy)`.
    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grows the rectangle by the padding on every side.
    pub fn expand(&self, pad: &Padding) -> Rect {
        Rect::from_edges(
            self.x as i64 - pad.left as i64,
            self.y as i64 - pad.top as i64,
            self.max_x() + pad.right as i64,
            self.max_y() + pad.bottom as i64,
        )
    }

    /// Shrinks the rectangle by the padding on every side.
    ///
    /// The result may have a non-positive width or height when the rectangle is
    /// smaller than the padding; such a result is simply empty.
    pub fn shrink(&self, pad: &Padding) -> Rect {
        Rect::new(
            self.x + pad.left,
            self.y + pad.top,
            self.width - (pad.left + pad.right),
            self.height - (pad.top + pad.bottom),
        )
    }
}

/// Number of pixels a resampling neighborhood extends around its key sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Padding {
    /// Pixels needed to the left of the key sample.
    pub left: i32,
    /// Pixels needed to the right of the key sample.
    pub right: i32,
    /// Pixels needed above the key sample.
    pub top: i32,
    /// Pixels needed below the key sample.
    pub bottom: i32,
}

impl Padding {
    /// No padding at all.
    pub const ZERO: Padding = Padding::new(0, 0, 0, 0);

    /// Create a new padding.
    pub const fn new(left: i32, right: i32, top: i32, bottom: i32) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    /// Returns true if every side is zero.
    pub fn is_zero(&self) -> bool {
        *self == Padding::ZERO
    }
}

/// A point in continuous image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2 {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point2 {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::{Padding, Rect};

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(64, 64, 64, 64);
        assert_eq!(a.intersection(&b), Rect::new(64, 64, 36, 36));
        assert!(a.intersects(&b));
    }

    #[test]
    fn intersection_of_disjoint_rects_is_empty() {
        let a = Rect::new(64, 64, 36, 36);
        let b = Rect::new(200, 200, 10, 10);
        let isect = a.intersection(&b);
        assert!(isect.is_empty());
        assert_eq!(isect.area(), 0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn contains_and_union() {
        let a = Rect::new(-5, -5, 20, 20);
        assert!(a.contains(&Rect::new(0, 0, 15, 15)));
        assert!(!a.contains(&Rect::new(0, 0, 16, 15)));
        assert!(!a.contains(&Rect::new(0, 0, 0, 0)));
        assert!(a.contains_point(-5, 14));
        assert!(!a.contains_point(15, 0));

        let u = Rect::new(0, 0, 2, 2).union(&Rect::new(10, 5, 1, 1));
        assert_eq!(u, Rect::new(0, 0, 11, 6));
        assert_eq!(Rect::default().union(&u), u);
    }

    #[test]
    fn expand_then_shrink_is_identity() {
        let pad = Padding::new(1, 2, 1, 2);
        let r = Rect::new(5, 5, 10, 10);
        assert_eq!(r.expand(&pad), Rect::new(4, 4, 13, 13));
        assert_eq!(r.expand(&pad).shrink(&pad), r);
    }

    #[test]
    fn shrink_below_support_is_empty() {
        let pad = Padding::new(1, 2, 1, 2);
        let r = Rect::new(0, 0, 2, 5).shrink(&pad);
        assert_eq!(r.width, -1);
        assert!(r.is_empty());
    }

    #[test]
    fn checked_rejects_overflowing_edges() {
        assert!(Rect::new(i32::MAX - 1, 0, 10, 10).checked().is_err());
        assert!(Rect::new(0, 0, 10, 10).checked().is_ok());
    }
}
