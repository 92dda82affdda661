use std::fmt::Debug;
use std::sync::Arc;

use tessera_image::{Padding, Point2, Rect};

use crate::interpolation::Interpolation;
use crate::warp::Warp;

/// Relates destination regions of an operator to regions of its sources.
///
/// Implementors provide the bare coordinate mappings; the padding algebra that
/// accounts for the resampling neighborhood lives in the provided methods.
pub trait RegionMapper: Send + Sync + Debug {
    /// Neighborhood read around every mapped source position.
    fn padding(&self) -> Padding;

    /// Source rectangle whose pixels the destination `rect` is mapped onto,
    /// before padding. `None` if unknown.
    fn backward_map_rect(&self, rect: &Rect, source_index: usize) -> Option<Rect>;

    /// Destination rectangle covering everything the source `rect` maps to.
    /// `None` if unknown.
    fn forward_map_rect(&self, rect: &Rect, source_index: usize) -> Option<Rect>;

    /// Source position of a destination point.
    fn backward_map_point(&self, pt: Point2, _source_index: usize) -> Option<Point2> {
        Some(pt)
    }

    /// Destination position of a source point.
    fn forward_map_point(&self, pt: Point2, _source_index: usize) -> Option<Point2> {
        Some(pt)
    }

    /// Source region needed to compute the destination `rect`: the backward
    /// mapping grown by the padding, or `source_bounds` if the mapping is unknown.
    fn map_dest_rect(&self, rect: &Rect, source_index: usize, source_bounds: &Rect) -> Rect {
        match self.backward_map_rect(rect, source_index) {
            Some(r) => r.expand(&self.padding()),
            None => {
                log::debug!("backward mapping of {rect} unknown, using source bounds");
                *source_bounds
            }
        }
    }

    /// Destination region affected by the source `rect`: `rect` shrunk by the
    /// padding, then forward mapped, or `dest_bounds` if the mapping is unknown.
    ///
    /// A source rectangle smaller than the padding affects nothing and yields an
    /// empty rectangle.
    fn map_source_rect(&self, rect: &Rect, source_index: usize, dest_bounds: &Rect) -> Rect {
        let shrunk = rect.shrink(&self.padding());
        if shrunk.is_empty() {
            return Rect::new(shrunk.x, shrunk.y, shrunk.width.max(0), shrunk.height.max(0));
        }
        match self.forward_map_rect(&shrunk, source_index) {
            Some(r) => r,
            None => {
                log::debug!("forward mapping of {rect} unknown, using image bounds");
                *dest_bounds
            }
        }
    }
}

/// Maps every pixel onto the pixel at the same position.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityMapper;

impl RegionMapper for IdentityMapper {
    fn padding(&self) -> Padding {
        Padding::ZERO
    }

    fn backward_map_rect(&self, rect: &Rect, _source_index: usize) -> Option<Rect> {
        Some(*rect)
    }

    fn forward_map_rect(&self, rect: &Rect, _source_index: usize) -> Option<Rect> {
        Some(*rect)
    }
}

/// Maps regions through a warp, padded by the neighborhood of a kernel.
#[derive(Clone, Debug)]
pub struct WarpMapper {
    warp: Arc<dyn Warp>,
    padding: Padding,
}

impl WarpMapper {
    /// Create a mapper for `warp` resampled with `interp`.
    pub fn new(warp: Arc<dyn Warp>, interp: &dyn Interpolation) -> Self {
        Self {
            warp,
            padding: interp.padding(),
        }
    }

    /// Create a mapper with an explicit padding.
    pub fn with_padding(warp: Arc<dyn Warp>, padding: Padding) -> Self {
        Self { warp, padding }
    }
}

impl RegionMapper for WarpMapper {
    fn padding(&self) -> Padding {
        self.padding
    }

    fn backward_map_rect(&self, rect: &Rect, _source_index: usize) -> Option<Rect> {
        self.warp.map_dest_rect(rect)
    }

    fn forward_map_rect(&self, rect: &Rect, _source_index: usize) -> Option<Rect> {
        self.warp.map_source_rect(rect)
    }

    fn backward_map_point(&self, pt: Point2, _source_index: usize) -> Option<Point2> {
        let p = self.warp.map_dest_point(pt);
        (p.x.is_finite() && p.y.is_finite()).then_some(p)
    }

    fn forward_map_point(&self, pt: Point2, _source_index: usize) -> Option<Point2> {
        self.warp.map_source_point(pt)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{IdentityMapper, RegionMapper, WarpMapper};
    use crate::interpolation::InterpolationBilinear;
    use crate::warp::{WarpAffine, WarpPolynomial};
    use tessera_image::{Padding, Rect};

    #[test]
    fn backward_map_then_expand() {
        let mapper = WarpMapper::with_padding(
            Arc::new(WarpAffine::translation(5.0, 5.0)),
            Padding::new(1, 2, 1, 2),
        );
        let bounds = Rect::new(0, 0, 50, 50);
        assert_eq!(
            mapper.map_dest_rect(&Rect::new(0, 0, 10, 10), 0, &bounds),
            Rect::new(4, 4, 13, 13)
        );
        // Shrink (4, 4, 13, 13) back to (5, 5, 10, 10) and map forward.
        assert_eq!(
            mapper.map_source_rect(&Rect::new(4, 4, 13, 13), 0, &bounds),
            Rect::new(0, 0, 10, 10)
        );
    }

    #[test]
    fn shrinking_below_support_is_empty() {
        let mapper = WarpMapper::with_padding(
            Arc::new(WarpAffine::translation(0.0, 0.0)),
            Padding::new(1, 2, 1, 2),
        );
        let r = mapper.map_source_rect(&Rect::new(0, 0, 2, 8), 0, &Rect::new(0, 0, 9, 9));
        assert!(r.is_empty());
    }

    #[test]
    fn unknown_mappings_fall_back_to_bounds() -> Result<(), crate::warp::WarpError> {
        // Polynomial warps have no forward mapping.
        let warp = Arc::new(WarpPolynomial::new(vec![1.0, 1.0, 0.0], vec![2.0, 0.0, 1.0])?);
        let mapper = WarpMapper::new(warp, &InterpolationBilinear::default());
        let dest_bounds = Rect::new(0, 0, 30, 20);
        assert_eq!(
            mapper.map_source_rect(&Rect::new(3, 3, 8, 8), 0, &dest_bounds),
            dest_bounds
        );
        // A singular affine warp has a backward mapping but no forward one.
        let flat = WarpMapper::new(
            Arc::new(WarpAffine::new([0.0, 0.0, 3.0, 0.0, 0.0, 3.0])),
            &InterpolationBilinear::default(),
        );
        assert_eq!(
            flat.map_dest_rect(&Rect::new(0, 0, 10, 10), 0, &dest_bounds),
            Rect::new(2, 2, 3, 3)
        );
        assert_eq!(flat.map_source_rect(&Rect::new(0, 0, 10, 10), 0, &dest_bounds), dest_bounds);
        Ok(())
    }

    #[test]
    fn identity_has_no_padding() {
        let r = Rect::new(-4, 7, 3, 2);
        assert_eq!(IdentityMapper.map_dest_rect(&r, 0, &Rect::default()), r);
        assert_eq!(IdentityMapper.map_source_rect(&r, 0, &Rect::default()), r);
    }
}
