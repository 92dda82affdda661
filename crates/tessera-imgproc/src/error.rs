use tessera_image::{ImageError, Rect};

use crate::interpolation::InterpolationError;
use crate::parallel::ParallelError;
use crate::warp::WarpError;

/// An error type for operator construction and tile computation.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum OperatorError {
    /// Error from the raster data model.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error building a resampling kernel.
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),

    /// Error building a warp.
    #[error(transparent)]
    Warp(#[from] WarpError),

    /// Error running tiles on a thread pool.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// An operator needs at least one source.
    #[error("Operator needs at least one source")]
    NoSources,

    /// The declared bounds do not overlap what the sources can provide.
    #[error("Image bounds {0} do not intersect the source bounds {1}")]
    EmptyBounds(Rect, Rect),

    /// No bounds could be derived for a warp operator.
    #[error("Cannot derive the bounds of the warped image")]
    UnknownBounds,

    /// The source index does not name a source of the operator.
    #[error("Source index ({0}) is out of bounds ({1})")]
    SourceIndexOutOfBounds(usize, usize),

    /// The tile does not intersect the image bounds.
    #[error("Tile ({0}, {1}) lies outside the image bounds {2}")]
    TileOutOfBounds(i32, i32, Rect),

    /// The requested region does not intersect the image bounds.
    #[error("Region {0} lies outside the image bounds {1}")]
    RegionOutOfBounds(Rect, Rect),

    /// A point kernel was given the wrong number of sources.
    #[error("Kernel expects {expected} sources, got {actual}")]
    SourceCountMismatch {
        /// Sources the kernel accepts.
        expected: usize,
        /// Sources given.
        actual: usize,
    },
}
