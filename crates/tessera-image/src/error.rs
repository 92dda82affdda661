use crate::layout::SampleType;
use crate::rect::Rect;

/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when the data length does not match the buffer geometry.
    #[error("Data length ({0}) does not match the buffer size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when a buffer or tile has a non-positive dimension.
    #[error("Invalid buffer size {0}x{1}, both dimensions must be > 0")]
    InvalidImageSize(i32, i32),

    /// Error when a band count of zero is requested.
    #[error("Band count must be > 0")]
    InvalidBandCount,

    /// Error when the element count of a sample lattice overflows the index type.
    #[error("Sample lattice {width}x{height}x{bands} overflows the addressable range")]
    LatticeOverflow {
        /// Width of the lattice.
        width: i64,
        /// Height of the lattice.
        height: i64,
        /// Number of bands.
        bands: usize,
    },

    /// Error when the band offsets are not a permutation of the bands.
    #[error("Band offsets {0:?} are not a permutation of 0..{1}")]
    InvalidBandOffsets(Vec<usize>, usize),

    /// Error when a pixel lies outside the buffer.
    #[error("Pixel ({0}, {1}) is out of bounds of {2}")]
    PixelIndexOutOfBounds(i32, i32, Rect),

    /// Error when a band index is out of bounds.
    #[error("Band index ({0}) is out of bounds ({1})")]
    BandIndexOutOfBounds(usize, usize),

    /// Error when two rasters have different sample types.
    #[error("Sample type mismatch: expected {0:?}, got {1:?}")]
    SampleTypeMismatch(SampleType, SampleType),

    /// Error when a routine that dispatches on sample type cannot handle it.
    #[error("Unsupported sample type {0:?}")]
    UnsupportedSampleType(SampleType),

    /// Error when merging an empty set of layouts.
    #[error("Cannot merge an empty set of pixel layouts")]
    EmptyLayoutSet,

    /// Error when the tile grid has non-positive tile dimensions.
    #[error("Invalid tile size {0}x{1}, both dimensions must be > 0")]
    InvalidTileSize(i32, i32),

    /// Error when a buffer is reinterpreted with a layout of a different memory structure.
    #[error("Layout {0}x{1} is not compatible with the buffer layout")]
    IncompatibleLayout(i32, i32),

    /// Error when a rectangle end coordinate overflows.
    #[error("Rectangle {0} overflows the coordinate range")]
    CoordinateOverflow(Rect),
}
