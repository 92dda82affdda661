//! Resampling kernels for geometric operators.
//!
//! A kernel turns the samples around a mapped source position into one output
//! sample. Every kernel declares how many samples it needs around the key
//! sample (its padding) and how finely it resolves fractional positions.
//!
//! # Kernels
//!
//! - **Nearest**: returns the key sample, needs no neighborhood.
//! - **Bilinear**: linear blend of a 2x2 neighborhood.
//! - **Bicubic**: cubic convolution over a 4x4 neighborhood, built as a table.
//! - **Table**: any separable kernel given by tabulated coefficients.

use std::sync::Arc;

use tessera_image::Padding;

mod bicubic;
mod bilinear;
mod kernel;
mod nearest;
mod table;

pub use bilinear::InterpolationBilinear;
pub use kernel::Interpolation;
pub use nearest::InterpolationNearest;
pub use table::InterpolationTable;

/// Largest supported fixed-point fraction precision.
pub const MAX_SUBSAMPLE_BITS: u32 = 16;

/// Largest supported table coefficient precision.
pub const MAX_PRECISION_BITS: u32 = 30;

/// An error type for kernel construction.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum InterpolationError {
    /// The kernel has no taps in some direction.
    #[error("Invalid kernel size {0}x{1}, both dimensions must be > 0")]
    InvalidKernelSize(usize, usize),

    /// The paddings do not add up to the size of the kernel.
    #[error("Padding {2:?} does not match the {0}x{1} kernel")]
    InvalidPadding(usize, usize, Padding),

    /// The fraction precision is too large.
    #[error("Subsample bits ({0}) must be <= 16")]
    InvalidSubsampleBits(u32),

    /// The coefficient precision is too large.
    #[error("Precision bits ({0}) must be <= 30")]
    InvalidPrecisionBits(u32),

    /// The key tap lies outside the kernel.
    #[error("Key ({0}) must lie within the {1} taps of the kernel")]
    InvalidKey(i32, usize),

    /// A coefficient table does not hold one row of taps per phase.
    #[error("Table has {actual} entries, expected {expected}")]
    InvalidTableLength {
        /// Required number of entries.
        expected: usize,
        /// Number of entries given.
        actual: usize,
    },
}

/// The stock resampling kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    /// Nearest neighbor.
    Nearest,
    /// Bilinear with 8 bits of fraction.
    Bilinear,
    /// Cubic convolution with `a = -0.5` and 8 bits of fraction.
    Bicubic,
    /// Cubic convolution with `a = -1.0` and 8 bits of fraction.
    Bicubic2,
}

impl InterpolationMode {
    /// Build the kernel for this mode.
    pub fn kernel(&self) -> Result<Arc<dyn Interpolation>, InterpolationError> {
        Ok(match self {
            InterpolationMode::Nearest => Arc::new(InterpolationNearest),
            InterpolationMode::Bilinear => Arc::new(InterpolationBilinear::new(8)?),
            InterpolationMode::Bicubic => Arc::new(InterpolationTable::bicubic(8)?),
            InterpolationMode::Bicubic2 => Arc::new(InterpolationTable::bicubic2(8)?),
        })
    }
}
