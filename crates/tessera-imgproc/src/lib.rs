#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
/// border extension of sources.
pub mod border;

/// tile cache module.
pub mod cache;

/// error types of the operators.
pub mod error;

/// resampling kernels.
pub mod interpolation;

/// operators and the tile compute engine.
pub mod operator;

/// module containing parallelization utilities.
pub mod parallel;

/// per-pixel kernels for point operators.
pub mod point;

/// mapping of regions between an operator and its sources.
pub mod region;

/// tiled images operators read from.
pub mod source;

/// backward coordinate mappings.
pub mod warp;

mod resample;

pub use crate::error::OperatorError;
pub use crate::operator::{ImageLayout, Operator, OperatorConfig};
pub use crate::source::{ImageId, Source, TiledImage};
