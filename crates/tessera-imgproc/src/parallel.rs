use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;

use tessera_image::PixelBuffer;

use crate::error::OperatorError;
use crate::operator::Operator;
use crate::source::Source;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// Controls how a batch of tiles is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// Compute the tiles one after another on the current thread.
    Serial,

    /// Compute the tiles on the global Rayon thread pool.
    #[default]
    Parallel,

    /// Compute the tiles on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call.
    Fixed(usize),
}

/// Every tile index of `op`, row by row.
pub fn tile_indices(op: &Operator) -> Vec<(i32, i32)> {
    match op.tile_grid().tile_range(&op.bounds()) {
        Some((x0, y0, x1, y1)) => (y0..=y1)
            .flat_map(|ty| (x0..=x1).map(move |tx| (tx, ty)))
            .collect(),
        None => Vec::new(),
    }
}

/// Computes the tiles `indices` of `op`, returned in the same order.
///
/// Tiles go through [`Source::tile`], so a configured cache is consulted and
/// filled. Computing the same tile concurrently is allowed; both results hold
/// identical samples.
///
/// # Errors
///
/// The first error of any tile, or an error building the thread pool.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tessera_image::{PixelLayout, Rect, SampleLayout, SampleType, TileGrid};
/// use tessera_imgproc::operator::{ImageLayout, Operator, OperatorConfig};
/// use tessera_imgproc::parallel::{compute_tiles, tile_indices, ExecutionStrategy};
/// use tessera_imgproc::point::Rescale;
/// use tessera_imgproc::source::{Source, TiledImage};
///
/// let layout = SampleLayout::new(PixelLayout::new(SampleType::Byte, 1).unwrap(), 1, 1).unwrap();
/// let src = TiledImage::constant(
///     Rect::new(0, 0, 10, 10),
///     TileGrid::new(4, 4, 0, 0).unwrap(),
///     layout,
///     &[3.0],
/// )
/// .unwrap();
/// let op = Operator::point(
///     vec![Arc::new(src) as Arc<dyn Source>],
///     Arc::new(Rescale::new(vec![2.0], vec![0.0])),
///     ImageLayout::default(),
///     OperatorConfig::default(),
/// )
/// .unwrap();
///
/// let tiles = compute_tiles(&op, &tile_indices(&op), ExecutionStrategy::Parallel).unwrap();
/// assert_eq!(tiles.len(), 9);
/// assert_eq!(tiles[8].get_sample(9, 9, 0).unwrap(), 6.0);
/// ```
pub fn compute_tiles(
    op: &Operator,
    indices: &[(i32, i32)],
    strategy: ExecutionStrategy,
) -> Result<Vec<Arc<PixelBuffer>>, OperatorError> {
    log::debug!("computing {} tiles of {:?} with {strategy:?}", indices.len(), op.id());
    match strategy {
        ExecutionStrategy::Serial => indices.iter().map(|&(tx, ty)| op.tile(tx, ty)).collect(),
        ExecutionStrategy::Parallel => indices.par_iter().map(|&(tx, ty)| op.tile(tx, ty)).collect(),
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n).into());
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;

            pool.install(|| indices.par_iter().map(|&(tx, ty)| op.tile(tx, ty)).collect())
        }
    }
}
