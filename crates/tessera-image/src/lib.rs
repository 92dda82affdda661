#![deny(missing_docs)]
//! Raster data model for tiled images: rectangles, tile grids, pixel layouts and buffers.

/// Buffer allocation and recycling.
pub mod allocator;

/// Owned rectangular sample buffers.
pub mod buffer;

/// Error types for the image module.
pub mod error;

/// Tile grid arithmetic.
pub mod grid;

/// Sample types, pixel layouts and their merge lattice.
pub mod layout;

/// Integer rectangles, paddings and points.
pub mod rect;

pub use crate::allocator::{HeapFactory, RasterFactory, RecyclingFactory};
pub use crate::buffer::{BufferId, PixelBuffer, SampleData};
pub use crate::error::ImageError;
pub use crate::grid::TileGrid;
pub use crate::layout::{Arrangement, Palette, PixelLayout, SampleLayout, SampleType};
pub use crate::rect::{Padding, Point2, Rect};
