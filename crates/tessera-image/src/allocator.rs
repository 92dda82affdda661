use std::collections::HashMap;
use std::sync::Mutex;

use crate::buffer::{PixelBuffer, SampleData};
use crate::error::ImageError;
use crate::layout::{Arrangement, PixelLayout, SampleLayout};

/// A source of writable pixel buffers.
///
/// Implementors decide where buffer storage comes from. Buffers that are no longer
/// needed may be handed back through [`RasterFactory::recycle`].
pub trait RasterFactory: Send + Sync + std::fmt::Debug {
    /// Create a writable buffer of `layout` with its top-left pixel at `(x, y)`.
    ///
    /// The initial content of the buffer is unspecified.
    fn create_writable(
        &self,
        layout: &SampleLayout,
        x: i32,
        y: i32,
    ) -> Result<PixelBuffer, ImageError>;

    /// Returns a buffer whose content is no longer needed.
    fn recycle(&self, buffer: PixelBuffer) {
        drop(buffer);
    }
}

/// Allocates every buffer from the heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapFactory;

impl RasterFactory for HeapFactory {
    fn create_writable(
        &self,
        layout: &SampleLayout,
        x: i32,
        y: i32,
    ) -> Result<PixelBuffer, ImageError> {
        PixelBuffer::new(layout.clone(), x, y)
    }
}

type PoolKey = (PixelLayout, Arrangement, i32, i32);

/// Keeps a bounded pool of released buffers and hands their storage out again.
///
/// Buffers are pooled by pixel layout, arrangement and size. A reused buffer gets
/// a new identity and keeps the samples of its previous life.
#[derive(Debug)]
pub struct RecyclingFactory {
    capacity: usize,
    pool: Mutex<HashMap<PoolKey, Vec<SampleData>>>,
}

impl RecyclingFactory {
    /// Create a factory pooling at most `capacity` buffers.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pool: Mutex::new(HashMap::new()),
        }
    }

    /// Number of buffers currently pooled.
    pub fn pooled(&self) -> usize {
        match self.pool.lock() {
            Ok(pool) => pool.values().map(Vec::len).sum(),
            Err(_) => 0,
        }
    }

    fn key(layout: &SampleLayout) -> PoolKey {
        (layout.pixel, layout.arrangement, layout.width, layout.height)
    }
}

impl RasterFactory for RecyclingFactory {
    fn create_writable(
        &self,
        layout: &SampleLayout,
        x: i32,
        y: i32,
    ) -> Result<PixelBuffer, ImageError> {
        let reused = self
            .pool
            .lock()
            .ok()
            .and_then(|mut pool| pool.get_mut(&Self::key(layout)).and_then(Vec::pop));
        match reused {
            Some(data) => {
                log::trace!("reusing pooled {}x{} buffer", layout.width, layout.height);
                PixelBuffer::from_data(layout.clone(), x, y, data)
            }
            None => PixelBuffer::new(layout.clone(), x, y),
        }
    }

    fn recycle(&self, buffer: PixelBuffer) {
        let Ok(mut pool) = self.pool.lock() else {
            return;
        };
        let pooled: usize = pool.values().map(Vec::len).sum();
        if pooled >= self.capacity {
            return;
        }
        let key = Self::key(buffer.layout());
        pool.entry(key).or_default().push(buffer.into_data());
    }
}
