use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};

use tessera_image::PixelBuffer;

use crate::source::ImageId;

/// Storage for computed tiles shared between operators.
///
/// A cache may drop any entry at any time; operators recompute missing tiles.
pub trait TileCache: Send + Sync + Debug {
    /// The cached tile `(tx, ty)` of `owner`.
    fn get(&self, owner: ImageId, tx: i32, ty: i32) -> Option<Arc<PixelBuffer>>;

    /// Stores tile `(tx, ty)` of `owner`.
    fn put(&self, owner: ImageId, tx: i32, ty: i32, tile: Arc<PixelBuffer>);

    /// Drops every tile of `owner`.
    fn remove_all(&self, owner: ImageId);
}

type TileKey = (ImageId, i32, i32);

#[derive(Debug)]
struct Entry {
    tile: Arc<PixelBuffer>,
    stamp: u64,
    bytes: usize,
}

#[derive(Debug, Default)]
struct Lru {
    entries: HashMap<TileKey, Entry>,
    order: BTreeMap<u64, TileKey>,
    clock: u64,
    used: usize,
}

impl Lru {
    fn touch(&mut self, key: &TileKey) -> Option<Arc<PixelBuffer>> {
        self.clock += 1;
        let clock = self.clock;
        let entry = self.entries.get_mut(key)?;
        self.order.remove(&entry.stamp);
        entry.stamp = clock;
        self.order.insert(clock, *key);
        Some(entry.tile.clone())
    }

    fn remove(&mut self, key: &TileKey) {
        if let Some(entry) = self.entries.remove(key) {
            self.order.remove(&entry.stamp);
            self.used -= entry.bytes;
        }
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.used > capacity {
            let Some((_, key)) = self.order.pop_first() else {
                break;
            };
            if let Some(entry) = self.entries.remove(&key) {
                self.used -= entry.bytes;
                log::trace!("evicted tile ({}, {}) of {:?}", key.1, key.2, key.0);
            }
        }
    }
}

/// An in-memory tile cache bounded by the total size of the cached samples.
///
/// When the capacity is exceeded the least recently used tiles are evicted.
///
/// # Example
///
/// ```
/// use tessera_imgproc::cache::{MemoryTileCache, TileCache};
///
/// let cache = MemoryTileCache::new(64 * 1024 * 1024);
/// assert_eq!(cache.memory_used(), 0);
/// ```
#[derive(Debug)]
pub struct MemoryTileCache {
    capacity: usize,
    inner: Mutex<Lru>,
}

impl MemoryTileCache {
    /// Create a cache holding at most `capacity` bytes of samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Lru::default()),
        }
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently held.
    pub fn memory_used(&self) -> usize {
        self.lock().used
    }

    /// Number of cached tiles.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Returns true if no tile is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every tile.
    pub fn clear(&self) {
        let mut lru = self.lock();
        lru.entries.clear();
        lru.order.clear();
        lru.used = 0;
    }

    // A panic while holding the lock leaves the bookkeeping consistent, so a
    // poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, Lru> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TileCache for MemoryTileCache {
    fn get(&self, owner: ImageId, tx: i32, ty: i32) -> Option<Arc<PixelBuffer>> {
        self.lock().touch(&(owner, tx, ty))
    }

    fn put(&self, owner: ImageId, tx: i32, ty: i32, tile: Arc<PixelBuffer>) {
        let bytes = tile.size_in_bytes();
        if bytes > self.capacity {
            return;
        }
        let key = (owner, tx, ty);
        let mut lru = self.lock();
        lru.remove(&key);
        lru.clock += 1;
        let stamp = lru.clock;
        lru.order.insert(stamp, key);
        lru.entries.insert(key, Entry { tile, stamp, bytes });
        lru.used += bytes;
        lru.evict_to(self.capacity);
    }

    fn remove_all(&self, owner: ImageId) {
        let mut lru = self.lock();
        let keys: Vec<TileKey> = lru.entries.keys().filter(|k| k.0 == owner).copied().collect();
        for key in &keys {
            lru.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{MemoryTileCache, TileCache};
    use crate::source::ImageId;
    use tessera_image::{ImageError, PixelBuffer, PixelLayout, SampleLayout, SampleType};

    // 4x4 single band bytes: 16 bytes per tile.
    fn tile() -> Result<Arc<PixelBuffer>, ImageError> {
        let layout = SampleLayout::new(PixelLayout::new(SampleType::Byte, 1)?, 4, 4)?;
        Ok(Arc::new(PixelBuffer::new(layout, 0, 0)?))
    }

    #[test]
    fn get_put_and_remove_all() -> Result<(), ImageError> {
        let cache = MemoryTileCache::new(1024);
        let (a, b) = (ImageId::next(), ImageId::next());
        let t = tile()?;
        cache.put(a, 0, 0, t.clone());
        cache.put(a, 1, 0, tile()?);
        cache.put(b, 0, 0, tile()?);
        assert_eq!(cache.get(a, 0, 0).map(|t| t.id()), Some(t.id()));
        assert!(cache.get(a, 0, 1).is_none());
        assert_eq!(cache.memory_used(), 48);

        cache.remove_all(a);
        assert!(cache.get(a, 0, 0).is_none());
        assert!(cache.get(b, 0, 0).is_some());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.memory_used(), 16);
        Ok(())
    }

    #[test]
    fn evicts_least_recently_used() -> Result<(), ImageError> {
        let cache = MemoryTileCache::new(32);
        let owner = ImageId::next();
        cache.put(owner, 0, 0, tile()?);
        cache.put(owner, 1, 0, tile()?);
        // Touch (0, 0) so that (1, 0) becomes the oldest entry.
        assert!(cache.get(owner, 0, 0).is_some());
        cache.put(owner, 2, 0, tile()?);
        assert!(cache.get(owner, 0, 0).is_some());
        assert!(cache.get(owner, 1, 0).is_none());
        assert!(cache.get(owner, 2, 0).is_some());
        assert_eq!(cache.memory_used(), 32);
        Ok(())
    }

    #[test]
    fn replacing_a_tile_keeps_accounting() -> Result<(), ImageError> {
        let cache = MemoryTileCache::new(16);
        let owner = ImageId::next();
        cache.put(owner, 0, 0, tile()?);
        cache.put(owner, 0, 0, tile()?);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.memory_used(), 16);

        let tiny = MemoryTileCache::new(8);
        tiny.put(owner, 0, 0, tile()?);
        assert!(tiny.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        Ok(())
    }
}
