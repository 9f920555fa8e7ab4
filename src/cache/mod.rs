//! Kernel row cache
//!
//! The SMO error update needs full kernel rows K(i, ·) for both updated
//! multipliers. Rows are kept in an LRU cache bounded by a memory budget.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// LRU cache of kernel matrix rows, keyed by training index
pub struct KernelCache {
    rows: LruCache<usize, Arc<[f64]>>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache holding at most `capacity` rows
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            rows: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache for the `n` rows of an `n x n` kernel matrix within
    /// `memory_bytes`
    ///
    /// At least two rows are always kept, since each SMO step touches two,
    /// and never more than `n`.
    pub fn with_memory_limit(memory_bytes: usize, n: usize) -> Self {
        let row_bytes = n.max(1).saturating_mul(std::mem::size_of::<f64>());
        Self::new((memory_bytes / row_bytes).clamp(2, n.max(2)))
    }

    /// Get row `i`, computing it with `compute` on a miss
    pub fn row_or_insert_with<F>(&mut self, i: usize, compute: F) -> Arc<[f64]>
    where
        F: FnOnce() -> Vec<f64>,
    {
        if let Some(row) = self.rows.get(&i) {
            self.hits += 1;
            return Arc::clone(row);
        }
        self.misses += 1;
        let row: Arc<[f64]> = compute().into();
        self.rows.put(i, Arc::clone(&row));
        row
    }

    /// Get a cached row without computing it
    pub fn get(&mut self, i: usize) -> Option<Arc<[f64]>> {
        match self.rows.get(&i) {
            Some(row) => {
                self.hits += 1;
                Some(Arc::clone(row))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.rows.cap().get(),
            size: self.rows.len(),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
