//! LRU cache from line index to parsed [`LineC`].
//!
//! Reads hand out an independent copy of the cells so the styler can paint
//! highlights without corrupting the cached entry. The synthetic EOF row is
//! never inserted.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::content::LineC;

/// Default number of cached lines.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

pub struct LineCache {
    cache: LruCache<usize, LineC>,
}

impl LineCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("nonzero capacity");
        LineCache {
            cache: LruCache::new(cap),
        }
    }

    /// A deep copy of the cached line, marked valid.
    pub fn get(&mut self, n: usize) -> Option<LineC> {
        self.cache.get(&n).map(|line| {
            let mut copy = line.clone();
            copy.valid = true;
            copy
        })
    }

    pub fn put(&mut self, n: usize, line: LineC) {
        self.cache.put(n, line);
    }

    /// Drop every entry. Called on reload and on any option change that
    /// alters parsed contents (tab width, plain mode, multi-color words).
    pub fn purge(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl Default for LineCache {
    fn default() -> Self {
        LineCache::new(DEFAULT_CACHE_CAPACITY)
    }
}
