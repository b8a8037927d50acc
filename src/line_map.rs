//! View-line to origin-line mapping for derived documents.
//!
//! A filter document's line numbers are dense, but the gutter and exports
//! should show the origin numbers. The map is written by the filter thread
//! and read by the UI, so both directions sit behind read-write locks.

use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct LineMap {
    forward: RwLock<HashMap<usize, usize>>,
    reverse: RwLock<HashMap<usize, usize>>,
}

impl LineMap {
    pub fn new() -> Self {
        LineMap::default()
    }

    /// Record that view line `view` came from origin line `origin`.
    pub fn store(&self, view: usize, origin: usize) {
        self.forward.write().unwrap().insert(view, origin);
        self.reverse.write().unwrap().insert(origin, view);
    }

    /// Origin line number for a view line.
    pub fn load_forward(&self, view: usize) -> Option<usize> {
        self.forward.read().unwrap().get(&view).copied()
    }

    /// View line number for an origin line.
    pub fn load_reverse(&self, origin: usize) -> Option<usize> {
        self.reverse.read().unwrap().get(&origin).copied()
    }

    pub fn len(&self) -> usize {
        self.forward.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
