use std::collections::{HashMap, VecDeque};

use arena_core::{CellCoord, PathStrategy};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct PathKey {
    pub(crate) start: CellCoord,
    pub(crate) goal: CellCoord,
    pub(crate) strategy: PathStrategy,
    pub(crate) version: u64,
}

/// Memoised search results, evicted oldest first once full.
#[derive(Debug)]
pub(crate) struct PathCache {
    capacity: usize,
    entries: HashMap<PathKey, Vec<CellCoord>>,
    order: VecDeque<PathKey>,
}

impl PathCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub(crate) fn get(&self, key: &PathKey) -> Option<&[CellCoord]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub(crate) fn insert(&mut self, key: PathKey, path: Vec<CellCoord>) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.insert(key, path).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                let _ = self.entries.remove(&evicted);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
