//! Theme identifier allocation.

use std::collections::HashSet;

use uuid::Uuid;

/// Hands out theme ids that are unique within one generator run.
///
/// A fresh allocator is created per run, so repeated runs in the same
/// process allocate the same ids for the same source order.
#[derive(Debug, Default)]
pub struct ThemeIdAllocator {
    used: HashSet<String>,
}

impl ThemeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id derived from `candidate`.
    ///
    /// An unused candidate is returned as is. A taken one gets the first
    /// free numeric suffix starting at 1 (`demo`, `demo1`, `demo2`, ...).
    /// An empty candidate yields a random UUID.
    pub fn allocate(&mut self, candidate: &str) -> String {
        if candidate.is_empty() {
            let id = Uuid::new_v4().to_string();
            self.used.insert(id.clone());
            return id;
        }
        if self.used.insert(candidate.to_string()) {
            return candidate.to_string();
        }
        let mut suffix = 1u32;
        loop {
            let id = format!("{}{}", candidate, suffix);
            if self.used.insert(id.clone()) {
                return id;
            }
            suffix += 1;
        }
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}
