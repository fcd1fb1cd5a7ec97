//! Actor pool rotation for large rosters.

use std::collections::VecDeque;

/// Bounded active set over roster indices.
///
/// Each rotation retires the longest-active actor (when the active set is
/// full) and promotes the longest-waiting one, so every actor eventually
/// gets steps.
#[derive(Debug, Clone)]
pub struct ActorPool {
    max_active: usize,
    active: VecDeque<usize>,
    inactive: VecDeque<usize>,
}

impl ActorPool {
    /// Create an empty pool
    pub fn new(max_active: usize) -> Self {
        Self {
            max_active: max_active.max(1),
            active: VecDeque::new(),
            inactive: VecDeque::new(),
        }
    }

    /// Add a roster index
    pub fn add(&mut self, index: usize) {
        if self.active.len() < self.max_active {
            self.active.push_back(index);
        } else {
            self.inactive.push_back(index);
        }
    }

    /// Rotate one waiting actor into the active set
    pub fn rotate(&mut self) {
        let Some(promoted) = self.inactive.pop_front() else {
            return;
        };
        let retired = if self.active.len() >= self.max_active {
            self.active.pop_front()
        } else {
            None
        };
        self.active.push_back(promoted);
        if let Some(retired) = retired {
            self.inactive.push_back(retired);
        }
    }

    /// Currently active roster indices
    pub fn active(&self) -> Vec<usize> {
        self.active.iter().copied().collect()
    }

    /// Active-set capacity
    pub fn max_active(&self) -> usize {
        self.max_active
    }

    /// Total pooled actors
    pub fn len(&self) -> usize {
        self.active.len() + self.inactive.len()
    }

    /// Whether the pool is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
