//! # Bounded Windows
//!
//! Every per-player history in the core is a [`BoundedWindow`]: a FIFO ring
//! with a fixed capacity that evicts the oldest entry on overflow.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Fixed-capacity FIFO history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundedWindow<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedWindow<T> {
    /// Creates an empty window. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends an entry, returning the evicted oldest entry if full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if no entries are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true once the window is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Newest entry.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Oldest entry.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.items.front()
    }

    /// Entry `n` places back from the newest (0 = newest).
    #[must_use]
    pub fn nth_back(&self, n: usize) -> Option<&T> {
        let len = self.items.len();
        if n >= len {
            return None;
        }
        self.items.get(len - 1 - n)
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    /// Iterates the newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        let skip = self.items.len().saturating_sub(n);
        self.items.range(skip..)
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Copy> BoundedWindow<T> {
    /// Copies the contents out, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().copied().collect()
    }
}

/// Exponential moving average with weight `alpha` on the newest sample.
///
/// The first sample seeds the average directly.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    /// Creates an unseeded average. `alpha` is clamped to [0, 1].
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: None,
        }
    }

    /// Creates an average already seeded with `initial`.
    #[must_use]
    pub fn seeded(alpha: f64, initial: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: Some(initial),
        }
    }

    /// Folds in a sample and returns the new average.
    pub fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            Some(current) => current + self.alpha * (sample - current),
            None => sample,
        };
        self.value = Some(next);
        next
    }

    /// Current average, if seeded.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        self.value
    }

    /// Current average or `default` if unseeded.
    #[must_use]
    pub fn value_or(&self, default: f64) -> f64 {
        self.value.unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_first() {
        let mut window = BoundedWindow::new(3);
        for i in 0..5 {
            window.push(i);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.to_vec(), vec![2, 3, 4]);
        assert_eq!(window.first(), Some(&2));
        assert_eq!(window.last(), Some(&4));
    }

    #[test]
    fn test_push_reports_eviction() {
        let mut window = BoundedWindow::new(2);
        assert_eq!(window.push('a'), None);
        assert_eq!(window.push('b'), None);
        assert_eq!(window.push('c'), Some('a'));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut window = BoundedWindow::new(7);
        for i in 0..1000 {
            window.push(i);
            assert!(window.len() <= 7);
        }
        assert!(window.is_full());
    }

    #[test]
    fn test_recent_and_nth_back() {
        let mut window = BoundedWindow::new(10);
        for i in 0..6 {
            window.push(i);
        }
        let recent: Vec<_> = window.recent(3).copied().collect();
        assert_eq!(recent, vec![3, 4, 5]);
        assert_eq!(window.nth_back(0), Some(&5));
        assert_eq!(window.nth_back(5), Some(&0));
        assert_eq!(window.nth_back(6), None);
        assert_eq!(window.recent(50).len(), 6);
    }

    #[test]
    fn test_ema() {
        let mut ema = Ema::new(0.5);
        assert_eq!(ema.value(), None);
        assert!((ema.update(10.0) - 10.0).abs() < 1e-9);
        assert!((ema.update(20.0) - 15.0).abs() < 1e-9);
        assert!((ema.value_or(0.0) - 15.0).abs() < 1e-9);
    }
}
