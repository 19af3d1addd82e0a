use std::collections::VecDeque;
use std::num::NonZeroUsize;

/// Append-only rolling window holding the most recent `capacity` points.
///
/// Insertion order is time order. Once full, every append evicts the oldest
/// point, so memory stays bounded regardless of session length.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    points: VecDeque<T>,
    capacity: NonZeroUsize,
}

impl<T> HistoryBuffer<T> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    pub fn append(&mut self, point: T) {
        self.points.push_back(point);
        while self.points.len() > self.capacity.get() {
            self.points.pop_front();
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> + DoubleEndedIterator {
        self.points.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}

impl<T: Clone> HistoryBuffer<T> {
    /// Current window, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.points.iter().cloned().collect()
    }
}
