//! Fixed-capacity rolling history of portfolio values.
//!
//! Until the buffer is full, samples are appended. Afterwards each new sample
//! overwrites the slot at the write cursor, which then advances modulo the
//! capacity. Storage order is therefore not chronological after wraparound;
//! [`BalanceHistory::samples`] reads from the cursor to restore it.

use crate::types::Timestamp;

/// Default number of samples retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Total portfolio value at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BalanceSample {
    pub time: Timestamp,
    /// Cash plus market value (cents)
    pub value: i64,
}

/// Ring buffer of [`BalanceSample`]s.
#[derive(Clone, Debug)]
pub struct BalanceHistory {
    slots: Vec<BalanceSample>,
    capacity: usize,
    /// Next slot to overwrite once full.
    cursor: usize,
}

impl Default for BalanceHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl BalanceHistory {
    /// Create an empty history (capacity at least 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// Restore from samples in chronological order, keeping the newest
    /// `capacity` of them.
    pub fn from_samples(capacity: usize, samples: impl IntoIterator<Item = BalanceSample>) -> Self {
        let mut history = Self::with_capacity(capacity);
        for sample in samples {
            history.add_sample(sample);
        }
        history
    }

    pub fn add_sample(&mut self, sample: BalanceSample) {
        if self.slots.len() < self.capacity {
            self.slots.push(sample);
        } else {
            self.slots[self.cursor] = sample;
            self.cursor = (self.cursor + 1) % self.capacity;
        }
    }

    /// Samples oldest first.
    pub fn samples(&self) -> Vec<BalanceSample> {
        let (newer, older) = self.slots.split_at(self.cursor);
        older.iter().chain(newer).copied().collect()
    }

    /// Samples in storage order.
    pub fn raw(&self) -> &[BalanceSample] {
        &self.slots
    }

    /// Sample values oldest first, in cents.
    pub fn values(&self) -> Vec<f64> {
        self.samples().iter().map(|s| s.value as f64).collect()
    }

    /// Most recently added sample.
    pub fn latest(&self) -> Option<BalanceSample> {
        if self.slots.len() < self.capacity || self.cursor == 0 {
            self.slots.last().copied()
        } else {
            Some(self.slots[self.cursor - 1])
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample(i: i64) -> BalanceSample {
        BalanceSample {
            time: Utc.timestamp_opt(1_700_000_000 + i, 0).unwrap(),
            value: i,
        }
    }

    #[test]
    fn appends_until_full() {
        let mut h = BalanceHistory::with_capacity(4);
        for i in 0..3 {
            h.add_sample(sample(i));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(h.values(), vec![0.0, 1.0, 2.0]);
        assert_eq!(h.latest(), Some(sample(2)));
    }

    #[test]
    fn wraparound_keeps_newest() {
        let mut h = BalanceHistory::with_capacity(10);
        for i in 0..15 {
            h.add_sample(sample(i));
        }
        assert_eq!(h.len(), 10);
        let values: Vec<i64> = h.samples().iter().map(|s| s.value).collect();
        assert_eq!(values, (5..15).collect::<Vec<_>>());
        // storage order: 10..15 overwrote slots 0..5
        assert_eq!(h.raw()[0].value, 10);
        assert_eq!(h.raw()[5].value, 5);
        assert_eq!(h.latest(), Some(sample(14)));
    }

    #[test]
    fn latest_exactly_at_capacity() {
        let mut h = BalanceHistory::with_capacity(3);
        for i in 0..3 {
            h.add_sample(sample(i));
        }
        assert_eq!(h.latest(), Some(sample(2)));
        h.add_sample(sample(3));
        assert_eq!(h.latest(), Some(sample(3)));
        h.add_sample(sample(4));
        h.add_sample(sample(5));
        // cursor back at 0
        assert_eq!(h.latest(), Some(sample(5)));
    }

    #[test]
    fn from_samples_truncates_to_newest() {
        let h = BalanceHistory::from_samples(3, (0..7).map(sample));
        let values: Vec<i64> = h.samples().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![4, 5, 6]);
    }

    #[test]
    fn empty_history() {
        let h = BalanceHistory::default();
        assert!(h.is_empty());
        assert_eq!(h.capacity(), 100);
        assert_eq!(h.latest(), None);
        assert!(h.samples().is_empty());
    }
}
