//! Bounded undo stack.

use std::collections::VecDeque;

use crate::side::Side;
use crate::types::{Price, Quantity, Symbol, Timestamp};

/// Default number of undoable actions kept.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// The executed trade an undo would reverse.
#[derive(Clone, Debug, PartialEq)]
pub struct UndoEntry {
    pub side: Side,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub price: Price,
    pub timestamp: Timestamp,
    /// Average cost of the holding before the trade (cents); 0.0 if none.
    pub prior_avg_cost: f64,
}

/// LIFO of recent trades with a fixed capacity.
///
/// Pushing onto a full stack evicts the oldest entry. There is no redo.
#[derive(Clone, Debug)]
pub struct UndoStack {
    entries: VecDeque<UndoEntry>,
    capacity: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_UNDO_CAPACITY)
    }
}

impl UndoStack {
    /// Create an empty stack holding at most `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push an entry, evicting the oldest one when full.
    pub fn push(&mut self, entry: UndoEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Remove and return the most recent entry.
    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop_back()
    }

    /// The entry [`pop`](Self::pop) would return.
    pub fn peek(&self) -> Option<&UndoEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(qty: Quantity) -> UndoEntry {
        UndoEntry {
            side: Side::Buy,
            symbol: Symbol::new("AAPL"),
            quantity: qty,
            price: Price(100_00),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            prior_avg_cost: 0.0,
        }
    }

    #[test]
    fn lifo_order() {
        let mut stack = UndoStack::default();
        stack.push(entry(1));
        stack.push(entry(2));
        assert_eq!(stack.peek().map(|e| e.quantity), Some(2));
        assert_eq!(stack.pop().map(|e| e.quantity), Some(2));
        assert_eq!(stack.pop().map(|e| e.quantity), Some(1));
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut stack = UndoStack::with_capacity(3);
        for q in 1..=5 {
            stack.push(entry(q));
        }
        assert_eq!(stack.len(), 3);
        let drained: Vec<Quantity> = std::iter::from_fn(|| stack.pop()).map(|e| e.quantity).collect();
        assert_eq!(drained, vec![5, 4, 3]);
    }

    #[test]
    fn default_capacity() {
        let mut stack = UndoStack::default();
        assert_eq!(stack.capacity(), 50);
        for q in 0..60 {
            stack.push(entry(q + 1));
        }
        assert_eq!(stack.len(), 50);
        assert!(!stack.is_empty());
    }
}
