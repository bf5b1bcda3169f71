//! Order queue: FIFO log of confirmed orders.
//!
//! Orders are executed in place and stay in the queue afterwards, so the queue
//! doubles as a visible log of everything confirmed during this session. It is
//! process-local and never persisted.

use std::collections::VecDeque;

use crate::error::{DeskError, Result};
use crate::side::Side;
use crate::types::{OrderId, Price, Quantity, Symbol, Timestamp};

/// Lifecycle of a confirmed order. `Pending → Executed`, exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    Executed,
}

impl OrderStatus {
    pub fn is_pending(self) -> bool {
        self == OrderStatus::Pending
    }
}

/// A confirmed order. Price is the quote taken at confirmation.
#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub price: Price,
    pub submitted_at: Timestamp,
    pub status: OrderStatus,
}

impl Order {
    /// Notional value of the order (cents).
    #[inline]
    pub fn notional(&self) -> i64 {
        self.price.saturating_notional(self.quantity)
    }
}

/// FIFO of orders.
#[derive(Clone, Debug, Default)]
pub struct OrderQueue {
    orders: VecDeque<Order>,
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order at the back.
    pub fn enqueue(&mut self, order: Order) {
        self.orders.push_back(order);
    }

    /// Remove the front order.
    pub fn dequeue(&mut self) -> Option<Order> {
        self.orders.pop_front()
    }

    /// Oldest order still pending.
    pub fn next_pending(&self) -> Option<&Order> {
        self.orders.iter().find(|o| o.status.is_pending())
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Transition an order from `Pending` to `Executed`.
    pub fn mark_executed(&mut self, id: OrderId) -> Result<()> {
        let order = self
            .orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(DeskError::UnknownOrder(id))?;
        if !order.status.is_pending() {
            return Err(DeskError::OrderNotPending(id));
        }
        order.status = OrderStatus::Executed;
        Ok(())
    }

    /// Pending orders, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|o| o.status.is_pending())
    }

    /// Every order, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    /// Cash committed to pending buys (cents).
    pub fn reserved_cash(&self) -> i64 {
        self.pending()
            .filter(|o| o.side == Side::Buy)
            .map(Order::notional)
            .fold(0, i64::saturating_add)
    }

    /// Shares of `symbol` committed to pending sells.
    pub fn reserved_shares(&self, symbol: &Symbol) -> Quantity {
        self.pending()
            .filter(|o| o.side == Side::Sell && o.symbol == *symbol)
            .map(|o| o.quantity)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn order(id: u64, side: Side, sym: &str, qty: Quantity) -> Order {
        Order {
            id: OrderId(id),
            side,
            symbol: Symbol::new(sym),
            quantity: qty,
            price: Price(100_00),
            submitted_at: Utc::now(),
            status: OrderStatus::Pending,
        }
    }

    #[test]
    fn fifo() {
        let mut q = OrderQueue::new();
        q.enqueue(order(1, Side::Buy, "AAPL", 1));
        q.enqueue(order(2, Side::Buy, "MSFT", 1));
        assert_eq!(q.dequeue().map(|o| o.id), Some(OrderId(1)));
        assert_eq!(q.dequeue().map(|o| o.id), Some(OrderId(2)));
        assert!(q.dequeue().is_none());
    }

    #[test]
    fn executes_exactly_once() {
        let mut q = OrderQueue::new();
        q.enqueue(order(1, Side::Buy, "AAPL", 1));
        q.enqueue(order(2, Side::Sell, "AAPL", 1));

        assert_eq!(q.next_pending().map(|o| o.id), Some(OrderId(1)));
        q.mark_executed(OrderId(1)).unwrap();
        assert_eq!(q.mark_executed(OrderId(1)), Err(DeskError::OrderNotPending(OrderId(1))));
        assert_eq!(q.mark_executed(OrderId(9)), Err(DeskError::UnknownOrder(OrderId(9))));

        assert_eq!(q.next_pending().map(|o| o.id), Some(OrderId(2)));
        assert_eq!(q.pending().count(), 1);
        // executed orders stay visible
        assert_eq!(q.len(), 2);
        assert_eq!(q.get(OrderId(1)).map(|o| o.status), Some(OrderStatus::Executed));
    }

    #[test]
    fn reservations_cover_pending_only() {
        let mut q = OrderQueue::new();
        q.enqueue(order(1, Side::Buy, "AAPL", 3));
        q.enqueue(order(2, Side::Sell, "MSFT", 4));
        q.enqueue(order(3, Side::Sell, "MSFT", 1));
        assert_eq!(q.reserved_cash(), 300_00);
        assert_eq!(q.reserved_shares(&Symbol::new("MSFT")), 5);
        assert_eq!(q.reserved_shares(&Symbol::new("AAPL")), 0);

        q.mark_executed(OrderId(1)).unwrap();
        q.mark_executed(OrderId(2)).unwrap();
        assert_eq!(q.reserved_cash(), 0);
        assert_eq!(q.reserved_shares(&Symbol::new("MSFT")), 1);
    }
}
