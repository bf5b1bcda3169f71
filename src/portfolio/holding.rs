//! Holding in a single symbol.

use crate::types::{Price, Quantity, Symbol};

/// Shares held in one symbol.
///
/// Tracks quantity and the quantity-weighted average purchase price. Average
/// cost is kept in fractional cents so repeated buys at different prices never
/// truncate. Sells leave the average untouched (cost-basis accounting).
#[derive(Clone, Debug, PartialEq)]
pub struct Holding {
    /// Symbol this holding is for
    pub symbol: Symbol,
    /// Shares held; always > 0 while the holding is in a portfolio
    pub quantity: Quantity,
    /// Weighted-average cost per share (cents)
    pub avg_cost: f64,
}

impl Holding {
    /// Create an empty holding for the given symbol.
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            quantity: 0,
            avg_cost: 0.0,
        }
    }

    /// Add `qty` shares bought at `price`, updating the weighted-average cost:
    /// `(old_qty * old_avg + qty * price) / (old_qty + qty)`.
    pub fn add(&mut self, qty: Quantity, price: Price) {
        if qty == 0 {
            return;
        }
        let total = self.quantity + qty;
        self.avg_cost =
            (self.quantity as f64 * self.avg_cost + qty as f64 * price.0 as f64) / total as f64;
        self.quantity = total;
    }

    /// Remove `qty` shares. Average cost is unchanged.
    ///
    /// Callers check `qty <= self.quantity` first; the quantity saturates at zero.
    pub fn remove(&mut self, qty: Quantity) {
        self.quantity = self.quantity.saturating_sub(qty);
    }

    /// Current market value at the given price (cents).
    #[inline]
    pub fn market_value(&self, price: Price) -> i64 {
        price.saturating_notional(self.quantity)
    }

    /// Total purchase cost of the shares still held (cents).
    #[inline]
    pub fn cost_basis(&self) -> f64 {
        self.avg_cost * self.quantity as f64
    }

    /// Unrealized profit or loss at the given price (cents).
    #[inline]
    pub fn unrealized_pnl(&self, price: Price) -> f64 {
        self.market_value(price) as f64 - self.cost_basis()
    }

    /// Percentage return of `price` over the average cost (5.0 = +5%).
    pub fn return_pct(&self, price: Price) -> f64 {
        if self.avg_cost <= 0.0 {
            return 0.0;
        }
        (price.0 as f64 - self.avg_cost) / self.avg_cost * 100.0
    }

    /// Returns true if no shares are held.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}
