//! Portfolio: cash balance plus one [`Holding`] per symbol held.
//!
//! All monetary values are in cents. The portfolio enforces its own
//! invariants: cash never goes negative and every stored holding has a
//! positive quantity. A holding is created by the first buy of a symbol and
//! removed when a sell brings its quantity back to zero.
//!
//! # Example
//!
//! ```
//! use stocksim::portfolio::Portfolio;
//! use stocksim::{Price, Symbol};
//!
//! let aapl = Symbol::new("AAPL");
//! let mut portfolio = Portfolio::new(10_000_00);
//!
//! portfolio.apply_buy(aapl, 10, Price(180_00)).unwrap();
//! assert_eq!(portfolio.cash(), 8_200_00);
//!
//! portfolio.apply_sell(aapl, 5, Price(190_00)).unwrap();
//! assert_eq!(portfolio.cash(), 9_150_00);
//! assert_eq!(portfolio.holding(&aapl).unwrap().avg_cost, 180_00.0);
//! ```

pub mod holding;

pub use holding::Holding;

use rustc_hash::FxHashMap;

use crate::error::{DeskError, Result, ValidationError};
use crate::side::Side;
use crate::types::{Price, Quantity, Symbol};

/// Serde helper for `FxHashMap<Symbol, Holding>`: serializes as a
/// symbol-keyed map of `{qty, avg}` objects, sorted by symbol.
#[cfg(feature = "serde")]
mod serde_holdings {
    use std::collections::BTreeMap;

    use super::{FxHashMap, Holding, Symbol};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct HoldingRecord {
        qty: u64,
        avg: f64,
    }

    pub fn serialize<S: Serializer>(
        map: &FxHashMap<Symbol, Holding>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let sorted: BTreeMap<&str, HoldingRecord> = map
            .iter()
            .map(|(sym, h)| {
                (
                    sym.as_str(),
                    HoldingRecord {
                        qty: h.quantity,
                        avg: h.avg_cost,
                    },
                )
            })
            .collect();
        sorted.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<FxHashMap<Symbol, Holding>, D::Error> {
        let raw: BTreeMap<Symbol, HoldingRecord> = BTreeMap::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(symbol, rec)| {
                (
                    symbol,
                    Holding {
                        symbol,
                        quantity: rec.qty,
                        avg_cost: rec.avg,
                    },
                )
            })
            .collect())
    }
}

/// Cash and holdings.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Portfolio {
    /// Cash balance (cents)
    cash: i64,
    /// Holdings indexed by symbol
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "stocks",
            serialize_with = "serde_holdings::serialize",
            deserialize_with = "serde_holdings::deserialize"
        )
    )]
    holdings: FxHashMap<Symbol, Holding>,
}

impl Portfolio {
    /// Create a portfolio holding only cash.
    ///
    /// `initial_cash` is in cents (e.g., `10_000_00` = $10,000).
    pub fn new(initial_cash: i64) -> Self {
        debug_assert!(initial_cash >= 0, "initial_cash must be non-negative, got {initial_cash}");
        Self {
            cash: initial_cash.max(0),
            holdings: FxHashMap::default(),
        }
    }

    /// Rebuild a portfolio from stored parts, checking its invariants.
    pub fn from_parts(cash: i64, holdings: impl IntoIterator<Item = Holding>) -> Result<Self> {
        if cash < 0 {
            return Err(DeskError::Corruption(format!("negative cash balance {}", Price(cash))));
        }
        let mut map = FxHashMap::default();
        for h in holdings {
            if h.quantity == 0 {
                return Err(DeskError::Corruption(format!("empty holding for {}", h.symbol)));
            }
            if i64::try_from(h.quantity).is_err() {
                return Err(DeskError::Corruption(format!(
                    "holding of {} {} is out of range",
                    h.quantity, h.symbol
                )));
            }
            if !h.avg_cost.is_finite() || h.avg_cost < 0.0 {
                return Err(DeskError::Corruption(format!(
                    "invalid average cost {} for {}",
                    h.avg_cost, h.symbol
                )));
            }
            map.insert(h.symbol, h);
        }
        Ok(Self {
            cash,
            holdings: map,
        })
    }

    // === Queries ===

    /// Current cash balance (cents).
    #[inline]
    pub fn cash(&self) -> i64 {
        self.cash
    }

    /// Get a holding by symbol, if one exists.
    pub fn holding(&self, symbol: &Symbol) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    /// Shares held in `symbol` (zero when not held).
    pub fn quantity(&self, symbol: &Symbol) -> Quantity {
        self.holdings.get(symbol).map_or(0, |h| h.quantity)
    }

    /// Iterator over all holdings, in no particular order.
    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }

    /// Holdings sorted by symbol, for stable display.
    pub fn sorted_holdings(&self) -> Vec<&Holding> {
        let mut v: Vec<&Holding> = self.holdings.values().collect();
        v.sort_by_key(|h| h.symbol);
        v
    }

    /// Number of distinct symbols held.
    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    /// True if no shares are held.
    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Market value of all holdings: sum of `price(symbol) * quantity`.
    ///
    /// `price` is the current quote; average cost plays no part.
    pub fn market_value(&self, price: impl Fn(&Symbol) -> Price) -> i64 {
        self.holdings
            .values()
            .map(|h| h.market_value(price(&h.symbol)))
            .fold(0, i64::saturating_add)
    }

    /// Cash plus market value.
    pub fn total_value(&self, price: impl Fn(&Symbol) -> Price) -> i64 {
        self.cash.saturating_add(self.market_value(price))
    }

    /// Per-symbol market values, sorted by symbol.
    pub fn market_values(&self, price: impl Fn(&Symbol) -> Price) -> Vec<(Symbol, i64)> {
        self.sorted_holdings()
            .into_iter()
            .map(|h| (h.symbol, h.market_value(price(&h.symbol))))
            .collect()
    }

    /// Each holding's share of total stock value, sorted by symbol.
    ///
    /// Cash is not included. Returns an empty vector when stock value is zero.
    pub fn weights(&self, price: impl Fn(&Symbol) -> Price) -> Vec<(Symbol, f64)> {
        let values = self.market_values(price);
        let total = values.iter().map(|(_, v)| *v).fold(0, i64::saturating_add);
        if total <= 0 {
            return Vec::new();
        }
        values
            .into_iter()
            .map(|(sym, v)| (sym, v as f64 / total as f64))
            .collect()
    }

    // === Validation ===

    /// Check that a buy of `quantity` at `price` is affordable, with
    /// `reserved` cents already committed elsewhere.
    pub fn check_buy(&self, quantity: Quantity, price: Price, reserved: i64) -> Result<()> {
        let needed = validate_trade(quantity, price)?;
        let available = self.cash.saturating_sub(reserved);
        if needed > available {
            return Err(DeskError::InsufficientFunds {
                needed: Price(needed),
                available: Price(available.max(0)),
            });
        }
        Ok(())
    }

    /// Check that `quantity` shares of `symbol` can be sold, with `reserved`
    /// shares already committed elsewhere.
    pub fn check_sell(
        &self,
        symbol: &Symbol,
        quantity: Quantity,
        price: Price,
        reserved: Quantity,
    ) -> Result<()> {
        let proceeds = validate_trade(quantity, price)?;
        let held = self.quantity(symbol).saturating_sub(reserved);
        if quantity > held {
            return Err(DeskError::InsufficientShares {
                symbol: *symbol,
                requested: quantity,
                held,
            });
        }
        credit(self.cash, proceeds, quantity)?;
        Ok(())
    }

    // === Mutation ===

    /// Buy `quantity` shares of `symbol` at `price`.
    ///
    /// Fails with `InsufficientFunds` when `cash < quantity * price`; nothing
    /// changes on failure.
    pub fn apply_buy(&mut self, symbol: Symbol, quantity: Quantity, price: Price) -> Result<()> {
        self.check_buy(quantity, price, 0)?;
        let cost = validate_trade(quantity, price)?;
        self.holdings
            .entry(symbol)
            .or_insert_with(|| Holding::new(symbol))
            .add(quantity, price);
        self.cash -= cost;
        Ok(())
    }

    /// Sell `quantity` shares of `symbol` at `price`.
    ///
    /// Returns the average cost of the shares sold. Fails with
    /// `InsufficientShares` when fewer shares are held; nothing changes on
    /// failure. The holding is removed once its quantity reaches zero.
    pub fn apply_sell(&mut self, symbol: Symbol, quantity: Quantity, price: Price) -> Result<f64> {
        self.check_sell(&symbol, quantity, price, 0)?;
        let proceeds = validate_trade(quantity, price)?;
        let Some(holding) = self.holdings.get_mut(&symbol) else {
            return Err(DeskError::InsufficientShares {
                symbol,
                requested: quantity,
                held: 0,
            });
        };
        let avg_cost = holding.avg_cost;
        holding.remove(quantity);
        if holding.is_empty() {
            self.holdings.remove(&symbol);
        }
        self.cash += proceeds;
        Ok(avg_cost)
    }

    /// Reverse an executed `side` trade of `quantity` shares at `price`.
    ///
    /// Cash moves by the recorded notional and the holding's average cost is
    /// restored to `prior_avg`, the value it had before the trade. Reversing a
    /// buy requires the shares to still be held (`Corruption` otherwise);
    /// reversing a sell requires the cash to buy them back. Nothing changes on
    /// failure.
    pub fn reverse(
        &mut self,
        side: Side,
        symbol: Symbol,
        quantity: Quantity,
        price: Price,
        prior_avg: f64,
    ) -> Result<()> {
        let amount = validate_trade(quantity, price)?;
        match side {
            Side::Buy => {
                let cash = credit(self.cash, amount, quantity)?;
                let held = self.quantity(&symbol);
                let Some(holding) = self.holdings.get_mut(&symbol).filter(|_| held >= quantity)
                else {
                    return Err(DeskError::Corruption(format!(
                        "cannot reverse buy of {quantity} {symbol}: only {held} held"
                    )));
                };
                holding.remove(quantity);
                if holding.is_empty() {
                    self.holdings.remove(&symbol);
                } else {
                    holding.avg_cost = prior_avg;
                }
                self.cash = cash;
            }
            Side::Sell => {
                self.check_buy(quantity, price, 0)?;
                let holding = self
                    .holdings
                    .entry(symbol)
                    .or_insert_with(|| Holding::new(symbol));
                holding.quantity += quantity;
                holding.avg_cost = prior_avg;
                self.cash -= amount;
            }
        }
        Ok(())
    }
}

/// Check quantity and price, returning the trade's notional (cents).
fn validate_trade(quantity: Quantity, price: Price) -> std::result::Result<i64, ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::ZeroQuantity);
    }
    if price.0 <= 0 {
        return Err(ValidationError::ZeroPrice);
    }
    price
        .notional(quantity)
        .ok_or(ValidationError::QuantityTooLarge(quantity))
}

/// Cash after receiving `amount`, rejecting a balance past the cents range.
fn credit(cash: i64, amount: i64, quantity: Quantity) -> Result<i64> {
    cash.checked_add(amount)
        .ok_or(DeskError::Validation(ValidationError::QuantityTooLarge(quantity)))
}
