//! Simulated price feed.
//!
//! Each quoted symbol carries a current price and a per-tick volatility.
//! [`PriceFeed::tick`] moves every price by a uniform random step of at most
//! `volatility` in either direction, floored at $1.00. There is no price
//! history; only the current value is kept.

use log::debug;
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::error::ValidationError;
use crate::types::{Price, Symbol};

/// Lowest price a tick can produce (cents).
pub const PRICE_FLOOR: i64 = 1_00;

/// The stocks quoted by [`PriceFeed::default_universe`]:
/// symbol, company name, starting price (dollars), per-tick volatility.
pub const DEFAULT_UNIVERSE: [(&str, &str, f64, f64); 8] = [
    ("AAPL", "Apple Inc.", 182.63, 0.02),
    ("GOOGL", "Alphabet Inc.", 138.21, 0.018),
    ("MSFT", "Microsoft Corp.", 407.54, 0.015),
    ("TSLA", "Tesla Inc.", 234.79, 0.035),
    ("AMZN", "Amazon.com Inc.", 174.54, 0.022),
    ("META", "Meta Platforms", 484.03, 0.025),
    ("NVDA", "NVIDIA Corp.", 117.16, 0.045),
    ("NFLX", "Netflix Inc.", 612.04, 0.028),
];

/// Current quote for one symbol.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PriceRecord {
    pub symbol: Symbol,
    pub name: String,
    /// Price in fractional cents; rounded to whole cents on read.
    pub price: f64,
    /// Maximum fractional move per tick (0.02 = ±2%).
    pub volatility: f64,
}

impl PriceRecord {
    /// Current price rounded to the cent.
    #[inline]
    pub fn quote(&self) -> Price {
        Price(self.price.round() as i64)
    }
}

/// A set of symbols with simulated prices.
#[derive(Clone, Debug, Default)]
pub struct PriceFeed {
    records: FxHashMap<Symbol, PriceRecord>,
}

impl PriceFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed quoting the eight stocks in [`DEFAULT_UNIVERSE`].
    pub fn default_universe() -> Self {
        let mut feed = Self::new();
        for (sym, name, dollars, vol) in DEFAULT_UNIVERSE {
            feed.insert(Symbol::new(sym), name, Price::from_dollars(dollars), vol);
        }
        feed
    }

    /// Add or replace a quoted symbol.
    pub fn insert(&mut self, symbol: Symbol, name: &str, price: Price, volatility: f64) {
        self.records.insert(
            symbol,
            PriceRecord {
                symbol,
                name: name.to_string(),
                price: price.0 as f64,
                volatility,
            },
        );
    }

    /// Overwrite the current price of a quoted symbol.
    pub fn set_price(&mut self, symbol: &Symbol, price: Price) -> Result<(), ValidationError> {
        let record = self
            .records
            .get_mut(symbol)
            .ok_or(ValidationError::UnknownSymbol(*symbol))?;
        record.price = price.0 as f64;
        Ok(())
    }

    /// Current price for `symbol`, if quoted.
    pub fn price(&self, symbol: &Symbol) -> Option<Price> {
        self.records.get(symbol).map(PriceRecord::quote)
    }

    /// Current price for `symbol`, or `UnknownSymbol`.
    pub fn require(&self, symbol: &Symbol) -> Result<Price, ValidationError> {
        self.price(symbol).ok_or(ValidationError::UnknownSymbol(*symbol))
    }

    /// Company name for `symbol`.
    pub fn name(&self, symbol: &Symbol) -> Option<&str> {
        self.records.get(symbol).map(|r| r.name.as_str())
    }

    /// Full record for `symbol`.
    pub fn record(&self, symbol: &Symbol) -> Option<&PriceRecord> {
        self.records.get(symbol)
    }

    /// Quoted symbols in alphabetical order.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut syms: Vec<Symbol> = self.records.keys().copied().collect();
        syms.sort();
        syms
    }

    /// Number of quoted symbols.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing is quoted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A price lookup closure for [`Portfolio`](crate::portfolio::Portfolio) valuation.
    /// Unquoted symbols are valued at zero.
    pub fn lookup(&self) -> impl Fn(&Symbol) -> Price + '_ {
        move |sym| self.price(sym).unwrap_or(Price::ZERO)
    }

    /// Advance every price by one random-walk step.
    pub fn tick<R: Rng>(&mut self, rng: &mut R) {
        for record in self.records.values_mut() {
            let step = rng.gen_range(-1.0_f64..1.0) * record.volatility;
            record.price = (record.price * (1.0 + step)).max(PRICE_FLOOR as f64);
        }
        debug!("price feed ticked ({} symbols)", self.records.len());
    }
}
