//! Core types: Price, Quantity, Symbol, Timestamp, OrderId

use std::fmt;

use crate::error::ValidationError;

/// Price in cents.
///
/// `Price(18063)` represents $180.63. Cash balances and balance samples use the
/// same fixed-point unit, so sums and differences never pick up floating-point error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Convert a dollar amount to cents, rounding to the nearest cent.
    pub fn from_dollars(dollars: f64) -> Self {
        Price((dollars * 100.0).round() as i64)
    }

    /// The price as a floating-point dollar amount.
    #[inline]
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Notional value of `quantity` units at this price (cents), or `None`
    /// if it does not fit in an `i64`.
    #[inline]
    pub fn notional(self, quantity: Quantity) -> Option<i64> {
        i64::try_from(quantity).ok()?.checked_mul(self.0)
    }

    /// Notional value clamped to the `i64` range.
    ///
    /// For valuing positions and orders that already passed
    /// [`notional`](Self::notional) at trade time.
    #[inline]
    pub fn saturating_notional(self, quantity: Quantity) -> i64 {
        i64::try_from(quantity)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = self.0 / 100;
        let cents = (self.0 % 100).abs();
        if self.0 < 0 {
            write!(f, "-${}.{:02}", dollars.abs(), cents)
        } else {
            write!(f, "${}.{:02}", dollars, cents)
        }
    }
}

/// Quantity of shares. Always positive for orders and holdings.
pub type Quantity = u64;

/// Wall-clock time of an order, transaction, or balance sample.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Unique order identifier assigned by the desk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "O{}", self.0)
    }
}

/// Ticker symbol, stored inline as up to 8 uppercase ASCII characters.
///
/// `Symbol` is `Copy`, so it can key maps and ride along in orders and
/// transactions without allocation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    bytes: [u8; Symbol::MAX_LEN],
    len: u8,
}

impl Symbol {
    pub const MAX_LEN: usize = 8;

    /// Create a symbol from a literal.
    ///
    /// # Panics
    ///
    /// Panics if `s` is not a valid symbol. Use [`Symbol::parse`] for user input.
    #[track_caller]
    pub fn new(s: &str) -> Self {
        match Self::parse(s) {
            Ok(sym) => sym,
            Err(e) => panic!("invalid symbol {s:?}: {e}"),
        }
    }

    /// Parse user input into a symbol. Input is trimmed and uppercased.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if s.len() > Self::MAX_LEN || !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'.') {
            return Err(ValidationError::MalformedSymbol(s.to_string()));
        }
        let mut bytes = [0u8; Self::MAX_LEN];
        for (slot, b) in bytes.iter_mut().zip(s.bytes()) {
            *slot = b.to_ascii_uppercase();
        }
        Ok(Self {
            bytes,
            len: s.len() as u8,
        })
    }

    /// The symbol as a string slice.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Symbol {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        Symbol::parse(&s).map_err(serde::de::Error::custom)
    }
}
