//! Error types for trade validation, order processing, and undo.

use crate::types::{Price, Quantity, Symbol};

/// Input errors caught before any state is touched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationError {
    /// Quantity must be greater than zero.
    #[error("quantity must be greater than zero")]
    ZeroQuantity,
    /// Price must be greater than zero.
    #[error("price must be greater than zero")]
    ZeroPrice,
    /// Quantity times price does not fit in the cents range.
    #[error("quantity {0} is too large to trade")]
    QuantityTooLarge(Quantity),
    /// No symbol was given.
    #[error("symbol must not be empty")]
    EmptySymbol,
    /// Symbol is too long or contains unsupported characters.
    #[error("malformed symbol: {0}")]
    MalformedSymbol(String),
    /// A stored ledger entry is internally inconsistent.
    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),
    /// Symbol is not quoted by the price feed.
    #[error("unknown symbol: {0}")]
    UnknownSymbol(Symbol),
}

/// Errors returned by the trading desk.
///
/// Every variant except [`DeskError::Persistence`] is raised before any
/// mutation, so a failed operation leaves the portfolio, ledger, undo stack,
/// and balance history exactly as they were.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum DeskError {
    #[error("invalid trade: {0}")]
    Validation(#[from] ValidationError),

    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: Price, available: Price },

    #[error("insufficient shares of {symbol}: requested {requested}, available {held}")]
    InsufficientShares {
        symbol: Symbol,
        requested: Quantity,
        held: Quantity,
    },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("undo target inconsistent with portfolio: {0}")]
    Corruption(String),

    #[error("unknown order {0}")]
    UnknownOrder(crate::types::OrderId),

    #[error("order {0} is not pending")]
    OrderNotPending(crate::types::OrderId),

    #[error("snapshot error: {0}")]
    Persistence(String),

    #[error("trading service is closed")]
    ServiceClosed,
}

pub type Result<T> = std::result::Result<T, DeskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            ValidationError::ZeroQuantity.to_string(),
            "quantity must be greater than zero"
        );
        assert_eq!(
            ValidationError::UnknownSymbol(Symbol::new("XYZ")).to_string(),
            "unknown symbol: XYZ"
        );
        let err = DeskError::InsufficientFunds {
            needed: Price(1_800_00),
            available: Price(1_000_00),
        };
        assert_eq!(
            err.to_string(),
            "insufficient funds: needed $1800.00, available $1000.00"
        );
    }

    #[test]
    fn validation_converts_into_desk_error() {
        let err: DeskError = ValidationError::ZeroPrice.into();
        assert_eq!(err, DeskError::Validation(ValidationError::ZeroPrice));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(DeskError::NothingToUndo);
        assert_eq!(err.to_string(), "nothing to undo");
    }
}
