// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # stocksim
//!
//! A simulated stock-trading desk: cash and holdings, confirmed orders
//! executed after a delay, a transaction ledger with undo, a rolling balance
//! history, and the analytics built on top of them.
//!
//! ## Features
//!
//! - **Order flow**: quote → confirm → deferred execution at the confirmed price
//! - **Undo**: bounded stack of executed trades, reversed one at a time
//! - **Ledger views**: stable chronological order, filters, sort keys, CSV export
//! - **Balance history**: fixed-capacity ring buffer of portfolio values
//! - **Analytics**: return, volatility, VaR, concentration, trading patterns, leaderboard
//! - **Fixed-point money**: integer cents throughout
//!
//! ## Quick Start
//!
//! ```
//! use stocksim::{DeskConfig, Price, PriceFeed, Side, Symbol, TradingDesk};
//!
//! let aapl = Symbol::new("AAPL");
//! let mut feed = PriceFeed::default_universe();
//! feed.set_price(&aapl, Price(180_00)).unwrap();
//!
//! let mut desk = TradingDesk::new(DeskConfig::default(), feed);
//!
//! desk.confirm(Side::Buy, aapl, 10).unwrap();
//! desk.execute_all().unwrap();
//! assert_eq!(desk.portfolio().cash(), 8_200_00);
//!
//! desk.undo().unwrap();
//! assert_eq!(desk.portfolio().cash(), 10_000_00);
//! assert_eq!(desk.ledger().len(), 2); // BUY + UNDO
//! ```
//!
//! ## Price Representation
//!
//! Prices and cash are stored as [`i64`] cents:
//!
//! ```
//! use stocksim::Price;
//!
//! let price = Price(182_63);  // $182.63
//! assert_eq!(format!("{}", price), "$182.63");
//! ```
//!
//! ## Deferred Execution
//!
//! With the `service` feature (enabled by default), [`DeskService`] runs the
//! desk on a tokio task and executes each confirmed order after the
//! configured latency, one at a time:
//!
//! ```ignore
//! let (service, _task) = DeskService::spawn(desk);
//! service.confirm(Side::Buy, Symbol::new("AAPL"), 10).await?;
//! service.flush().await?; // wait for execution
//! ```

pub mod desk;
mod error;
pub mod history;
pub mod insights;
pub mod leaderboard;
pub mod ledger;
pub mod portfolio;
pub mod price_feed;
pub mod queue;
pub mod ranking;
#[cfg(feature = "service")]
pub mod service;
mod side;
pub mod snapshot;
mod types;
pub mod undo;

// Re-export public API
pub use desk::{DeskConfig, OrderRequest, TradingDesk};
pub use error::{DeskError, Result, ValidationError};
pub use history::{BalanceHistory, BalanceSample};
pub use insights::Insights;
pub use leaderboard::{Leaderboard, Player, RankMetric, RiskLevel};
pub use ledger::{
    DateRange, LedgerStats, SortKey, Transaction, TransactionFilter, TransactionKind,
    TransactionLedger,
};
pub use portfolio::{Holding, Portfolio};
pub use price_feed::PriceFeed;
pub use queue::{Order, OrderQueue, OrderStatus};
#[cfg(feature = "service")]
pub use service::DeskService;
pub use side::Side;
#[cfg(feature = "persistence")]
pub use snapshot::JsonFileStore;
pub use snapshot::{MemoryStore, Snapshot, SnapshotError, SnapshotStore};
pub use types::{OrderId, Price, Quantity, Symbol, Timestamp};
pub use undo::{UndoEntry, UndoStack};
