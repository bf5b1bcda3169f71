//! Trading desk: the order-processing state machine.
//!
//! [`TradingDesk`] owns every piece of mutable state (portfolio, ledger, undo
//! stack, order queue, balance history, price feed) and is the only thing
//! that mutates them. A trade goes through three steps:
//!
//! 1. [`quote`](TradingDesk::quote) validates the intent and snapshots the
//!    current price into an [`OrderRequest`] for the user to confirm.
//! 2. [`submit`](TradingDesk::submit) re-validates and enqueues a `Pending`
//!    order at the quoted price.
//! 3. [`execute_next`](TradingDesk::execute_next) applies the oldest pending
//!    order as one unit: portfolio update, ledger append, undo entry, balance
//!    sample, snapshot save.
//!
//! Validation at steps 1 and 2 counts resources already committed to pending
//! orders, so an order that was accepted can always execute.
//!
//! ```
//! use stocksim::{DeskConfig, PriceFeed, Side, Symbol, TradingDesk};
//!
//! let mut desk = TradingDesk::new(DeskConfig::default(), PriceFeed::default_universe());
//! let request = desk.quote(Side::Buy, Symbol::new("AAPL"), 10).unwrap();
//! desk.submit(request).unwrap();
//! desk.execute_next().unwrap();
//!
//! assert_eq!(desk.portfolio().quantity(&Symbol::new("AAPL")), 10);
//! assert_eq!(desk.ledger().len(), 1);
//! ```

use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};
use rand::Rng;

use crate::error::{DeskError, Result, ValidationError};
use crate::history::{BalanceHistory, BalanceSample, DEFAULT_HISTORY_CAPACITY};
use crate::ledger::{Transaction, TransactionLedger};
use crate::portfolio::Portfolio;
use crate::price_feed::PriceFeed;
use crate::queue::{Order, OrderQueue, OrderStatus};
use crate::side::Side;
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::types::{OrderId, Price, Quantity, Symbol, Timestamp};
use crate::undo::{DEFAULT_UNDO_CAPACITY, UndoEntry, UndoStack};

/// Starting cash for a new account: $10,000.
pub const DEFAULT_INITIAL_CASH: i64 = 10_000_00;

/// Desk configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DeskConfig {
    /// Cash for a fresh account (cents).
    pub initial_cash: i64,
    /// Undoable trades kept.
    pub undo_capacity: usize,
    /// Balance samples kept.
    pub history_capacity: usize,
    /// Simulated delay between confirmation and execution.
    pub execution_latency: Duration,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            initial_cash: DEFAULT_INITIAL_CASH,
            undo_capacity: DEFAULT_UNDO_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            execution_latency: Duration::from_secs(1),
        }
    }
}

impl DeskConfig {
    /// Validate the config. Returns `Err` with a description if any field is nonsensical.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.initial_cash < 0 {
            return Err(format!(
                "initial_cash must be >= 0, got {}",
                self.initial_cash
            ));
        }
        if self.undo_capacity == 0 {
            return Err("undo_capacity must be > 0".into());
        }
        if self.history_capacity == 0 {
            return Err("history_capacity must be > 0".into());
        }
        Ok(())
    }
}

/// A validated trade intent priced at quote time, awaiting confirmation.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderRequest {
    pub side: Side,
    pub symbol: Symbol,
    pub quantity: Quantity,
    /// Price snapshot used for both validation and execution.
    pub price: Price,
    pub quoted_at: Timestamp,
}

impl OrderRequest {
    /// Estimated trade value (cents).
    pub fn notional(&self) -> i64 {
        self.price.saturating_notional(self.quantity)
    }
}

type Clock = Box<dyn Fn() -> Timestamp + Send>;

/// Single owner of all portfolio state.
pub struct TradingDesk {
    config: DeskConfig,
    feed: PriceFeed,
    portfolio: Portfolio,
    ledger: TransactionLedger,
    undo: UndoStack,
    queue: OrderQueue,
    history: BalanceHistory,
    store: Option<Box<dyn SnapshotStore>>,
    clock: Clock,
    next_order_id: u64,
}

impl std::fmt::Debug for TradingDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingDesk")
            .field("cash", &Price(self.portfolio.cash()))
            .field("holdings", &self.portfolio.len())
            .field("transactions", &self.ledger.len())
            .field("undo_depth", &self.undo.len())
            .field("pending", &self.queue.pending().count())
            .field("persistent", &self.store.is_some())
            .finish()
    }
}

impl TradingDesk {
    /// Create a desk for a fresh account with no persistence.
    ///
    /// One balance sample is recorded for the starting cash.
    pub fn new(config: DeskConfig, feed: PriceFeed) -> Self {
        let cash = config.initial_cash;
        let mut desk = Self::from_snapshot(config, feed, Snapshot::fresh(cash));
        desk.record_balance();
        desk
    }

    /// Open a desk backed by `store`.
    ///
    /// Loads the stored snapshot, or starts a fresh account and saves it
    /// immediately when none exists. A balance sample is recorded either way.
    pub fn open(config: DeskConfig, feed: PriceFeed, store: Box<dyn SnapshotStore>) -> Result<Self> {
        let loaded = store
            .load()
            .map_err(|e| DeskError::Persistence(e.to_string()))?;

        let (snapshot, fresh) = match loaded {
            Some(snapshot) => {
                let snapshot = checked(snapshot)?;
                info!(
                    "loaded snapshot: cash {}, {} holdings, {} transactions",
                    Price(snapshot.portfolio.cash()),
                    snapshot.portfolio.len(),
                    snapshot.transactions.len()
                );
                (snapshot, false)
            }
            None => {
                info!("no snapshot found; starting with {}", Price(config.initial_cash));
                (Snapshot::fresh(config.initial_cash), true)
            }
        };

        let mut desk = Self::from_snapshot(config, feed, snapshot);
        desk.store = Some(store);
        if fresh {
            desk.persist();
        }
        desk.record_balance();
        Ok(desk)
    }

    fn from_snapshot(config: DeskConfig, feed: PriceFeed, snapshot: Snapshot) -> Self {
        Self {
            undo: UndoStack::with_capacity(config.undo_capacity),
            history: BalanceHistory::from_samples(config.history_capacity, snapshot.balance_history),
            ledger: TransactionLedger::from_transactions(snapshot.transactions),
            portfolio: snapshot.portfolio,
            queue: OrderQueue::new(),
            store: None,
            clock: Box::new(Utc::now),
            next_order_id: 1,
            config,
            feed,
        }
    }

    /// Replace the wall clock used for timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    // === Queries ===

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    pub fn feed(&self) -> &PriceFeed {
        &self.feed
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    pub fn queue(&self) -> &OrderQueue {
        &self.queue
    }

    pub fn history(&self) -> &BalanceHistory {
        &self.history
    }

    /// Current time on the desk clock.
    pub fn now(&self) -> Timestamp {
        (self.clock)()
    }

    /// Market value of all holdings at current prices (cents).
    pub fn market_value(&self) -> i64 {
        self.portfolio.market_value(self.feed.lookup())
    }

    /// Cash plus market value (cents).
    pub fn total_value(&self) -> i64 {
        self.portfolio.total_value(self.feed.lookup())
    }

    /// Cash not committed to pending buys (cents).
    pub fn available_cash(&self) -> i64 {
        self.portfolio.cash().saturating_sub(self.queue.reserved_cash())
    }

    /// Shares of `symbol` not committed to pending sells.
    pub fn available_shares(&self, symbol: &Symbol) -> Quantity {
        self.portfolio
            .quantity(symbol)
            .saturating_sub(self.queue.reserved_shares(symbol))
    }

    /// State as it would be saved.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            portfolio: self.portfolio.clone(),
            transactions: self.ledger.entries().to_vec(),
            balance_history: self.history.samples(),
        }
    }

    // === Order flow ===

    /// Validate a trade intent and price it at the current quote.
    ///
    /// Nothing is enqueued; pass the result to [`submit`](Self::submit) once
    /// the user confirms.
    pub fn quote(&self, side: Side, symbol: Symbol, quantity: Quantity) -> Result<OrderRequest> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity.into());
        }
        let price = self.feed.require(&symbol)?;
        let request = OrderRequest {
            side,
            symbol,
            quantity,
            price,
            quoted_at: self.now(),
        };
        self.check_available(&request)?;
        Ok(request)
    }

    /// Confirm a quoted request: re-validate and enqueue it as `Pending`.
    pub fn submit(&mut self, request: OrderRequest) -> Result<OrderId> {
        if let Err(e) = self.check_available(&request) {
            warn!(
                "rejected {} {} {} @ {}: {e}",
                request.side, request.quantity, request.symbol, request.price
            );
            return Err(e);
        }
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        self.queue.enqueue(Order {
            id,
            side: request.side,
            symbol: request.symbol,
            quantity: request.quantity,
            price: request.price,
            submitted_at: self.now(),
            status: OrderStatus::Pending,
        });
        info!(
            "order {id} confirmed: {} {} {} @ {}",
            request.side, request.quantity, request.symbol, request.price
        );
        Ok(id)
    }

    /// Quote and submit in one step.
    pub fn confirm(&mut self, side: Side, symbol: Symbol, quantity: Quantity) -> Result<OrderId> {
        let request = self.quote(side, symbol, quantity)?;
        self.submit(request)
    }

    fn check_available(&self, request: &OrderRequest) -> Result<()> {
        match request.side {
            Side::Buy => self.portfolio.check_buy(
                request.quantity,
                request.price,
                self.queue.reserved_cash(),
            ),
            Side::Sell => self.portfolio.check_sell(
                &request.symbol,
                request.quantity,
                request.price,
                self.queue.reserved_shares(&request.symbol),
            ),
        }
    }

    /// Execute the oldest pending order, if any.
    pub fn execute_next(&mut self) -> Result<Option<Transaction>> {
        let Some(id) = self.queue.next_pending().map(|o| o.id) else {
            return Ok(None);
        };
        self.execute(id).map(Some)
    }

    /// Execute every pending order in submission order.
    pub fn execute_all(&mut self) -> Result<Vec<Transaction>> {
        let mut executed = Vec::new();
        while let Some(tx) = self.execute_next()? {
            executed.push(tx);
        }
        Ok(executed)
    }

    /// Execute a pending order at its confirmed price.
    ///
    /// Applies the trade, appends the transaction, pushes an undo entry,
    /// records a balance sample and saves, as one step.
    pub fn execute(&mut self, id: OrderId) -> Result<Transaction> {
        let order = self.queue.get(id).cloned().ok_or(DeskError::UnknownOrder(id))?;
        if order.status != OrderStatus::Pending {
            return Err(DeskError::OrderNotPending(id));
        }

        let now = self.now();
        let prior_avg_cost = self
            .portfolio
            .holding(&order.symbol)
            .map_or(0.0, |h| h.avg_cost);
        let mut tx = Transaction::trade(order.side, order.symbol, order.quantity, order.price, now)?;

        match order.side {
            Side::Buy => self
                .portfolio
                .apply_buy(order.symbol, order.quantity, order.price)?,
            Side::Sell => {
                let avg = self
                    .portfolio
                    .apply_sell(order.symbol, order.quantity, order.price)?;
                tx = tx.with_cost_basis(avg);
            }
        }
        self.queue.mark_executed(id)?;
        self.ledger.append(tx.clone());
        self.undo.push(UndoEntry {
            side: order.side,
            symbol: order.symbol,
            quantity: order.quantity,
            price: order.price,
            timestamp: now,
            prior_avg_cost,
        });
        info!(
            "order {id} executed: {} {} {} @ {}; cash {}",
            order.side,
            order.quantity,
            order.symbol,
            order.price,
            Price(self.portfolio.cash())
        );
        self.record_balance();
        Ok(tx)
    }

    // === Undo ===

    /// Reverse the most recent executed trade.
    ///
    /// The reversal is fully validated before the undo stack is popped: on
    /// any error the stack and portfolio are unchanged. The undo is logged as
    /// an `UNDO` transaction and cannot itself be undone.
    pub fn undo(&mut self) -> Result<Transaction> {
        let entry = self.undo.peek().cloned().ok_or(DeskError::NothingToUndo)?;
        let now = self.now();
        let tx = Transaction::undo(entry.side, entry.symbol, entry.quantity, entry.price, now)?;

        // the reversal trades the opposite side at the original price
        match entry.side.opposite() {
            Side::Sell => {
                let available = self.available_shares(&entry.symbol);
                if available < entry.quantity {
                    let err = DeskError::Corruption(format!(
                        "cannot undo buy of {} {}: only {available} shares available",
                        entry.quantity, entry.symbol
                    ));
                    warn!("{err}");
                    return Err(err);
                }
            }
            Side::Buy => {
                if let Err(e) =
                    self.portfolio
                        .check_buy(entry.quantity, entry.price, self.queue.reserved_cash())
                {
                    warn!("cannot undo sell of {} {}: {e}", entry.quantity, entry.symbol);
                    return Err(e);
                }
            }
        }

        self.portfolio.reverse(
            entry.side,
            entry.symbol,
            entry.quantity,
            entry.price,
            entry.prior_avg_cost,
        )?;
        self.undo.pop();
        self.ledger.append(tx.clone());
        info!(
            "undid {} of {} {} @ {}; cash {}",
            entry.side,
            entry.quantity,
            entry.symbol,
            entry.price,
            Price(self.portfolio.cash())
        );
        self.record_balance();
        Ok(tx)
    }

    // === Prices and balance ===

    /// Advance the price feed one random-walk step.
    ///
    /// Pending orders keep their confirmed prices.
    pub fn tick_prices<R: Rng>(&mut self, rng: &mut R) {
        self.feed.tick(rng);
    }

    /// Overwrite one quoted price.
    pub fn set_price(&mut self, symbol: &Symbol, price: Price) -> Result<()> {
        self.feed.set_price(symbol, price)?;
        Ok(())
    }

    /// Sample `cash + market value` into the balance history and save.
    pub fn record_balance(&mut self) -> BalanceSample {
        let sample = BalanceSample {
            time: self.now(),
            value: self.total_value(),
        };
        self.history.add_sample(sample);
        self.persist();
        sample
    }

    /// Save a snapshot to the store, if any.
    ///
    /// Failures are logged; in-memory state is never rolled back.
    fn persist(&mut self) {
        if self.store.is_none() {
            return;
        }
        let snapshot = self.snapshot();
        if let Some(store) = self.store.as_mut() {
            if let Err(e) = store.save(&snapshot) {
                error!("failed to save snapshot: {e}");
            }
        }
    }
}

/// Reject snapshots whose portfolio breaks the cash/holding invariants or
/// whose ledger holds entries no trade could have produced.
fn checked(snapshot: Snapshot) -> Result<Snapshot> {
    for (i, tx) in snapshot.transactions.iter().enumerate() {
        tx.validate()
            .map_err(|e| DeskError::Corruption(format!("transaction {i}: {e}")))?;
    }
    let portfolio = Portfolio::from_parts(
        snapshot.portfolio.cash(),
        snapshot.portfolio.holdings().cloned(),
    )?;
    Ok(Snapshot {
        portfolio,
        ..snapshot
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionKind;
    use crate::snapshot::{MemoryStore, SnapshotError};

    fn aapl() -> Symbol {
        Symbol::new("AAPL")
    }

    fn desk() -> TradingDesk {
        let mut feed = PriceFeed::default_universe();
        feed.set_price(&aapl(), Price(180_00)).unwrap();
        TradingDesk::new(DeskConfig::default(), feed)
    }

    #[test]
    fn default_config_is_valid() {
        let config = DeskConfig::default();
        assert_eq!(config.initial_cash, 10_000_00);
        assert_eq!(config.undo_capacity, 50);
        assert_eq!(config.history_capacity, 100);
        assert!(config.validate().is_ok());

        let bad = DeskConfig {
            undo_capacity: 0,
            ..DeskConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = DeskConfig {
            initial_cash: -1,
            ..DeskConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn new_desk_records_starting_balance() {
        let d = desk();
        assert_eq!(d.portfolio().cash(), 10_000_00);
        assert_eq!(d.history().len(), 1);
        assert_eq!(d.history().latest().map(|s| s.value), Some(10_000_00));
    }

    #[test]
    fn quote_validates() {
        let d = desk();
        assert_eq!(
            d.quote(Side::Buy, aapl(), 0),
            Err(DeskError::Validation(ValidationError::ZeroQuantity))
        );
        assert_eq!(
            d.quote(Side::Buy, Symbol::new("IBM"), 1),
            Err(DeskError::Validation(ValidationError::UnknownSymbol(Symbol::new("IBM"))))
        );
        assert!(matches!(
            d.quote(Side::Sell, aapl(), 1),
            Err(DeskError::InsufficientShares { held: 0, .. })
        ));
        let req = d.quote(Side::Buy, aapl(), 10).unwrap();
        assert_eq!(req.price, Price(180_00));
        assert_eq!(req.notional(), 1_800_00);
    }

    #[test]
    fn execution_uses_confirmed_price() {
        let mut d = desk();
        d.confirm(Side::Buy, aapl(), 10).unwrap();
        d.set_price(&aapl(), Price(999_00)).unwrap();
        let tx = d.execute_next().unwrap().unwrap();
        assert_eq!(tx.price, Price(180_00));
        assert_eq!(d.portfolio().cash(), 8_200_00);
    }

    #[test]
    fn pending_orders_reserve_cash() {
        let mut d = desk();
        d.confirm(Side::Buy, aapl(), 40).unwrap(); // $7,200
        let err = d.confirm(Side::Buy, aapl(), 20).unwrap_err(); // $3,600 > $2,800 left
        assert!(matches!(err, DeskError::InsufficientFunds { .. }));
        assert_eq!(d.available_cash(), 2_800_00);
        assert_eq!(d.queue().len(), 1);
    }

    #[test]
    fn pending_orders_reserve_shares() {
        let mut d = desk();
        d.confirm(Side::Buy, aapl(), 10).unwrap();
        d.execute_all().unwrap();
        d.confirm(Side::Sell, aapl(), 7).unwrap();
        assert_eq!(d.available_shares(&aapl()), 3);
        assert!(d.confirm(Side::Sell, aapl(), 4).is_err());
        assert!(d.confirm(Side::Sell, aapl(), 3).is_ok());
    }

    #[test]
    fn oversized_quantities_are_rejected() {
        let mut d = desk();
        d.confirm(Side::Buy, aapl(), 1).unwrap();
        d.execute_all().unwrap();
        let before = d.portfolio().clone();

        for qty in [u64::MAX, 1_000_000_000_000_000, i64::MAX as u64 / 180_00 + 1] {
            assert_eq!(
                d.confirm(Side::Buy, aapl(), qty),
                Err(DeskError::Validation(ValidationError::QuantityTooLarge(qty)))
            );
            assert_eq!(
                d.confirm(Side::Sell, aapl(), qty),
                Err(DeskError::Validation(ValidationError::QuantityTooLarge(qty)))
            );
        }
        // representable but unaffordable
        assert!(matches!(
            d.confirm(Side::Buy, aapl(), 1_000_000),
            Err(DeskError::InsufficientFunds { .. })
        ));

        assert_eq!(d.portfolio(), &before);
        assert!(d.queue().pending().next().is_none());
        assert_eq!(d.execute_all().unwrap().len(), 0);
        assert_eq!(d.portfolio().cash(), 10_000_00 - 180_00);
    }

    #[test]
    fn execute_is_exactly_once() {
        let mut d = desk();
        let id = d.confirm(Side::Buy, aapl(), 1).unwrap();
        d.execute(id).unwrap();
        assert_eq!(d.execute(id), Err(DeskError::OrderNotPending(id)));
        assert_eq!(d.execute(OrderId(77)), Err(DeskError::UnknownOrder(OrderId(77))));
        assert_eq!(d.execute_next(), Ok(None));
    }

    #[test]
    fn undo_empty() {
        let mut d = desk();
        assert_eq!(d.undo(), Err(DeskError::NothingToUndo));
        assert_eq!(d.ledger().len(), 0);
    }

    #[test]
    fn undo_buy_blocked_by_pending_sell() {
        let mut d = desk();
        d.confirm(Side::Buy, aapl(), 10).unwrap();
        d.execute_all().unwrap();
        d.confirm(Side::Sell, aapl(), 5).unwrap();

        let before = d.portfolio().clone();
        assert!(matches!(d.undo(), Err(DeskError::Corruption(_))));
        assert_eq!(d.portfolio(), &before);
        assert_eq!(d.undo_stack().len(), 1);
    }

    #[test]
    fn undo_sell_blocked_by_pending_buy() {
        let mut d = desk();
        d.confirm(Side::Buy, aapl(), 50).unwrap(); // $9,000
        d.execute_all().unwrap();
        d.confirm(Side::Sell, aapl(), 50).unwrap();
        d.execute_all().unwrap();
        assert_eq!(d.portfolio().cash(), 10_000_00);

        // buy-back needs $9,000 but a pending order holds most of the cash
        d.confirm(Side::Buy, Symbol::new("MSFT"), 24).unwrap();
        let before = d.portfolio().clone();
        assert!(matches!(d.undo(), Err(DeskError::InsufficientFunds { .. })));
        assert_eq!(d.portfolio(), &before);
        assert_eq!(d.undo_stack().len(), 2);

        d.execute_all().unwrap();
        assert_eq!(d.undo_stack().len(), 3);
    }

    #[test]
    fn undo_logs_transaction() {
        let mut d = desk();
        d.confirm(Side::Buy, aapl(), 2).unwrap();
        d.execute_all().unwrap();
        let tx = d.undo().unwrap();
        assert_eq!(tx.kind, TransactionKind::Undo);
        assert_eq!(tx.reverses, Some(Side::Buy));
        assert_eq!(d.ledger().len(), 2);
        assert!(d.undo_stack().is_empty());
        assert_eq!(d.portfolio().cash(), 10_000_00);
        assert!(d.portfolio().is_empty());
    }

    #[test]
    fn open_fresh_store_persists_immediately() {
        let store = MemoryStore::new();
        let d = TradingDesk::open(
            DeskConfig::default(),
            PriceFeed::default_universe(),
            Box::new(store.clone()),
        )
        .unwrap();
        let saved = store.current().unwrap();
        assert_eq!(saved.portfolio.cash(), 10_000_00);
        assert_eq!(saved.balance_history.len(), 1);
        assert_eq!(d.history().len(), 1);
    }

    struct BrokenStore;

    impl SnapshotStore for BrokenStore {
        fn load(&self) -> std::result::Result<Option<Snapshot>, SnapshotError> {
            Ok(None)
        }

        fn save(&mut self, _: &Snapshot) -> std::result::Result<(), SnapshotError> {
            Err(SnapshotError::Invalid("disk full".into()))
        }
    }

    #[test]
    fn save_failure_keeps_mutation() {
        let mut d = TradingDesk::open(
            DeskConfig::default(),
            PriceFeed::default_universe(),
            Box::new(BrokenStore),
        )
        .unwrap();
        d.confirm(Side::Buy, aapl(), 1).unwrap();
        d.execute_all().unwrap();
        assert_eq!(d.portfolio().quantity(&aapl()), 1);
    }
}
