//! Transaction ledger: append-only record of executed trades and undos.
//!
//! Entries are stored in append order. A chronological view (newest first) is
//! re-derived with the stable [`merge_sort_by`] after every append, so
//! transactions sharing a timestamp keep their append order. The ledger is
//! expected to hold hundreds of entries, where the O(n log n) rebuild is
//! negligible.

use std::cmp::Ordering;
use std::io;

use chrono::Duration;

use crate::error::ValidationError;
use crate::ranking::{merge_sort_by, mode};
use crate::side::Side;
use crate::types::{Price, Quantity, Symbol, Timestamp};

/// Kind of ledger entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum TransactionKind {
    Buy,
    Sell,
    Undo,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Buy => "BUY",
            TransactionKind::Sell => "SELL",
            TransactionKind::Undo => "UNDO",
        }
    }

    /// Parse `buy`/`sell`/`undo` in any case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Some(TransactionKind::Buy),
            "SELL" => Some(TransactionKind::Sell),
            "UNDO" => Some(TransactionKind::Undo),
            _ => None,
        }
    }
}

impl From<Side> for TransactionKind {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => TransactionKind::Buy,
            Side::Sell => TransactionKind::Sell,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An executed trade or undo. Immutable once appended.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Transaction {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: TransactionKind,
    pub symbol: Symbol,
    #[cfg_attr(feature = "serde", serde(rename = "qty"))]
    pub quantity: Quantity,
    pub price: Price,
    #[cfg_attr(feature = "serde", serde(rename = "time"))]
    pub timestamp: Timestamp,
    /// Average cost of the shares sold (cents); SELL entries only.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub cost_basis: Option<f64>,
    /// Side of the trade that was reversed; UNDO entries only.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub reverses: Option<Side>,
}

impl Transaction {
    /// Record an executed buy or sell.
    pub fn trade(
        side: Side,
        symbol: Symbol,
        quantity: Quantity,
        price: Price,
        timestamp: Timestamp,
    ) -> Result<Self, ValidationError> {
        validate(quantity, price)?;
        Ok(Self {
            kind: side.into(),
            symbol,
            quantity,
            price,
            timestamp,
            cost_basis: None,
            reverses: None,
        })
    }

    /// Record the reversal of an earlier `side` trade.
    pub fn undo(
        side: Side,
        symbol: Symbol,
        quantity: Quantity,
        price: Price,
        timestamp: Timestamp,
    ) -> Result<Self, ValidationError> {
        validate(quantity, price)?;
        Ok(Self {
            kind: TransactionKind::Undo,
            symbol,
            quantity,
            price,
            timestamp,
            cost_basis: None,
            reverses: Some(side),
        })
    }

    /// Re-check an entry built outside [`trade`](Self::trade) and
    /// [`undo`](Self::undo), e.g. one read back from a snapshot.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate(self.quantity, self.price)?;
        if self.symbol.as_str().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        let reverses_ok = match self.kind {
            TransactionKind::Undo => self.reverses.is_some(),
            TransactionKind::Buy | TransactionKind::Sell => self.reverses.is_none(),
        };
        if !reverses_ok {
            return Err(ValidationError::MalformedTransaction(format!(
                "{} entry for {} has inconsistent reversal side",
                self.kind, self.symbol
            )));
        }
        if self.cost_basis.is_some_and(|c| !c.is_finite() || c < 0.0) {
            return Err(ValidationError::MalformedTransaction(format!(
                "{} entry for {} has invalid cost basis",
                self.kind, self.symbol
            )));
        }
        Ok(())
    }

    /// Attach the average cost of the shares sold.
    pub fn with_cost_basis(mut self, avg_cost: f64) -> Self {
        self.cost_basis = Some(avg_cost);
        self
    }

    /// Notional value: price × quantity (cents).
    #[inline]
    pub fn amount(&self) -> i64 {
        self.price.saturating_notional(self.quantity)
    }

    /// For SELL entries with a recorded cost basis: whether the sale price
    /// exceeded the average cost.
    pub fn is_profitable_sell(&self) -> Option<bool> {
        if self.kind != TransactionKind::Sell {
            return None;
        }
        self.cost_basis.map(|avg| self.price.0 as f64 > avg)
    }
}

fn validate(quantity: Quantity, price: Price) -> Result<(), ValidationError> {
    if quantity == 0 {
        return Err(ValidationError::ZeroQuantity);
    }
    if price.0 <= 0 {
        return Err(ValidationError::ZeroPrice);
    }
    if price.notional(quantity).is_none() {
        return Err(ValidationError::QuantityTooLarge(quantity));
    }
    Ok(())
}

/// Append-only transaction log with a cached chronological view.
#[derive(Clone, Debug, Default)]
pub struct TransactionLedger {
    entries: Vec<Transaction>,
    /// Indices into `entries`, newest first; ties keep append order.
    chronological: Vec<usize>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from stored transactions, in their stored order.
    pub fn from_transactions(entries: Vec<Transaction>) -> Self {
        let mut ledger = Self {
            entries,
            chronological: Vec::new(),
        };
        ledger.reindex();
        ledger
    }

    /// Append a transaction and refresh the chronological view.
    pub fn append(&mut self, tx: Transaction) {
        self.entries.push(tx);
        self.reindex();
    }

    fn reindex(&mut self) {
        let indices: Vec<usize> = (0..self.entries.len()).collect();
        let entries = &self.entries;
        self.chronological = merge_sort_by(&indices, |&a, &b| {
            entries[b].timestamp.cmp(&entries[a].timestamp)
        });
    }

    /// All transactions in append order.
    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    /// All transactions, newest first. Equal timestamps keep append order.
    pub fn chronological(&self) -> impl Iterator<Item = &Transaction> {
        self.chronological.iter().map(|&i| &self.entries[i])
    }

    /// The last `k` appended transactions, most recent first.
    pub fn recent(&self, k: usize) -> Vec<&Transaction> {
        self.entries.iter().rev().take(k).collect()
    }

    /// Transactions matching `predicate`, in append order.
    pub fn filter(&self, predicate: impl Fn(&Transaction) -> bool) -> Vec<&Transaction> {
        self.entries.iter().filter(|tx| predicate(tx)).collect()
    }

    /// Transactions matching `filter` relative to `now`, in append order.
    pub fn query(&self, filter: &TransactionFilter, now: Timestamp) -> Vec<&Transaction> {
        self.filter(|tx| filter.matches(tx, now))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Time window for history filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    All,
    /// Same UTC calendar day as `now`.
    Today,
    /// Within the last 7 days.
    Week,
    /// Within the last 30 days.
    Month,
}

impl DateRange {
    pub fn contains(self, ts: Timestamp, now: Timestamp) -> bool {
        match self {
            DateRange::All => true,
            DateRange::Today => ts.date_naive() == now.date_naive(),
            DateRange::Week => ts >= now - Duration::days(7),
            DateRange::Month => ts >= now - Duration::days(30),
        }
    }
}

/// Criteria for the history view. Empty criteria match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Case-insensitive substring of the symbol.
    pub symbol: Option<String>,
    pub kind: Option<TransactionKind>,
    pub range: DateRange,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction, now: Timestamp) -> bool {
        if let Some(needle) = &self.symbol {
            let needle = needle.trim().to_ascii_uppercase();
            if !needle.is_empty() && !tx.symbol.as_str().contains(&needle) {
                return false;
            }
        }
        if self.kind.is_some_and(|k| k != tx.kind) {
            return false;
        }
        self.range.contains(tx.timestamp, now)
    }
}

// ---------------------------------------------------------------------------
// Sorting
// ---------------------------------------------------------------------------

/// Sort orders offered by the history view.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    Symbol,
    Type,
    AmountDesc,
}

impl SortKey {
    pub fn compare(self, a: &Transaction, b: &Transaction) -> Ordering {
        match self {
            SortKey::DateDesc => b.timestamp.cmp(&a.timestamp),
            SortKey::DateAsc => a.timestamp.cmp(&b.timestamp),
            SortKey::Symbol => a.symbol.cmp(&b.symbol),
            SortKey::Type => a.kind.as_str().cmp(b.kind.as_str()),
            SortKey::AmountDesc => b.amount().cmp(&a.amount()),
        }
    }
}

/// Stable sort of a transaction view by `key`.
pub fn sort_transactions<'a>(items: &[&'a Transaction], key: SortKey) -> Vec<&'a Transaction> {
    merge_sort_by(items, |a, b| key.compare(a, b))
}

// ---------------------------------------------------------------------------
// Statistics and paging
// ---------------------------------------------------------------------------

/// Summary counts over a set of transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerStats {
    pub total: usize,
    pub buys: usize,
    pub sells: usize,
    pub undos: usize,
    /// Symbol appearing in the most transactions.
    pub most_traded: Option<Symbol>,
    /// Total shares across all transactions.
    pub total_volume: Quantity,
}

pub fn ledger_stats(items: &[&Transaction]) -> LedgerStats {
    let count = |kind| items.iter().filter(|tx| tx.kind == kind).count();
    LedgerStats {
        total: items.len(),
        buys: count(TransactionKind::Buy),
        sells: count(TransactionKind::Sell),
        undos: count(TransactionKind::Undo),
        most_traded: mode(items.iter().map(|tx| tx.symbol)),
        total_volume: items.iter().map(|tx| tx.quantity).sum(),
    }
}

/// Number of pages needed for `len` items.
pub fn page_count(len: usize, per_page: usize) -> usize {
    if per_page == 0 {
        return 0;
    }
    len.div_ceil(per_page)
}

/// The 1-based `page` of `items`. Out-of-range pages are empty.
pub fn page<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    if page == 0 || per_page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(per_page);
    if start >= items.len() {
        return &[];
    }
    let end = (start + per_page).min(items.len());
    &items[start..end]
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write transactions as CSV with a header row.
///
/// Columns: Date, Time, Type, Symbol, Quantity, Price, Total Amount.
/// Money columns are in dollars with two decimals.
pub fn write_csv<W: io::Write>(writer: W, items: &[&Transaction]) -> csv::Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record([
        "Date",
        "Time",
        "Type",
        "Symbol",
        "Quantity",
        "Price",
        "Total Amount",
    ])?;
    for tx in items {
        out.write_record([
            tx.timestamp.format("%Y-%m-%d").to_string(),
            tx.timestamp.format("%H:%M:%S").to_string(),
            tx.kind.to_string(),
            tx.symbol.to_string(),
            tx.quantity.to_string(),
            format!("{:.2}", tx.price.as_dollars()),
            format!("{:.2}", tx.amount() as f64 / 100.0),
        ])?;
    }
    out.flush()?;
    Ok(())
}
