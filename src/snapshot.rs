//! Snapshot persistence: the whole desk state saved and loaded as one unit.
//!
//! A [`Snapshot`] holds the portfolio, the full transaction ledger and the
//! balance history. Stores implement [`SnapshotStore`]; [`MemoryStore`] keeps
//! the last snapshot in memory and [`JsonFileStore`] writes pretty-printed JSON
//! (requires the `persistence` feature):
//!
//! ```json
//! {
//!   "portfolio": { "cash": 820000, "stocks": { "AAPL": { "qty": 10, "avg": 18000.0 } } },
//!   "transactions": [ { "type": "BUY", "symbol": "AAPL", "qty": 10, "price": 18000, "time": "..." } ],
//!   "balanceHistory": [ { "time": "...", "value": 1000000 } ]
//! }
//! ```
//!
//! Money fields are integer cents.

use std::sync::{Arc, Mutex};

use crate::history::BalanceSample;
use crate::ledger::Transaction;
use crate::portfolio::Portfolio;

/// Errors from loading or saving a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "persistence")]
    #[error("snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

/// Persisted desk state.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Snapshot {
    pub portfolio: Portfolio,
    #[cfg_attr(feature = "serde", serde(default))]
    pub transactions: Vec<Transaction>,
    /// Samples oldest first.
    #[cfg_attr(feature = "serde", serde(default))]
    pub balance_history: Vec<BalanceSample>,
}

impl Snapshot {
    /// A fresh account: only cash, nothing recorded yet.
    pub fn fresh(initial_cash: i64) -> Self {
        Self {
            portfolio: Portfolio::new(initial_cash),
            transactions: Vec::new(),
            balance_history: Vec::new(),
        }
    }
}

/// Somewhere a [`Snapshot`] can be loaded from and saved to.
pub trait SnapshotStore: Send {
    /// The last saved snapshot, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError>;

    /// Replace the stored snapshot.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError>;
}

/// In-memory store. Clones share the same slot, so a caller can keep a handle
/// to inspect what a desk saved.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Snapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(snapshot))),
        }
    }

    /// Copy of the stored snapshot.
    pub fn current(&self) -> Option<Snapshot> {
        self.slot.lock().ok().and_then(|s| s.clone())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let slot = self
            .slot
            .lock()
            .map_err(|_| SnapshotError::Invalid("memory store lock poisoned".into()))?;
        Ok(slot.clone())
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| SnapshotError::Invalid("memory store lock poisoned".into()))?;
        *slot = Some(snapshot.clone());
        Ok(())
    }
}

#[cfg(feature = "persistence")]
pub use file::JsonFileStore;

#[cfg(feature = "persistence")]
mod file {
    use std::fs;
    use std::io::{self, Write};
    use std::path::{Path, PathBuf};

    use super::{Snapshot, SnapshotError, SnapshotStore};

    /// Snapshot saved as pretty-printed JSON at a fixed path.
    ///
    /// Writes go to a sibling temporary file which is then renamed over the
    /// target, so a crash mid-save leaves the previous snapshot intact.
    #[derive(Clone, Debug)]
    pub struct JsonFileStore {
        path: PathBuf,
    }

    impl JsonFileStore {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl SnapshotStore for JsonFileStore {
        fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
            let text = match fs::read_to_string(&self.path) {
                Ok(text) => text,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            if text.trim().is_empty() {
                return Ok(None);
            }
            Ok(Some(serde_json::from_str(&text)?))
        }

        fn save(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let tmp = self.path.with_extension("json.tmp");
            {
                let file = fs::File::create(&tmp)?;
                let mut writer = io::BufWriter::new(file);
                serde_json::to_writer_pretty(&mut writer, snapshot)?;
                writeln!(writer)?;
                writer.flush()?;
            }
            fs::rename(&tmp, &self.path)?;
            Ok(())
        }
    }
}
