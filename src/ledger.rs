//! Request ledger: one tracked entry per dispatched call.
//!
//! Entries are never evicted; the ledger grows for the lifetime of the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use strum::{Display, EnumString};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::LedgerError;

/// Lifecycle status of a dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LedgerStatus {
    /// Call registered, response not yet received.
    Pending,
    /// 2xx response received and parsed.
    Success,
    /// Non-2xx status or transport failure.
    Error,
}

/// Tracked record of one dispatched call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    /// Unique, monotonically increasing id.
    pub id: u64,
    /// Resolved path of the call.
    pub route: String,
    /// Base URL the call was sent to.
    pub branch: String,
    /// Current status.
    pub status: LedgerStatus,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last status change.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Entry count per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LedgerCounts {
    /// Pending entries.
    pub pending: usize,
    /// Successful entries.
    pub success: usize,
    /// Failed entries.
    pub error: usize,
}

/// Concurrency-safe registry of dispatched calls.
#[derive(Debug, Default)]
pub struct RequestLedger {
    next_id: AtomicU64,
    entries: DashMap<u64, LedgerEntry>,
}

impl RequestLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new `pending` entry.
    pub fn create(&self, route: impl Into<String>, branch: impl Into<String>) -> LedgerEntry {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = OffsetDateTime::now_utc();
        let entry = LedgerEntry {
            id,
            route: route.into(),
            branch: branch.into(),
            status: LedgerStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.entries.insert(id, entry.clone());
        debug!(id, route = %entry.route, "Ledger entry created");
        entry
    }

    /// Update an entry from a status string.
    ///
    /// Returns `Ok(None)` for an unknown id. An invalid status leaves the entry
    /// untouched.
    pub fn update_status(&self, id: u64, status: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        let status: LedgerStatus = status
            .parse()
            .map_err(|_| LedgerError::InvalidStatus(status.to_string()))?;
        Ok(self.set_status(id, status))
    }

    /// Update an entry's status.
    pub fn set_status(&self, id: u64, status: LedgerStatus) -> Option<LedgerEntry> {
        let mut entry = self.entries.get_mut(&id)?;
        entry.status = status;
        entry.updated_at = OffsetDateTime::now_utc();
        debug!(id, status = %status, "Ledger entry updated");
        Some(entry.clone())
    }

    /// Look up an entry.
    pub fn get(&self, id: u64) -> Option<LedgerEntry> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    /// Snapshot of every entry, ordered by id.
    pub fn list(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> =
            self.entries.iter().map(|e| e.value().clone()).collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    /// Entry count per status.
    pub fn counts(&self) -> LedgerCounts {
        self.entries
            .iter()
            .fold(LedgerCounts::default(), |mut counts, e| {
                match e.status {
                    LedgerStatus::Pending => counts.pending += 1,
                    LedgerStatus::Success => counts.success += 1,
                    LedgerStatus::Error => counts.error += 1,
                }
                counts
            })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no call has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ids_start_at_one_and_increase() {
        let ledger = RequestLedger::new();
        let a = ledger.create("/a", "http://localhost");
        let b = ledger.create("/b", "http://localhost");
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.status, LedgerStatus::Pending);
    }

    #[test]
    fn concurrent_creates_yield_distinct_ids() {
        let ledger = Arc::new(RequestLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || {
                    (0..100)
                        .map(|i| ledger.create(format!("/r/{}/{}", t, i), "http://b").id)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let ids: HashSet<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();

        assert_eq!(ids.len(), 800);
        assert_eq!(ledger.len(), 800);
        assert!(ledger.list().iter().all(|e| e.status == LedgerStatus::Pending));
    }

    #[test]
    fn update_status_accepts_valid_values() {
        let ledger = RequestLedger::new();
        let entry = ledger.create("/a", "http://b");

        let updated = ledger.update_status(entry.id, "success").unwrap().unwrap();
        assert_eq!(updated.status, LedgerStatus::Success);
        assert_eq!(ledger.get(entry.id).unwrap().status, LedgerStatus::Success);
    }

    #[test]
    fn invalid_status_is_rejected_and_entry_unchanged() {
        let ledger = RequestLedger::new();
        let entry = ledger.create("/a", "http://b");

        assert_eq!(
            ledger.update_status(entry.id, "bogus"),
            Err(LedgerError::InvalidStatus("bogus".to_string()))
        );
        assert_eq!(ledger.get(entry.id).unwrap().status, LedgerStatus::Pending);
    }

    #[test]
    fn unknown_id_returns_none() {
        let ledger = RequestLedger::new();
        assert_eq!(ledger.update_status(42, "error"), Ok(None));
    }

    #[test]
    fn counts_group_by_status() {
        let ledger = RequestLedger::new();
        let a = ledger.create("/a", "b");
        let b = ledger.create("/b", "b");
        ledger.create("/c", "b");
        ledger.set_status(a.id, LedgerStatus::Success);
        ledger.set_status(b.id, LedgerStatus::Error);

        assert_eq!(
            ledger.counts(),
            LedgerCounts {
                pending: 1,
                success: 1,
                error: 1
            }
        );
    }
}
