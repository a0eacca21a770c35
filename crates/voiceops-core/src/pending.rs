//! Staging area for plans awaiting human confirmation.
//!
//! Entries live only as long as the process. `consume` is the single exit
//! path: whichever confirm/reject call removes an entry first wins, and every
//! later call observes it as absent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;

use crate::context::ContextBundle;
use crate::error::{Result, VoiceOpsError};
use crate::plan::Plan;
use crate::types::IntentResult;

// ---------------------------------------------------------------------------
// PendingEntry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PendingEntry {
    pub transcript: String,
    pub intent: IntentResult,
    pub context: ContextBundle,
    pub plan: Plan,
    pub staged_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// PendingStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait PendingStore: Send + Sync {
    /// Insert `entry` under `id`. Fails if a live entry already exists.
    async fn stage(&self, id: &str, entry: PendingEntry) -> Result<()>;

    async fn peek(&self, id: &str) -> Result<Option<PendingEntry>>;

    /// Atomically remove and return the entry for `id`.
    async fn consume(&self, id: &str) -> Result<Option<PendingEntry>>;

    async fn len(&self) -> usize;
}

// ---------------------------------------------------------------------------
// InMemoryPendingStore
// ---------------------------------------------------------------------------

/// [`PendingStore`] backed by a sharded concurrent map.
///
/// With `max_age` unset (the default) entries never expire. When set, an
/// entry older than the limit reads as absent and is dropped on access.
#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    entries: DashMap<String, PendingEntry>,
    max_age: Option<Duration>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(max_age: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            max_age,
        }
    }

    fn is_expired(&self, entry: &PendingEntry) -> bool {
        let Some(max_age) = self.max_age else {
            return false;
        };
        let age = Utc::now().signed_duration_since(entry.staged_at);
        age.to_std().map(|age| age > max_age).unwrap_or(false)
    }
}

#[async_trait]
impl PendingStore for InMemoryPendingStore {
    async fn stage(&self, id: &str, entry: PendingEntry) -> Result<()> {
        match self.entries.entry(id.to_string()) {
            Entry::Occupied(mut existing) => {
                if self.is_expired(existing.get()) {
                    existing.insert(entry);
                    return Ok(());
                }
                Err(VoiceOpsError::AlreadyStaged(id.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    async fn peek(&self, id: &str) -> Result<Option<PendingEntry>> {
        let entry = self.entries.get(id).map(|e| e.value().clone());
        match entry {
            Some(e) if self.is_expired(&e) => {
                self.entries.remove_if(id, |_, e| self.is_expired(e));
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn consume(&self, id: &str) -> Result<Option<PendingEntry>> {
        match self.entries.remove(id) {
            Some((_, e)) if self.is_expired(&e) => {
                tracing::info!(command_id = id, "dropping expired pending entry");
                Ok(None)
            }
            Some((_, e)) => Ok(Some(e)),
            None => Ok(None),
        }
    }

    async fn len(&self) -> usize {
        self.entries.len()
    }
}
