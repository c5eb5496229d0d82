//! In-memory set of pull requests being watched.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::types::{PrUrl, Sha, TrackedPr};

/// What [`TrackedPrRegistry::track`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// A new entry was created.
    Inserted,
    /// An entry for the URL existed; its head SHA and session id were refreshed.
    Updated,
}

/// Tracked pull requests keyed by PR URL.
///
/// The lock is only held for the duration of a single map operation and never
/// across an `.await`, so a `track` racing a poll cycle is simply picked up by
/// the next cycle.
#[derive(Debug, Default)]
pub struct TrackedPrRegistry {
    entries: Mutex<HashMap<PrUrl, TrackedPr>>,
}

impl TrackedPrRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PrUrl, TrackedPr>> {
        // Every critical section is a single map operation, so a poisoned map
        // is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts `pr`, or refreshes `head_sha` and `session_id` of the existing
    /// entry with the same URL. `added_at` of an existing entry is kept.
    pub fn track(&self, pr: TrackedPr) -> TrackOutcome {
        let mut entries = self.entries();
        match entries.get_mut(&pr.pr_url) {
            Some(existing) => {
                existing.head_sha = pr.head_sha;
                existing.session_id = pr.session_id;
                TrackOutcome::Updated
            }
            None => {
                entries.insert(pr.pr_url.clone(), pr);
                TrackOutcome::Inserted
            }
        }
    }

    /// Sets the head SHA of an existing entry. Returns false, and inserts
    /// nothing, if `pr_url` is not tracked.
    pub fn update_head_sha(&self, pr_url: &PrUrl, head_sha: Sha) -> bool {
        match self.entries().get_mut(pr_url) {
            Some(existing) => {
                existing.head_sha = head_sha;
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `pr_url`. Returns whether anything was removed.
    pub fn untrack(&self, pr_url: &PrUrl) -> bool {
        self.entries().remove(pr_url).is_some()
    }

    /// Snapshot of all entries, oldest first (ties broken by URL).
    pub fn list(&self) -> Vec<TrackedPr> {
        let mut prs: Vec<_> = self.entries().values().cloned().collect();
        prs.sort_by(|a, b| {
            a.added_at
                .cmp(&b.added_at)
                .then_with(|| a.pr_url.cmp(&b.pr_url))
        });
        prs
    }

    pub fn get(&self, pr_url: &PrUrl) -> Option<TrackedPr> {
        self.entries().get(pr_url).cloned()
    }

    pub fn contains(&self, pr_url: &PrUrl) -> bool {
        self.entries().contains_key(pr_url)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
