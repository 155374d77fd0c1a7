//! Per-account serialization
//!
//! Every mutation operation runs inside [`AccountLocks::with_locked`] for the
//! accounts it touches. Locks are taken in ascending account id order, so two
//! operations over overlapping account sets can never deadlock.

use crate::types::AccountId;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One mutex per account, created on first use
#[derive(Debug, Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the locks of every account in `ids`
    ///
    /// Duplicates are ignored. A lock poisoned by a panicking holder is
    /// recovered; it guards no data of its own.
    pub fn with_locked<R, F>(&self, ids: &[AccountId], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let mut ordered = ids.to_vec();
        ordered.sort_unstable();
        ordered.dedup();

        // Clone the Arcs first so no DashMap shard lock is held while waiting
        let mutexes: Vec<Arc<Mutex<()>>> = ordered
            .iter()
            .map(|id| Arc::clone(self.locks.entry(*id).or_default().value()))
            .collect();

        let _guards: Vec<MutexGuard<'_, ()>> = mutexes
            .iter()
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
            .collect();

        f()
    }

    /// Number of accounts that have been locked at least once
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
