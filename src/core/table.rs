//! Thread-safe in-memory table
//!
//! [`Table`] is the storage primitive behind the ledger store: a `DashMap` keyed
//! by a store-assigned id plus an atomic counter handing out the next id.
//!
//! # Thread Safety
//!
//! All operations are safe to call concurrently. `update` runs its closure
//! while holding the entry's shard lock, so a single-row read-modify-write is
//! atomic. Multi-row atomicity is the engine's job (see `core::locks`).

use crate::core::traits::Record;
use crate::types::LedgerError;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug)]
pub struct Table<T: Record> {
    rows: DashMap<u32, T>,
    next_id: AtomicU32,
}

impl<T: Record> Table<T> {
    /// Create an empty table whose first id is 1
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicU32::new(1),
        }
    }

    /// Assign the next id, build the row with it and store it
    pub fn insert_with<F>(&self, build: F) -> T
    where
        F: FnOnce(u32) -> T,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    /// Clone of the row, if present
    pub fn get(&self, id: u32) -> Option<T> {
        self.rows.get(&id).map(|entry| entry.value().clone())
    }

    /// Like [`Table::get`] but with a `NotFound` error naming the entity
    pub fn require(&self, id: u32) -> Result<T, LedgerError> {
        self.get(id)
            .ok_or_else(|| LedgerError::not_found(T::ENTITY, id))
    }

    /// Modify a row in place and return the updated copy
    ///
    /// The row is left untouched when the closure fails.
    pub fn update<F>(&self, id: u32, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut T) -> Result<(), LedgerError>,
    {
        let mut entry = self
            .rows
            .get_mut(&id)
            .ok_or_else(|| LedgerError::not_found(T::ENTITY, id))?;
        let mut draft = entry.value().clone();
        f(&mut draft)?;
        *entry.value_mut() = draft.clone();
        Ok(draft)
    }

    /// Rows matching the predicate, ordered by id
    pub fn filter<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        let mut rows: Vec<T> = self
            .rows
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|row| row.id());
        rows
    }

    /// First row (by id) matching the predicate
    pub fn find<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        self.filter(predicate).into_iter().next()
    }

    pub fn all(&self) -> Vec<T> {
        self.filter(|_| true)
    }

    pub fn remove(&self, id: u32) -> Option<T> {
        self.rows.remove(&id).map(|(_, row)| row)
    }

    /// Insert a row under its own id, moving the counter past it
    ///
    /// Used for static reference data whose ids are fixed.
    pub fn put(&self, row: T) {
        let id = row.id();
        self.next_id.fetch_max(id + 1, Ordering::SeqCst);
        self.rows.insert(id, row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T: Record> Default for Table<T> {
    fn default() -> Self {
        Self::new()
    }
}
