//! Handle table for generator sessions
//!
//! O(1) insert/lookup/remove with stable, never-reused IDs.
//! Each slot has its own lock, so two sessions can be advanced concurrently.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::error::{RisError, RisResult};

/// Default number of slots in the global session table
pub const DEFAULT_CAPACITY: usize = 1024;

struct Slot<T> {
    data: Mutex<Option<T>>,
}

impl<T> Slot<T> {
    fn empty() -> Self {
        Self { data: Mutex::new(None) }
    }
}

/// Fixed-capacity table with per-slot locking
///
/// Insert/remove take the metadata write lock; access to a stored item only
/// takes a read lock on the metadata and the item's own slot lock.
pub struct GeneratorSlab<T> {
    slots: Vec<Slot<T>>,
    meta: RwLock<SlabMeta>,
}

struct SlabMeta {
    /// Indices of empty slots
    free: Vec<usize>,
    /// Next ID to hand out
    next_id: u64,
    id_to_slot: HashMap<u64, usize>,
}

impl<T> GeneratorSlab<T> {
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| Slot::empty()).collect();
        Self {
            slots,
            meta: RwLock::new(SlabMeta {
                free: (0..capacity).rev().collect(),
                next_id: 0,
                id_to_slot: HashMap::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Store `item` and return its ID
    pub fn insert(&self, item: T) -> RisResult<u64> {
        let mut meta = self.meta.write().map_err(|_| RisError::SlabFull)?;
        let slot_idx = meta.free.pop().ok_or(RisError::SlabFull)?;

        let id = meta.next_id;
        meta.next_id += 1;

        match self.slots[slot_idx].data.lock() {
            Ok(mut data) => *data = Some(item),
            Err(_) => {
                meta.free.push(slot_idx);
                return Err(RisError::SlabFull);
            }
        }
        meta.id_to_slot.insert(id, slot_idx);
        Ok(id)
    }

    fn slot_index(&self, id: u64) -> RisResult<usize> {
        let meta = self.meta.read().map_err(|_| RisError::UnknownGenerator(id))?;
        meta.id_to_slot
            .get(&id)
            .copied()
            .ok_or(RisError::UnknownGenerator(id))
    }

    /// Run `f` with exclusive access to one item; locks only that slot.
    pub fn with_mut<F, R>(&self, id: u64, f: F) -> RisResult<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let slot_idx = self.slot_index(id)?;
        let mut data = self.slots[slot_idx]
            .data
            .lock()
            .map_err(|_| RisError::UnknownGenerator(id))?;
        let item = data.as_mut().ok_or(RisError::UnknownGenerator(id))?;
        Ok(f(item))
    }

    pub fn with<F, R>(&self, id: u64, f: F) -> RisResult<R>
    where
        F: FnOnce(&T) -> R,
    {
        self.with_mut(id, |item| f(item))
    }

    /// Remove an item. Its slot is reused but its ID never is.
    pub fn remove(&self, id: u64) -> RisResult<T> {
        let mut meta = self.meta.write().map_err(|_| RisError::UnknownGenerator(id))?;
        let slot_idx = meta.id_to_slot.remove(&id).ok_or(RisError::UnknownGenerator(id))?;

        let item = self.slots[slot_idx]
            .data
            .lock()
            .ok()
            .and_then(|mut data| data.take());
        meta.free.push(slot_idx);
        item.ok_or(RisError::UnknownGenerator(id))
    }

    /// Number of live items
    pub fn count(&self) -> usize {
        self.meta.read().map(|m| m.id_to_slot.len()).unwrap_or(0)
    }
}
