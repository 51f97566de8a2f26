//! In-memory item store.
//!
//! Used by tests and by the command-line tool when working on a sheet file.
//! Writes can be made to fail per item, and an optional delay keeps writes
//! in flight long enough to observe overlap.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use sitebook_core::budget::{BudgetLineItem, NewBudgetLineItem};
use sitebook_shared::types::{LineItemId, LocationId};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::ItemStore;

/// Dashmap-backed item store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: DashMap<LineItemId, (u64, BudgetLineItem)>,
    next_seq: AtomicU64,
    failing: DashSet<LineItemId>,
    write_delay: Option<Duration>,
    write_log: Mutex<Vec<BudgetLineItem>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `items`, in order.
    #[must_use]
    pub fn with_items(items: impl IntoIterator<Item = BudgetLineItem>) -> Self {
        let store = Self::new();
        for item in items {
            store.insert(item);
        }
        store
    }

    /// Keeps every write in flight for `delay`.
    #[must_use]
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    /// Inserts or replaces an item without going through `write`.
    pub fn insert(&self, item: BudgetLineItem) {
        let seq = match self.items.get(&item.id) {
            Some(existing) => existing.0,
            None => self.next_seq.fetch_add(1, Ordering::Relaxed),
        };
        self.items.insert(item.id, (seq, item));
    }

    /// Makes subsequent writes of an item fail.
    pub fn fail_writes_for(&self, item_id: LineItemId) {
        self.failing.insert(item_id);
    }

    /// Lets writes of an item succeed again.
    pub fn clear_failures(&self) {
        self.failing.clear();
    }

    /// Returns the stored copy of an item.
    #[must_use]
    pub fn get(&self, item_id: LineItemId) -> Option<BudgetLineItem> {
        self.items.get(&item_id).map(|entry| entry.1.clone())
    }

    /// Successful writes, in completion order.
    pub async fn write_log(&self) -> Vec<BudgetLineItem> {
        self.write_log.lock().await.clone()
    }

    /// Highest number of writes that were in flight at the same time.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn read(&self, location_id: LocationId) -> Result<Vec<BudgetLineItem>, StoreError> {
        let mut items: Vec<(u64, BudgetLineItem)> = self
            .items
            .iter()
            .filter(|entry| entry.1.location_id == location_id)
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|(seq, _)| *seq);
        Ok(items.into_iter().map(|(_, item)| item).collect())
    }

    async fn write(
        &self,
        item_id: LineItemId,
        item: &BudgetLineItem,
    ) -> Result<BudgetLineItem, StoreError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing.contains(&item_id) {
            Err(StoreError::Rejected(format!("write of {item_id} failed")))
        } else {
            match self.items.get_mut(&item_id) {
                Some(mut entry) => {
                    entry.1 = item.clone();
                    Ok(item.clone())
                }
                None => Err(StoreError::NotFound(item_id.to_string())),
            }
        };

        if result.is_ok() {
            self.write_log.lock().await.push(item.clone());
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn create(
        &self,
        location_id: LocationId,
        item: NewBudgetLineItem,
    ) -> Result<BudgetLineItem, StoreError> {
        let created = item.into_item(LineItemId::new(), location_id);
        self.insert(created.clone());
        Ok(created)
    }

    async fn delete(&self, item_id: LineItemId) -> Result<(), StoreError> {
        self.items
            .remove(&item_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(item_id.to_string()))
    }
}
