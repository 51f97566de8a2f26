//! Debounced and immediate item writes.
//!
//! Inline edits produce a write per keystroke. `schedule` holds each write
//! back until the item has been quiet for the configured period; a newer
//! edit of the same item restarts the timer and replaces the pending value.
//! `flush` (blur or Enter) drops the pending timer and writes right away.
//!
//! Writes of one item are serialized, so at most one is in flight per item.
//! A debounced write whose timer already fired still yields to a newer
//! `schedule` or `flush` of the item if it has not reached the store yet.
//! Shutting down clears pending timers but never aborts a write that has
//! already been dispatched.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use sitebook_core::budget::BudgetLineItem;
use sitebook_shared::EditingConfig;
use sitebook_shared::types::LineItemId;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::StoreError;
use crate::store::ItemStore;

/// A background write that failed. Local state is not rolled back; the
/// presentation layer shows a notification and the next reload repairs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceFailure {
    /// Item whose write failed.
    pub item_id: LineItemId,
    /// Line item number, for the notification text.
    pub line_item_number: String,
    /// The store error.
    pub error: StoreError,
}

type ItemLock = Arc<Mutex<()>>;
type LockMap = DashMap<LineItemId, ItemLock>;

/// Schedules item writes against a store.
pub struct WriteScheduler {
    store: Arc<dyn ItemStore>,
    quiet_period: Duration,
    generation: Arc<AtomicU64>,
    pending: Arc<DashMap<LineItemId, (u64, JoinHandle<()>)>>,
    latest: Arc<DashMap<LineItemId, u64>>,
    locks: Arc<LockMap>,
    failures: mpsc::UnboundedSender<PersistenceFailure>,
}

impl WriteScheduler {
    /// Creates a scheduler and the receiver for background write failures.
    #[must_use]
    pub fn new(
        store: Arc<dyn ItemStore>,
        quiet_period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<PersistenceFailure>) {
        let (failures, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            store,
            quiet_period,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Arc::new(DashMap::new()),
            latest: Arc::new(DashMap::new()),
            locks: Arc::new(DashMap::new()),
            failures,
        };
        (scheduler, receiver)
    }

    /// Creates a scheduler using the configured debounce period.
    #[must_use]
    pub fn from_config(
        store: Arc<dyn ItemStore>,
        config: &EditingConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PersistenceFailure>) {
        Self::new(store, Duration::from_millis(config.debounce_ms))
    }

    /// The store writes go to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    /// Writes `item` once it has been quiet for the debounce period.
    ///
    /// A debounced write that is overtaken by a newer `schedule` or `flush`
    /// of the same item is dropped, even after its timer has fired.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, item: BudgetLineItem) {
        let id = item.id;
        let generation = self.next_generation(id);
        let quiet_period = self.quiet_period;
        let store = Arc::clone(&self.store);
        let locks = Arc::clone(&self.locks);
        let latest = Arc::clone(&self.latest);
        let pending = Arc::clone(&self.pending);
        let failures = self.failures.clone();

        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            pending.remove_if(&id, |_, (current, _)| *current == generation);
            // Detached so that cancelling timers never aborts a dispatched write.
            tokio::spawn(async move {
                let lock = lock_for(&locks, id);
                let result = {
                    let _guard = lock.lock().await;
                    if latest.get(&id).map(|current| *current) == Some(generation) {
                        let result = store.write(id, &item).await;
                        latest.remove_if(&id, |_, current| *current == generation);
                        Some(result)
                    } else {
                        None
                    }
                };
                release_lock(&locks, id, lock);

                match result {
                    None => {
                        debug!(item_id = %id, line = %item.line_item_number, "Superseded debounced write dropped");
                    }
                    Some(Err(error)) => {
                        error!(item_id = %id, line = %item.line_item_number, %error, "Debounced write failed");
                        let _ = failures.send(PersistenceFailure {
                            item_id: id,
                            line_item_number: item.line_item_number.clone(),
                            error,
                        });
                    }
                    Some(Ok(_)) => {}
                }
            });
        });

        if let Some((_, previous)) = self.pending.insert(id, (generation, timer)) {
            debug!(item_id = %id, "Debounce timer restarted");
            previous.abort();
        }
    }

    /// Cancels any pending write of `item` and writes it now.
    ///
    /// Debounced writes of the item that were already dispatched but have
    /// not reached the store yet are dropped in favour of this one.
    pub async fn flush(&self, item: &BudgetLineItem) -> Result<BudgetLineItem, StoreError> {
        let id = item.id;
        self.cancel(id);
        let generation = self.next_generation(id);

        let lock = lock_for(&self.locks, id);
        let result = {
            let _guard = lock.lock().await;
            self.store.write(id, item).await
        };
        self.latest
            .remove_if(&id, |_, current| *current == generation);
        release_lock(&self.locks, id, lock);
        result
    }

    /// Cancels the pending write of an item. Returns true if one was pending.
    pub fn cancel(&self, item_id: LineItemId) -> bool {
        match self.pending.remove(&item_id) {
            Some((_, (generation, timer))) => {
                timer.abort();
                self.latest
                    .remove_if(&item_id, |_, current| *current == generation);
                true
            }
            None => false,
        }
    }

    /// Number of items with a pending debounced write.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clears all pending timers. Writes already dispatched keep running.
    pub fn shutdown(&self) {
        let ids: Vec<LineItemId> = self.pending.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.cancel(id);
        }
    }

    /// Hands out the next generation and marks it as the item's newest write.
    fn next_generation(&self, item_id: LineItemId) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        self.latest.insert(item_id, generation);
        generation
    }
}

impl Drop for WriteScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_for(locks: &LockMap, item_id: LineItemId) -> ItemLock {
    Arc::clone(locks.entry(item_id).or_default().value())
}

/// Drops the item's lock entry once nobody else holds or waits on it.
fn release_lock(locks: &LockMap, item_id: LineItemId, lock: ItemLock) {
    drop(lock);
    locks.remove_if(&item_id, |_, lock| Arc::strong_count(lock) == 1);
}
