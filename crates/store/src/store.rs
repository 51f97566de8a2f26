//! The item store interface.

use async_trait::async_trait;
use sitebook_core::budget::{BudgetLineItem, NewBudgetLineItem};
use sitebook_shared::types::{LineItemId, LocationId};

use crate::error::StoreError;

/// Persistence for budget line items.
///
/// Each call is independent; there are no multi-item transactions.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Reads all line items of a location, in budget order.
    async fn read(&self, location_id: LocationId) -> Result<Vec<BudgetLineItem>, StoreError>;

    /// Replaces a stored item, returning what the store kept.
    async fn write(
        &self,
        item_id: LineItemId,
        item: &BudgetLineItem,
    ) -> Result<BudgetLineItem, StoreError>;

    /// Creates an item under a location. The store assigns the ID.
    async fn create(
        &self,
        location_id: LocationId,
        item: NewBudgetLineItem,
    ) -> Result<BudgetLineItem, StoreError>;

    /// Deletes an item.
    async fn delete(&self, item_id: LineItemId) -> Result<(), StoreError>;
}
