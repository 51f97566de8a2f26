//! The line items of one location, with their parent/child links resolved.
//!
//! Dotted numbers are parsed once when the sheet is built. Parent and
//! child relationships are then held as indices into the item arena, so
//! recalculation never matches strings.

use std::collections::HashMap;

use sitebook_shared::types::LineItemId;

use super::error::BudgetError;
use super::number::LineItemNumber;
use super::recalc::Recalculation;
use super::types::BudgetLineItem;

/// Position of a line item in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// No parent and no children. Also covers dotted lines whose parent
    /// number is missing from the sheet.
    Standalone,
    /// Has at least one child; quantity and hours are aggregates.
    Parent,
    /// Rolls up into a parent; rate and hours are parent-controlled.
    Child,
}

/// Budget line items for one location.
#[derive(Debug, Clone, Default)]
pub struct BudgetSheet {
    items: Vec<BudgetLineItem>,
    numbers: Vec<LineItemNumber>,
    by_id: HashMap<LineItemId, usize>,
    by_number: HashMap<String, usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

impl BudgetSheet {
    /// Builds a sheet, keeping the given item order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLineNumber` for a malformed number and
    /// `DuplicateLineNumber` when two items share a number.
    pub fn from_items(items: Vec<BudgetLineItem>) -> Result<Self, BudgetError> {
        let numbers = items
            .iter()
            .map(|item| LineItemNumber::parse(&item.line_item_number))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sheet = Self {
            items,
            numbers,
            ..Self::default()
        };
        sheet.reindex()?;
        Ok(sheet)
    }

    fn reindex(&mut self) -> Result<(), BudgetError> {
        self.by_id.clear();
        self.by_number.clear();

        for (idx, (item, number)) in self.items.iter().zip(&self.numbers).enumerate() {
            self.by_id.insert(item.id, idx);
            if self
                .by_number
                .insert(number.as_str().to_string(), idx)
                .is_some()
            {
                return Err(BudgetError::DuplicateLineNumber(number.to_string()));
            }
        }

        self.parent = self
            .numbers
            .iter()
            .map(|number| {
                number
                    .parent_number()
                    .and_then(|parent| self.by_number.get(parent).copied())
            })
            .collect();

        self.children = vec![Vec::new(); self.items.len()];
        for (idx, parent) in self.parent.iter().enumerate() {
            if let Some(parent) = parent {
                self.children[*parent].push(idx);
            }
        }

        Ok(())
    }

    /// All items in sheet order.
    #[must_use]
    pub fn items(&self) -> &[BudgetLineItem] {
        &self.items
    }

    /// Consumes the sheet, returning its items in sheet order.
    #[must_use]
    pub fn into_items(self) -> Vec<BudgetLineItem> {
        self.items
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when the sheet has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an item by ID.
    #[must_use]
    pub fn get(&self, id: LineItemId) -> Option<&BudgetLineItem> {
        self.by_id.get(&id).map(|idx| &self.items[*idx])
    }

    /// Looks up an item by line item number.
    #[must_use]
    pub fn get_by_number(&self, number: &str) -> Option<&BudgetLineItem> {
        self.by_number
            .get(number.trim())
            .map(|idx| &self.items[*idx])
    }

    /// Role of an item in the hierarchy.
    #[must_use]
    pub fn role(&self, id: LineItemId) -> Option<LineRole> {
        self.by_id.get(&id).map(|idx| self.role_at(*idx))
    }

    /// The parent of a child item.
    #[must_use]
    pub fn parent_of(&self, id: LineItemId) -> Option<&BudgetLineItem> {
        let idx = *self.by_id.get(&id)?;
        self.parent[idx].map(|parent| &self.items[parent])
    }

    /// Children of an item, in sheet order. Empty for non-parents.
    #[must_use]
    pub fn children_of(&self, id: LineItemId) -> Vec<&BudgetLineItem> {
        self.by_id
            .get(&id)
            .map(|idx| {
                self.children[*idx]
                    .iter()
                    .map(|child| &self.items[*child])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replaces every item written by a recalculation.
    ///
    /// # Errors
    ///
    /// Returns `LineItemNotFound` if a write targets an unknown item. Writes
    /// before the unknown one are kept.
    pub fn apply(&mut self, recalculation: &Recalculation) -> Result<(), BudgetError> {
        for item in recalculation.items() {
            let idx = self.index_of(item.id)?;
            self.items[idx] = item.clone();
        }
        Ok(())
    }

    /// Inserts a new item or replaces the item with the same ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is malformed or already used by
    /// another item. The sheet is unchanged on error.
    pub fn upsert(&mut self, item: BudgetLineItem) -> Result<(), BudgetError> {
        let number = LineItemNumber::parse(&item.line_item_number)?;
        if let Some(existing) = self.by_number.get(number.as_str()) {
            if self.items[*existing].id != item.id {
                return Err(BudgetError::DuplicateLineNumber(number.to_string()));
            }
        }

        match self.by_id.get(&item.id) {
            Some(idx) => {
                let idx = *idx;
                self.items[idx] = item;
                self.numbers[idx] = number;
            }
            None => {
                self.items.push(item);
                self.numbers.push(number);
            }
        }
        self.reindex()
    }

    /// Removes an item. Children of a removed parent become standalone.
    pub fn remove(&mut self, id: LineItemId) -> Option<BudgetLineItem> {
        let idx = *self.by_id.get(&id)?;
        let removed = self.items.remove(idx);
        self.numbers.remove(idx);
        // Numbers were unique before removal, so reindexing cannot fail.
        let _ = self.reindex();
        Some(removed)
    }

    pub(crate) fn index_of(&self, id: LineItemId) -> Result<usize, BudgetError> {
        self.by_id
            .get(&id)
            .copied()
            .ok_or(BudgetError::LineItemNotFound(id))
    }

    pub(crate) fn item_at(&self, idx: usize) -> &BudgetLineItem {
        &self.items[idx]
    }

    pub(crate) fn role_at(&self, idx: usize) -> LineRole {
        if self.parent[idx].is_some() {
            LineRole::Child
        } else if self.children[idx].is_empty() {
            LineRole::Standalone
        } else {
            LineRole::Parent
        }
    }

    pub(crate) fn parent_at(&self, idx: usize) -> Option<usize> {
        self.parent[idx]
    }

    pub(crate) fn children_at(&self, idx: usize) -> &[usize] {
        &self.children[idx]
    }
}
