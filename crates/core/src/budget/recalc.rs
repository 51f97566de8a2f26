//! Quantity, production rate, and hours recalculation.
//!
//! Three relationships are maintained:
//!
//! - `convertedQty = unconvertedQty × conversionFactor` on leaf lines
//! - `hours = convertedQty × productionRate` on leaf lines
//! - a parent's `convertedQty`, `unconvertedQty`, and `hours` are the sums
//!   over its children
//!
//! Derived quantities and hours are rounded to two places when stored.
//! Production rates are never rounded: a typed rate is kept as typed and a
//! back-solved rate keeps full `Decimal` precision.
//!
//! The recalculator never mutates the sheet. It returns the full
//! replacement items to write, in write order; callers apply them locally
//! and persist them one by one.

use rust_decimal::Decimal;
use serde::Serialize;
use sitebook_shared::types::LineItemId;

use super::error::BudgetError;
use super::numeric::{non_negative, round_stored, safe_div};
use super::sheet::{BudgetSheet, LineRole};
use super::types::BudgetLineItem;

/// Why an item is part of a recalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteReason {
    /// The item the user edited.
    Edited,
    /// A parent re-aggregated after a child changed.
    ParentAggregate,
    /// A child that received its parent's production rate.
    ChildCascade,
}

/// One full-replacement write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItemWrite {
    /// Why the item is written.
    pub reason: WriteReason,
    /// The updated item.
    pub item: BudgetLineItem,
}

/// The ordered writes produced by one edit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recalculation {
    /// Writes in the order they are issued.
    pub writes: Vec<LineItemWrite>,
}

impl Recalculation {
    fn push(&mut self, reason: WriteReason, item: BudgetLineItem) {
        self.writes.push(LineItemWrite { reason, item });
    }

    /// The updated items, in write order.
    pub fn items(&self) -> impl Iterator<Item = &BudgetLineItem> {
        self.writes.iter().map(|write| &write.item)
    }

    /// The item the user edited.
    #[must_use]
    pub fn edited(&self) -> Option<&BudgetLineItem> {
        self.writes
            .iter()
            .find(|write| write.reason == WriteReason::Edited)
            .map(|write| &write.item)
    }

    /// Finds the write for an item.
    #[must_use]
    pub fn item(&self, id: LineItemId) -> Option<&BudgetLineItem> {
        self.items().find(|item| item.id == id)
    }

    /// Number of writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// True when nothing needs to be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Budget line recalculator.
pub struct BudgetLineRecalculator;

impl BudgetLineRecalculator {
    /// Recalculates after the raw quantity of a line changed.
    ///
    /// Negative quantities are treated as zero. Writes the item, then its
    /// parent if the item is a child.
    ///
    /// # Errors
    ///
    /// Returns `LineItemNotFound` for an unknown ID and
    /// `ParentQuantityDerived` when the item has children.
    pub fn on_quantity_change(
        sheet: &BudgetSheet,
        id: LineItemId,
        new_unconverted_qty: Decimal,
    ) -> Result<Recalculation, BudgetError> {
        let idx = sheet.index_of(id)?;
        let current = sheet.item_at(idx);
        if sheet.role_at(idx) == LineRole::Parent {
            return Err(BudgetError::ParentQuantityDerived {
                line: current.line_item_number.clone(),
            });
        }

        let qty = non_negative(new_unconverted_qty);
        let mut item = current.clone();
        item.unconverted_qty = qty;
        item.converted_qty = round_stored(qty * item.conversion_factor);
        item.hours = round_stored(item.converted_qty * item.production_rate_or_zero());

        let mut recalculation = Recalculation::default();
        let parent = sheet
            .parent_at(idx)
            .map(|parent_idx| Self::aggregate_parent(sheet, parent_idx, &item));
        recalculation.push(WriteReason::Edited, item);
        if let Some(parent) = parent {
            recalculation.push(WriteReason::ParentAggregate, parent);
        }
        Ok(recalculation)
    }

    /// Recalculates after the production rate of a line changed.
    ///
    /// On a parent the rate is pushed to every child. Writes the item, then
    /// each child.
    ///
    /// # Errors
    ///
    /// Returns `LineItemNotFound` for an unknown ID and
    /// `ChildRateInherited` when the item is a child.
    pub fn on_production_rate_change(
        sheet: &BudgetSheet,
        id: LineItemId,
        new_production_rate: Decimal,
    ) -> Result<Recalculation, BudgetError> {
        let idx = sheet.index_of(id)?;
        let rate = non_negative(new_production_rate);

        match sheet.role_at(idx) {
            LineRole::Child => Err(BudgetError::ChildRateInherited {
                line: sheet.item_at(idx).line_item_number.clone(),
            }),
            LineRole::Parent => Ok(Self::cascade_rate(sheet, idx, rate, WriteReason::Edited)),
            LineRole::Standalone => {
                let mut item = sheet.item_at(idx).clone();
                item.production_rate = Some(rate);
                item.hours = round_stored(item.converted_qty * rate);

                let mut recalculation = Recalculation::default();
                recalculation.push(WriteReason::Edited, item);
                Ok(recalculation)
            }
        }
    }

    /// Recalculates after the hours of a line changed.
    ///
    /// The production rate is back-solved as `hours / convertedQty` and kept
    /// at full precision, so stored hours stay `round(convertedQty × rate)`.
    /// With a zero converted quantity the rate is left unchanged and the
    /// typed hours are stored as they are. On a parent the
    /// back-solved rate is pushed to every child and the parent's hours
    /// become the sum of the recomputed child hours, which can differ
    /// slightly from the typed value.
    ///
    /// # Errors
    ///
    /// Returns `LineItemNotFound` for an unknown ID and
    /// `ChildHoursInherited` when the item is a child.
    pub fn on_hours_change(
        sheet: &BudgetSheet,
        id: LineItemId,
        new_hours: Decimal,
    ) -> Result<Recalculation, BudgetError> {
        let idx = sheet.index_of(id)?;
        let hours = non_negative(new_hours);
        let current = sheet.item_at(idx);

        match sheet.role_at(idx) {
            LineRole::Child => Err(BudgetError::ChildHoursInherited {
                line: current.line_item_number.clone(),
            }),
            LineRole::Parent if current.converted_qty > Decimal::ZERO => {
                let rate = safe_div(hours, current.converted_qty);
                Ok(Self::cascade_rate(sheet, idx, rate, WriteReason::Edited))
            }
            LineRole::Parent => {
                // No quantity to spread hours over; hours stay the child sum.
                let mut parent = current.clone();
                parent.hours = Self::sum_children(sheet, idx, |child| child.hours);

                let mut recalculation = Recalculation::default();
                recalculation.push(WriteReason::Edited, parent);
                Ok(recalculation)
            }
            LineRole::Standalone => {
                let mut item = current.clone();
                if item.converted_qty > Decimal::ZERO {
                    let rate = safe_div(hours, item.converted_qty);
                    item.production_rate = Some(rate);
                    item.hours = round_stored(item.converted_qty * rate);
                } else {
                    item.hours = round_stored(hours);
                }

                let mut recalculation = Recalculation::default();
                recalculation.push(WriteReason::Edited, item);
                Ok(recalculation)
            }
        }
    }

    /// Re-aggregates a parent from its current children, e.g. after a child
    /// was added or removed. Items that are not parents produce no writes.
    ///
    /// # Errors
    ///
    /// Returns `LineItemNotFound` for an unknown ID.
    pub fn reaggregate(sheet: &BudgetSheet, id: LineItemId) -> Result<Recalculation, BudgetError> {
        let idx = sheet.index_of(id)?;
        let mut recalculation = Recalculation::default();
        if sheet.role_at(idx) != LineRole::Parent {
            return Ok(recalculation);
        }

        let mut parent = sheet.item_at(idx).clone();
        parent.converted_qty = Self::sum_children(sheet, idx, |child| child.converted_qty);
        parent.unconverted_qty = parent.converted_qty;
        parent.hours = Self::sum_children(sheet, idx, |child| child.hours);
        if &parent != sheet.item_at(idx) {
            recalculation.push(WriteReason::ParentAggregate, parent);
        }
        Ok(recalculation)
    }

    /// Brings a parent in line with the children it currently has, e.g.
    /// after it adopted existing lines or a line was added under it from
    /// outside an edit. A parent that carries a production rate pushes it
    /// to every child first. Only items that actually change are written,
    /// and items that are not parents produce no writes.
    ///
    /// # Errors
    ///
    /// Returns `LineItemNotFound` for an unknown ID.
    pub fn reconcile_parent(
        sheet: &BudgetSheet,
        id: LineItemId,
    ) -> Result<Recalculation, BudgetError> {
        let idx = sheet.index_of(id)?;
        if sheet.role_at(idx) != LineRole::Parent {
            return Ok(Recalculation::default());
        }

        let mut recalculation = match sheet.item_at(idx).production_rate {
            Some(rate) => Self::cascade_rate(sheet, idx, rate, WriteReason::ParentAggregate),
            None => return Self::reaggregate(sheet, id),
        };
        recalculation
            .writes
            .retain(|write| sheet.get(write.item.id) != Some(&write.item));
        Ok(recalculation)
    }

    /// Pushes a rate from a parent to all of its children and re-aggregates
    /// the parent from the recomputed children.
    fn cascade_rate(
        sheet: &BudgetSheet,
        parent_idx: usize,
        rate: Decimal,
        parent_reason: WriteReason,
    ) -> Recalculation {
        let children: Vec<BudgetLineItem> = sheet
            .children_at(parent_idx)
            .iter()
            .map(|child_idx| {
                let mut child = sheet.item_at(*child_idx).clone();
                child.production_rate = Some(rate);
                child.hours = round_stored(child.converted_qty * rate);
                child
            })
            .collect();

        let mut parent = sheet.item_at(parent_idx).clone();
        parent.production_rate = Some(rate);
        parent.converted_qty =
            round_stored(children.iter().map(|child| child.converted_qty).sum());
        parent.unconverted_qty = parent.converted_qty;
        parent.hours = round_stored(children.iter().map(|child| child.hours).sum());

        let mut recalculation = Recalculation::default();
        recalculation.push(parent_reason, parent);
        for child in children {
            recalculation.push(WriteReason::ChildCascade, child);
        }
        recalculation
    }

    /// Re-aggregates a parent, substituting `updated` for its stale copy.
    fn aggregate_parent(
        sheet: &BudgetSheet,
        parent_idx: usize,
        updated: &BudgetLineItem,
    ) -> BudgetLineItem {
        let pick = |child: &BudgetLineItem| {
            if child.id == updated.id {
                (updated.converted_qty, updated.hours)
            } else {
                (child.converted_qty, child.hours)
            }
        };

        let mut parent = sheet.item_at(parent_idx).clone();
        parent.converted_qty = Self::sum_children(sheet, parent_idx, |child| pick(child).0);
        parent.unconverted_qty = parent.converted_qty;
        parent.hours = Self::sum_children(sheet, parent_idx, |child| pick(child).1);
        parent
    }

    fn sum_children(
        sheet: &BudgetSheet,
        parent_idx: usize,
        field: impl Fn(&BudgetLineItem) -> Decimal,
    ) -> Decimal {
        round_stored(
            sheet
                .children_at(parent_idx)
                .iter()
                .map(|child_idx| field(sheet.item_at(*child_idx)))
                .sum(),
        )
    }
}
