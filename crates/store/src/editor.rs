//! Budget editor: the explicit state behind an editable budget table.
//!
//! The editor owns the sheet of one location. Each edit is recalculated
//! synchronously, applied to the local sheet, and then persisted item by
//! item. Multi-item writes are not transactional: when one write fails the
//! others stand, the local sheet keeps the new values, and the failure is
//! reported so the caller can notify the user or reload.

use std::sync::Arc;

use sitebook_core::budget::{
    BudgetError, BudgetLineItem, BudgetLineRecalculator, BudgetSheet, BudgetSummary,
    ImportNormalizer, ImportRow, LineItemNumber, LineRole, NewBudgetLineItem, Recalculation,
    SkipReason, SkippedRow, numeric,
};
use sitebook_shared::AppError;
use sitebook_shared::types::{LineItemId, LocationId};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::StoreError;
use crate::scheduler::{PersistenceFailure, WriteScheduler};
use crate::store::ItemStore;

/// How the writes of an edit reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Write now, in order (blur, Enter, or programmatic edits).
    Immediate,
    /// Hand each write to the debouncer (typing).
    Debounced,
}

/// Editor errors.
#[derive(Debug, Error)]
pub enum EditError {
    /// The edit was rejected; nothing was written.
    #[error(transparent)]
    Validation(#[from] BudgetError),

    /// A store call the edit depends on failed.
    #[error(transparent)]
    Persistence(#[from] StoreError),
}

impl From<EditError> for AppError {
    fn from(err: EditError) -> Self {
        match err {
            EditError::Validation(err) => err.into(),
            EditError::Persistence(err) => err.into(),
        }
    }
}

/// What an edit changed and how persisting it went.
#[derive(Debug, Clone, Default)]
pub struct EditReport {
    /// The applied recalculation.
    pub recalculation: Recalculation,
    /// Immediate writes that failed. Always empty for debounced edits,
    /// whose failures arrive on the scheduler's failure channel.
    pub failures: Vec<PersistenceFailure>,
    /// Number of writes handed to the debouncer.
    pub scheduled: usize,
}

impl EditReport {
    /// True when every immediate write succeeded.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of importing rows into a location.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Items created, in row order.
    pub created: Vec<BudgetLineItem>,
    /// Rows that were not imported.
    pub skipped: Vec<SkippedRow>,
    /// Existing items rewritten because imported lines joined their family:
    /// parents re-aggregated and children given their parent's rate.
    pub updated: Vec<BudgetLineItem>,
    /// Writes of `updated` items that failed.
    pub failures: Vec<PersistenceFailure>,
}

/// Editable budget of one location.
pub struct BudgetEditor {
    location_id: LocationId,
    sheet: BudgetSheet,
    scheduler: WriteScheduler,
}

impl BudgetEditor {
    /// Reads a location's items and builds the editor.
    pub async fn load(scheduler: WriteScheduler, location_id: LocationId) -> Result<Self, EditError> {
        let items = scheduler.store().read(location_id).await?;
        let sheet = BudgetSheet::from_items(items)?;
        info!(location_id = %location_id, items = sheet.len(), "Budget sheet loaded");

        Ok(Self {
            location_id,
            sheet,
            scheduler,
        })
    }

    /// Location being edited.
    #[must_use]
    pub fn location_id(&self) -> LocationId {
        self.location_id
    }

    /// Current local state.
    #[must_use]
    pub fn sheet(&self) -> &BudgetSheet {
        &self.sheet
    }

    /// Cost-code summary of the current local state.
    #[must_use]
    pub fn summary(&self) -> BudgetSummary {
        BudgetSummary::from_sheet(&self.sheet)
    }

    /// Replaces local state with the store's copy. Pending debounced writes
    /// are dropped first so they cannot overwrite what was just read.
    pub async fn reload(&mut self) -> Result<(), EditError> {
        self.scheduler.shutdown();
        let items = self.store().read(self.location_id).await?;
        self.sheet = BudgetSheet::from_items(items)?;
        Ok(())
    }

    /// Sets the raw quantity of a line.
    pub async fn edit_quantity(
        &mut self,
        id: LineItemId,
        raw: &str,
        mode: WriteMode,
    ) -> Result<EditReport, EditError> {
        let qty = numeric::coerce_input(raw);
        let recalculation = BudgetLineRecalculator::on_quantity_change(&self.sheet, id, qty)
            .inspect_err(|err| warn!(item_id = %id, %err, "Quantity edit rejected"))?;
        self.commit(recalculation, mode).await
    }

    /// Sets the production rate of a line.
    pub async fn edit_production_rate(
        &mut self,
        id: LineItemId,
        raw: &str,
        mode: WriteMode,
    ) -> Result<EditReport, EditError> {
        let rate = numeric::coerce_input(raw);
        let recalculation =
            BudgetLineRecalculator::on_production_rate_change(&self.sheet, id, rate)
                .inspect_err(|err| warn!(item_id = %id, %err, "Rate edit rejected"))?;
        self.commit(recalculation, mode).await
    }

    /// Sets the hours of a line.
    pub async fn edit_hours(
        &mut self,
        id: LineItemId,
        raw: &str,
        mode: WriteMode,
    ) -> Result<EditReport, EditError> {
        let hours = numeric::coerce_input(raw);
        let recalculation = BudgetLineRecalculator::on_hours_change(&self.sheet, id, hours)
            .inspect_err(|err| warn!(item_id = %id, %err, "Hours edit rejected"))?;
        self.commit(recalculation, mode).await
    }

    /// Writes any pending debounced value of an item now.
    pub async fn flush(&self, id: LineItemId) -> Result<(), EditError> {
        if self.scheduler.cancel(id) {
            if let Some(item) = self.sheet.get(id) {
                self.scheduler.flush(item).await?;
            }
        }
        Ok(())
    }

    /// Adds a line and returns it as stored locally. A new child takes its
    /// parent's production rate, and the parent is re-aggregated and written.
    /// A new parent adopts existing lines under its number: it is aggregated
    /// from them and, when it carries a rate, pushes that rate to them.
    pub async fn add_item(
        &mut self,
        mut item: NewBudgetLineItem,
    ) -> Result<(BudgetLineItem, EditReport), EditError> {
        let number = LineItemNumber::parse(&item.line_item_number)?;
        if self.sheet.get_by_number(number.as_str()).is_some() {
            return Err(BudgetError::DuplicateLineNumber(number.to_string()).into());
        }
        item.line_item_number = number.to_string();
        if let Some(parent) = number
            .parent_number()
            .and_then(|parent| self.sheet.get_by_number(parent))
        {
            if parent.production_rate.is_some() {
                item.production_rate = parent.production_rate;
            }
        }

        let created = self.store().create(self.location_id, item).await?;
        info!(item_id = %created.id, line = %created.line_item_number, "Line item created");
        self.sheet.upsert(created.clone())?;

        let recalculation = match self.sheet.role(created.id) {
            Some(LineRole::Child) => BudgetLineRecalculator::on_quantity_change(
                &self.sheet,
                created.id,
                created.unconverted_qty,
            )?,
            Some(LineRole::Parent) => {
                BudgetLineRecalculator::reconcile_parent(&self.sheet, created.id)?
            }
            _ => Recalculation::default(),
        };
        let report = self.commit(recalculation, WriteMode::Immediate).await?;
        let item = self.sheet.get(created.id).cloned().unwrap_or(created);
        Ok((item, report))
    }

    /// Deletes a line. Deleting a child re-aggregates and writes its parent.
    pub async fn delete_item(&mut self, id: LineItemId) -> Result<EditReport, EditError> {
        let parent = self.sheet.parent_of(id).map(|parent| parent.id);
        if self.sheet.get(id).is_none() {
            return Err(BudgetError::LineItemNotFound(id).into());
        }

        self.scheduler.cancel(id);
        self.store().delete(id).await?;
        self.sheet.remove(id);
        info!(item_id = %id, "Line item deleted");

        let recalculation = match parent {
            Some(parent) => BudgetLineRecalculator::reaggregate(&self.sheet, parent)?,
            None => Recalculation::default(),
        };
        self.commit(recalculation, WriteMode::Immediate).await
    }

    /// Imports spreadsheet rows, creating one item per accepted row.
    ///
    /// Rows whose number already exists in the location are skipped. A
    /// failed create stops the import; items created before it remain.
    /// Afterwards every parent touched by the import is reconciled with its
    /// children, including parents and orphans that existed before.
    pub async fn import(&mut self, rows: &[ImportRow]) -> Result<ImportReport, EditError> {
        let outcome = ImportNormalizer::normalize(rows);
        let mut report = ImportReport {
            skipped: outcome.skipped,
            ..ImportReport::default()
        };

        for (item, row_number) in outcome.items.into_iter().zip(outcome.source_rows) {
            if self.sheet.get_by_number(&item.line_item_number).is_some() {
                report.skipped.push(SkippedRow {
                    row_number,
                    line_item_number: item.line_item_number,
                    reason: SkipReason::DuplicateLineNumber,
                });
                continue;
            }
            let created = self.store().create(self.location_id, item).await?;
            self.sheet.upsert(created.clone())?;
            report.created.push(created);
        }

        let mut parents: Vec<LineItemId> = Vec::new();
        for created in &report.created {
            let parent = match self.sheet.role(created.id) {
                Some(LineRole::Parent) => Some(created.id),
                _ => self.sheet.parent_of(created.id).map(|parent| parent.id),
            };
            if let Some(parent) = parent.filter(|parent| !parents.contains(parent)) {
                parents.push(parent);
            }
        }
        for parent in parents {
            let recalculation = BudgetLineRecalculator::reconcile_parent(&self.sheet, parent)?;
            let committed = self.commit(recalculation, WriteMode::Immediate).await?;
            report
                .updated
                .extend(committed.recalculation.items().cloned());
            report.failures.extend(committed.failures);
        }

        for skipped in &report.skipped {
            warn!(
                row = skipped.row_number,
                line = %skipped.line_item_number,
                reason = ?skipped.reason,
                "Import row skipped"
            );
        }
        info!(
            location_id = %self.location_id,
            created = report.created.len(),
            skipped = report.skipped.len(),
            updated = report.updated.len(),
            "Budget import finished"
        );
        Ok(report)
    }

    /// Clears pending debounced writes. Dispatched writes keep running.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    fn store(&self) -> &Arc<dyn ItemStore> {
        self.scheduler.store()
    }

    async fn commit(
        &mut self,
        recalculation: Recalculation,
        mode: WriteMode,
    ) -> Result<EditReport, EditError> {
        self.sheet.apply(&recalculation)?;

        let mut report = EditReport::default();
        match mode {
            WriteMode::Immediate => {
                for item in recalculation.items() {
                    if let Err(error) = self.scheduler.flush(item).await {
                        error!(item_id = %item.id, line = %item.line_item_number, %error, "Write failed");
                        report.failures.push(PersistenceFailure {
                            item_id: item.id,
                            line_item_number: item.line_item_number.clone(),
                            error,
                        });
                    }
                }
            }
            WriteMode::Debounced => {
                for item in recalculation.items() {
                    self.scheduler.schedule(item.clone());
                }
                report.scheduled = recalculation.len();
            }
        }

        if let Some(edited) = recalculation.edited() {
            info!(
                item_id = %edited.id,
                line = %edited.line_item_number,
                writes = recalculation.len(),
                failures = report.failures.len(),
                "Budget line recalculated"
            );
        }
        report.recalculation = recalculation;
        Ok(report)
    }
}
