//! Normalization of spreadsheet rows into line items.
//!
//! Parsing the spreadsheet itself is done elsewhere; this module receives
//! the raw cell text of each row and turns it into line items that already
//! satisfy the recalculation invariants.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::number::LineItemNumber;
use super::numeric::{coerce_input, round_stored};
use super::types::{CostBreakdown, NewBudgetLineItem};

/// Raw cell text of one imported row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportRow {
    /// 1-based row number in the source sheet, for reporting.
    pub row_number: usize,
    /// Line item number cell.
    pub line_item_number: String,
    /// Description cell.
    pub description: String,
    /// Cost code cell.
    pub cost_code: String,
    /// Quantity cell.
    pub unconverted_qty: String,
    /// Unit of measure cell.
    pub unconverted_unit_of_measure: String,
    /// Unit cost cell.
    pub unit_cost: String,
    /// Unit total cell.
    pub unit_total: String,
    /// Conversion factor cell; blank means 1.
    pub conversion_factor: String,
    /// Converted unit of measure cell.
    pub converted_unit_of_measure: String,
    /// Production rate cell; blank means unset.
    pub production_rate: String,
    /// Labor cost cell.
    pub labor_cost: String,
    /// Equipment cost cell.
    pub equipment_cost: String,
    /// Trucking cost cell.
    pub trucking_cost: String,
    /// Dump fees cell.
    pub dump_fees_cost: String,
    /// Material cost cell.
    pub material_cost: String,
    /// Subcontractor cost cell.
    pub subcontractor_cost: String,
    /// Budget total cell.
    pub budget_total: String,
    /// Billing cell.
    pub billing: String,
}

/// Why a row was not imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The line item number is empty or malformed.
    InvalidLineNumber,
    /// An earlier row already used the line item number.
    DuplicateLineNumber,
}

/// A row that was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    /// Row number in the source sheet.
    pub row_number: usize,
    /// The raw line item number cell.
    pub line_item_number: String,
    /// Why the row was skipped.
    pub reason: SkipReason,
}

/// Result of normalizing an import.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    /// Items ready to create, in row order.
    pub items: Vec<NewBudgetLineItem>,
    /// Source row number of each entry in `items`.
    pub source_rows: Vec<usize>,
    /// Rows that were dropped.
    pub skipped: Vec<SkippedRow>,
}

/// Converts raw import rows into line items.
pub struct ImportNormalizer;

impl ImportNormalizer {
    /// Normalizes rows in order.
    ///
    /// Every numeric cell is coerced (invalid → 0). A blank or zero
    /// conversion factor becomes 1. Converted quantity and hours are
    /// derived per row, then every parent is re-aggregated from its
    /// children. A parent that carries a production rate pushes it to its
    /// children; without one, children keep their own rates.
    #[must_use]
    pub fn normalize(rows: &[ImportRow]) -> ImportOutcome {
        let mut outcome = ImportOutcome::default();
        let mut numbers = Vec::new();
        let mut seen = HashSet::new();

        for row in rows {
            let Ok(number) = LineItemNumber::parse(&row.line_item_number) else {
                outcome.skipped.push(Self::skip(row, SkipReason::InvalidLineNumber));
                continue;
            };
            if !seen.insert(number.as_str().to_string()) {
                outcome
                    .skipped
                    .push(Self::skip(row, SkipReason::DuplicateLineNumber));
                continue;
            }

            outcome.items.push(Self::convert(row, &number));
            outcome.source_rows.push(row.row_number);
            numbers.push(number);
        }

        Self::aggregate_parents(&mut outcome.items, &numbers);
        outcome
    }

    fn skip(row: &ImportRow, reason: SkipReason) -> SkippedRow {
        SkippedRow {
            row_number: row.row_number,
            line_item_number: row.line_item_number.clone(),
            reason,
        }
    }

    fn convert(row: &ImportRow, number: &LineItemNumber) -> NewBudgetLineItem {
        let qty = coerce_input(&row.unconverted_qty);
        let factor = match coerce_input(&row.conversion_factor) {
            f if f.is_zero() => Decimal::ONE,
            f => f,
        };
        let production_rate = (!row.production_rate.trim().is_empty())
            .then(|| coerce_input(&row.production_rate));
        let converted_qty = round_stored(qty * factor);

        NewBudgetLineItem {
            line_item_number: number.to_string(),
            description: row.description.trim().to_string(),
            cost_code: row.cost_code.trim().to_string(),
            unconverted_qty: qty,
            unconverted_unit_of_measure: row.unconverted_unit_of_measure.trim().to_string(),
            unit_cost: coerce_input(&row.unit_cost),
            unit_total: coerce_input(&row.unit_total),
            conversion_factor: factor,
            converted_qty,
            converted_unit_of_measure: row.converted_unit_of_measure.trim().to_string(),
            production_rate,
            hours: round_stored(converted_qty * production_rate.unwrap_or(Decimal::ZERO)),
            costs: CostBreakdown {
                labor_cost: coerce_input(&row.labor_cost),
                equipment_cost: coerce_input(&row.equipment_cost),
                trucking_cost: coerce_input(&row.trucking_cost),
                dump_fees_cost: coerce_input(&row.dump_fees_cost),
                material_cost: coerce_input(&row.material_cost),
                subcontractor_cost: coerce_input(&row.subcontractor_cost),
                budget_total: coerce_input(&row.budget_total),
                billing: coerce_input(&row.billing),
            },
        }
    }

    fn aggregate_parents(items: &mut [NewBudgetLineItem], numbers: &[LineItemNumber]) {
        let by_number: HashMap<&str, usize> = numbers
            .iter()
            .enumerate()
            .map(|(idx, number)| (number.as_str(), idx))
            .collect();

        let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
        for (idx, number) in numbers.iter().enumerate() {
            if let Some(parent) = number.parent_number().and_then(|p| by_number.get(p)) {
                children.entry(*parent).or_default().push(idx);
            }
        }

        for (parent, child_indices) in children {
            if let Some(rate) = items[parent].production_rate {
                for child in &child_indices {
                    let child = &mut items[*child];
                    child.production_rate = Some(rate);
                    child.hours = round_stored(child.converted_qty * rate);
                }
            }

            let converted: Decimal = child_indices.iter().map(|c| items[*c].converted_qty).sum();
            let hours: Decimal = child_indices.iter().map(|c| items[*c].hours).sum();

            let parent = &mut items[parent];
            parent.converted_qty = round_stored(converted);
            parent.unconverted_qty = parent.converted_qty;
            parent.hours = round_stored(hours);
        }
    }
}
