//! Cost-code summary of a budget sheet.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::sheet::{BudgetSheet, LineRole};
use super::types::CostBreakdown;

/// Cost code used for items without one.
pub const UNCODED: &str = "UNCODED";

/// Totals for one cost code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostCodeSummary {
    /// Cost code.
    pub cost_code: String,
    /// Number of items with this code.
    pub item_count: usize,
    /// Labor hours. Parents are skipped since their children carry the hours.
    pub hours: Decimal,
    /// Summed cost breakdown.
    #[serde(flatten)]
    pub costs: CostBreakdown,
}

/// Summary of a sheet grouped by cost code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetSummary {
    /// One row per cost code, sorted by code.
    pub lines: Vec<CostCodeSummary>,
    /// Grand total across all codes.
    pub total: CostCodeSummary,
}

impl BudgetSummary {
    /// Summarizes a sheet by cost code.
    #[must_use]
    pub fn from_sheet(sheet: &BudgetSheet) -> Self {
        let mut groups: BTreeMap<String, CostCodeSummary> = BTreeMap::new();

        for item in sheet.items() {
            let code = match item.cost_code.trim() {
                "" => UNCODED,
                code => code,
            };
            let group = groups
                .entry(code.to_string())
                .or_insert_with(|| CostCodeSummary {
                    cost_code: code.to_string(),
                    ..CostCodeSummary::default()
                });

            group.item_count += 1;
            group.costs.accumulate(&item.costs);
            if sheet.role(item.id) != Some(LineRole::Parent) {
                group.hours += item.hours;
            }
        }

        let mut total = CostCodeSummary {
            cost_code: "TOTAL".to_string(),
            ..CostCodeSummary::default()
        };
        for line in groups.values() {
            total.item_count += line.item_count;
            total.hours += line.hours;
            total.costs.accumulate(&line.costs);
        }

        Self {
            lines: groups.into_values().collect(),
            total,
        }
    }

    /// Looks up the row for a cost code.
    #[must_use]
    pub fn line(&self, cost_code: &str) -> Option<&CostCodeSummary> {
        self.lines.iter().find(|line| line.cost_code == cost_code)
    }
}
