//! Budget line item data types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sitebook_shared::types::{LineItemId, LocationId};

/// Cost breakdown of a line item.
///
/// These fields are entered independently and are never derived by the
/// recalculator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostBreakdown {
    /// Labor cost.
    pub labor_cost: Decimal,
    /// Equipment cost.
    pub equipment_cost: Decimal,
    /// Trucking cost.
    pub trucking_cost: Decimal,
    /// Dump fees.
    pub dump_fees_cost: Decimal,
    /// Material cost.
    pub material_cost: Decimal,
    /// Subcontractor cost.
    pub subcontractor_cost: Decimal,
    /// Budget total for the line.
    pub budget_total: Decimal,
    /// Billing amount for the line.
    pub billing: Decimal,
}

impl CostBreakdown {
    /// Adds every field of `other` into `self`.
    pub fn accumulate(&mut self, other: &Self) {
        self.labor_cost += other.labor_cost;
        self.equipment_cost += other.equipment_cost;
        self.trucking_cost += other.trucking_cost;
        self.dump_fees_cost += other.dump_fees_cost;
        self.material_cost += other.material_cost;
        self.subcontractor_cost += other.subcontractor_cost;
        self.budget_total += other.budget_total;
        self.billing += other.billing;
    }
}

/// A budget line item as stored by the item store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLineItem {
    /// Line item ID.
    pub id: LineItemId,
    /// Location the budget belongs to.
    pub location_id: LocationId,
    /// Dotted line item number (`"15"`, `"15.1"`).
    pub line_item_number: String,
    /// Scope of work.
    #[serde(default)]
    pub description: String,
    /// Summary grouping key, orthogonal to the hierarchy.
    #[serde(default)]
    pub cost_code: String,
    /// Raw quantity.
    pub unconverted_qty: Decimal,
    /// Unit of the raw quantity.
    #[serde(default)]
    pub unconverted_unit_of_measure: String,
    /// Unit cost.
    #[serde(default)]
    pub unit_cost: Decimal,
    /// Unit total.
    #[serde(default)]
    pub unit_total: Decimal,
    /// Factor from the raw unit to the converted unit.
    pub conversion_factor: Decimal,
    /// Quantity in the converted unit.
    pub converted_qty: Decimal,
    /// Converted unit of measure.
    #[serde(default)]
    pub converted_unit_of_measure: String,
    /// Production rate (PX).
    #[serde(default)]
    pub production_rate: Option<Decimal>,
    /// Labor hours.
    pub hours: Decimal,
    /// Cost breakdown.
    #[serde(flatten)]
    pub costs: CostBreakdown,
}

impl BudgetLineItem {
    /// Production rate, or zero when unset.
    #[must_use]
    pub fn production_rate_or_zero(&self) -> Decimal {
        self.production_rate.unwrap_or(Decimal::ZERO)
    }
}

/// Input for creating a line item. The store assigns the ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBudgetLineItem {
    /// Dotted line item number.
    pub line_item_number: String,
    /// Scope of work.
    #[serde(default)]
    pub description: String,
    /// Summary grouping key.
    #[serde(default)]
    pub cost_code: String,
    /// Raw quantity.
    pub unconverted_qty: Decimal,
    /// Unit of the raw quantity.
    #[serde(default)]
    pub unconverted_unit_of_measure: String,
    /// Unit cost.
    #[serde(default)]
    pub unit_cost: Decimal,
    /// Unit total.
    #[serde(default)]
    pub unit_total: Decimal,
    /// Conversion factor.
    pub conversion_factor: Decimal,
    /// Quantity in the converted unit.
    pub converted_qty: Decimal,
    /// Converted unit of measure.
    #[serde(default)]
    pub converted_unit_of_measure: String,
    /// Production rate (PX).
    #[serde(default)]
    pub production_rate: Option<Decimal>,
    /// Labor hours.
    pub hours: Decimal,
    /// Cost breakdown.
    #[serde(flatten)]
    pub costs: CostBreakdown,
}

impl NewBudgetLineItem {
    /// Creates an empty line item with a conversion factor of one.
    #[must_use]
    pub fn new(line_item_number: impl Into<String>) -> Self {
        Self {
            line_item_number: line_item_number.into(),
            description: String::new(),
            cost_code: String::new(),
            unconverted_qty: Decimal::ZERO,
            unconverted_unit_of_measure: String::new(),
            unit_cost: Decimal::ZERO,
            unit_total: Decimal::ZERO,
            conversion_factor: Decimal::ONE,
            converted_qty: Decimal::ZERO,
            converted_unit_of_measure: String::new(),
            production_rate: None,
            hours: Decimal::ZERO,
            costs: CostBreakdown::default(),
        }
    }

    /// Materializes the stored item once the store has assigned an ID.
    #[must_use]
    pub fn into_item(self, id: LineItemId, location_id: LocationId) -> BudgetLineItem {
        BudgetLineItem {
            id,
            location_id,
            line_item_number: self.line_item_number,
            description: self.description,
            cost_code: self.cost_code,
            unconverted_qty: self.unconverted_qty,
            unconverted_unit_of_measure: self.unconverted_unit_of_measure,
            unit_cost: self.unit_cost,
            unit_total: self.unit_total,
            conversion_factor: self.conversion_factor,
            converted_qty: self.converted_qty,
            converted_unit_of_measure: self.converted_unit_of_measure,
            production_rate: self.production_rate,
            hours: self.hours,
            costs: self.costs,
        }
    }
}
