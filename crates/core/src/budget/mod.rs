//! Budget line items and the quantity / production rate / hours
//! recalculation model.

pub mod error;
pub mod import;
pub mod number;
pub mod numeric;
pub mod recalc;
pub mod sheet;
pub mod summary;
pub mod types;


pub use error::BudgetError;
pub use import::{ImportNormalizer, ImportOutcome, ImportRow, SkipReason, SkippedRow};
pub use number::LineItemNumber;
pub use recalc::{BudgetLineRecalculator, LineItemWrite, Recalculation, WriteReason};
pub use sheet::{BudgetSheet, LineRole};
pub use summary::{BudgetSummary, CostCodeSummary};
pub use types::{BudgetLineItem, CostBreakdown, NewBudgetLineItem};
