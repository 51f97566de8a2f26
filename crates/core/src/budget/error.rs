//! Budget error types.

use sitebook_shared::AppError;
use sitebook_shared::types::LineItemId;
use thiserror::Error;

/// Budget-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    /// Production rate edited on a child line item.
    #[error("Line {line}: child items inherit rate from parent")]
    ChildRateInherited {
        /// Line item number of the child.
        line: String,
    },

    /// Hours edited on a child line item.
    #[error("Line {line}: child items inherit hours from parent")]
    ChildHoursInherited {
        /// Line item number of the child.
        line: String,
    },

    /// Quantity edited on a parent whose quantity is the sum of its children.
    #[error("Line {line}: parent quantity is the sum of its child items")]
    ParentQuantityDerived {
        /// Line item number of the parent.
        line: String,
    },

    /// Line item not found in the budget sheet.
    #[error("Line item not found: {0}")]
    LineItemNotFound(LineItemId),

    /// Line item number is empty or malformed.
    #[error("Invalid line item number: '{0}'")]
    InvalidLineNumber(String),

    /// Two line items share the same number within one location.
    #[error("Duplicate line item number: {0}")]
    DuplicateLineNumber(String),
}

impl BudgetError {
    /// Returns true for errors caused by a disallowed or malformed edit,
    /// which the presentation layer shows inline next to the field.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ChildRateInherited { .. }
                | Self::ChildHoursInherited { .. }
                | Self::ParentQuantityDerived { .. }
                | Self::InvalidLineNumber(_)
        )
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::LineItemNotFound(_) => Self::NotFound(err.to_string()),
            BudgetError::DuplicateLineNumber(_) => Self::Conflict(err.to_string()),
            _ => Self::Validation(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_edit_errors_are_validation() {
        let rate = BudgetError::ChildRateInherited {
            line: "26.1".to_string(),
        };
        let hours = BudgetError::ChildHoursInherited {
            line: "26.1".to_string(),
        };
        assert!(rate.is_validation());
        assert!(hours.is_validation());
        assert_eq!(
            rate.to_string(),
            "Line 26.1: child items inherit rate from parent"
        );
    }

    #[test]
    fn test_app_error_mapping() {
        let not_found: AppError = BudgetError::LineItemNotFound(LineItemId::new()).into();
        assert_eq!(not_found.status_code(), 404);

        let duplicate: AppError = BudgetError::DuplicateLineNumber("15".to_string()).into();
        assert_eq!(duplicate.error_code(), "CONFLICT");

        let child: AppError = BudgetError::ChildHoursInherited {
            line: "15.2".to_string(),
        }
        .into();
        assert_eq!(child.error_code(), "VALIDATION_ERROR");
    }
}
