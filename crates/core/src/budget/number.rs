//! Dotted line item numbers.
//!
//! `"15"` is a top-level line; `"15.1"` is a child of `"15"`. Nesting is one
//! level deep: any dotted number belongs to the line named by its first
//! segment, so `"15.1.2"` is also a child of `"15"`.

use std::fmt;
use std::str::FromStr;

use super::error::BudgetError;

/// A parsed line item number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LineItemNumber {
    raw: String,
    root_len: usize,
}

impl LineItemNumber {
    /// Parses a line item number.
    ///
    /// Surrounding whitespace is ignored. Empty numbers and numbers with an
    /// empty segment (`"15."`, `".1"`, `"15..1"`) are rejected.
    pub fn parse(input: &str) -> Result<Self, BudgetError> {
        let raw = input.trim();
        if raw.is_empty() || raw.split('.').any(str::is_empty) {
            return Err(BudgetError::InvalidLineNumber(input.to_string()));
        }

        let root_len = raw.find('.').unwrap_or(raw.len());
        Ok(Self {
            raw: raw.to_string(),
            root_len,
        })
    }

    /// The normalized number.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// True when the number has at least one dot.
    #[must_use]
    pub fn is_dotted(&self) -> bool {
        self.root_len < self.raw.len()
    }

    /// The number of the line this one rolls up into, if dotted.
    #[must_use]
    pub fn parent_number(&self) -> Option<&str> {
        self.is_dotted().then(|| &self.raw[..self.root_len])
    }
}

impl fmt::Display for LineItemNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for LineItemNumber {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("15", None)]
    #[case("15.1", Some("15"))]
    #[case(" 26.2 ", Some("26"))]
    #[case("15.1.2", Some("15"))]
    #[case("A-100.3", Some("A-100"))]
    fn test_parent_number(#[case] input: &str, #[case] parent: Option<&str>) {
        let number = LineItemNumber::parse(input).unwrap();
        assert_eq!(number.parent_number(), parent);
        assert_eq!(number.is_dotted(), parent.is_some());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("15.")]
    #[case(".1")]
    #[case("15..1")]
    fn test_invalid_numbers(#[case] input: &str) {
        assert!(matches!(
            LineItemNumber::parse(input),
            Err(BudgetError::InvalidLineNumber(_))
        ));
    }

    #[test]
    fn test_display_is_trimmed() {
        let number: LineItemNumber = "  7.4".parse().unwrap();
        assert_eq!(number.to_string(), "7.4");
        assert_eq!(number.as_str(), "7.4");
    }
}
