//! IDs of the records a budget is built from.
//!
//! The item store assigns a UUID to every location and line item and the
//! REST API carries it as a bare string. Each kind of record gets its own
//! newtype so an edit can never be addressed to a location by mistake.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares an ID newtype that (de)serializes as the bare UUID string the
/// item store uses.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates an ID for a record the store has not seen, e.g. one
            /// created by the in-memory store. UUID v7, so IDs sort by age.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Wraps a UUID the store or the command line handed out.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// The UUID as the store knows it.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(
    LocationId,
    "A project location. Owns one budget sheet of line items."
);
typed_id!(
    LineItemId,
    "A budget line item. Stable across renumbering, unlike the dotted line number."
);

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
