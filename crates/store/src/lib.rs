//! Item store access and the budget editor.
//!
//! This crate provides:
//! - The `ItemStore` interface with in-memory and HTTP implementations
//! - Debounced and immediate write scheduling
//! - `BudgetEditor`, which applies recalculations to local state and
//!   persists the resulting writes

pub mod editor;
pub mod error;
pub mod http;
pub mod memory;
pub mod scheduler;
pub mod store;

pub use editor::{BudgetEditor, EditError, EditReport, ImportReport, WriteMode};
pub use error::StoreError;
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use scheduler::{PersistenceFailure, WriteScheduler};
pub use store::ItemStore;
