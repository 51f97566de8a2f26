//! Core business logic for Sitebook.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, hierarchy rules, and recalculations live here.
//!
//! # Modules
//!
//! - `budget` - Budget line items, parent/child hierarchy, and the
//!   quantity / production rate / hours recalculation model

pub mod budget;
