//! JSON sheet files for working on a budget without the REST API.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sitebook_core::budget::{BudgetLineItem, ImportRow};
use sitebook_shared::types::LocationId;

/// A location's line items as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetFile {
    pub location_id: LocationId,
    #[serde(default)]
    pub items: Vec<BudgetLineItem>,
}

impl SheetFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read sheet file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse sheet file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write sheet file {}", path.display()))
    }
}

/// Reads import rows: a JSON array of raw cell text per row.
pub fn load_import_rows(path: &Path) -> Result<Vec<ImportRow>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read import file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse import file {}", path.display()))
}
