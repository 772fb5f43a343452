use std::fmt;

use serde::{Deserialize, Serialize};

use super::{item::Item, storage::Storage};

/// `ColumnRow` reference to exactly one quantity cell, e.g. `B7`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellAddress(String);

impl CellAddress {
    pub fn for_stock(item: &Item, storage: &Storage) -> Self {
        Self(format!("{}{}", storage.column, item.row))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Spreadsheet id plus tab name; every cell read or write is scoped to one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetRef {
    pub sheet_id: String,
    pub tab_name: String,
}

impl SheetRef {
    pub fn new(sheet_id: impl Into<String>, tab_name: impl Into<String>) -> Self {
        Self { sheet_id: sheet_id.into(), tab_name: tab_name.into() }
    }

    /// A1 range for a single cell, `Tab!B7`.
    pub fn range(&self, cell: &CellAddress) -> String {
        format!("{}!{}", self.tab_name, cell)
    }
}
