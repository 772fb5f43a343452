//! Seam between the stock logic and the external tabular store.
//!
//! Every read and write round-trips to the store; nothing is cached here.
//! `InMemoryCellStore` backs tests and local runs without a spreadsheet.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::domain::cell::{CellAddress, SheetRef};

/// Raw value as stored; numeric coercion is the caller's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(number) => number.as_f64().map(Self::Number),
            serde_json::Value::String(text) => Some(Self::Text(text.clone())),
            serde_json::Value::Bool(flag) => Some(Self::Bool(*flag)),
            _ => None,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(number) => write!(f, "{number}"),
            Self::Text(text) => f.write_str(text),
            Self::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store transport failed: {0}")]
    Transport(String),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store authentication failed: {0}")]
    Auth(String),
    #[error("store response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CellStore: Send + Sync {
    /// `Ok(None)` when the cell has never been written.
    async fn get_cell(
        &self,
        sheet: &SheetRef,
        cell: &CellAddress,
    ) -> Result<Option<CellValue>, StoreError>;

    /// Writes one literal number that the store may reinterpret (never a formula).
    async fn update_cell(
        &self,
        sheet: &SheetRef,
        cell: &CellAddress,
        value: i64,
    ) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedWrite {
    pub range: String,
    pub value: i64,
}

#[derive(Default)]
struct MemoryState {
    cells: HashMap<String, CellValue>,
    writes: Vec<RecordedWrite>,
    reads: Vec<String>,
    failing_ranges: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryCellStore {
    state: RwLock<MemoryState>,
}

impl InMemoryCellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, sheet: &SheetRef, cell: &str, value: CellValue) {
        let range = format!("{}!{}", sheet.tab_name, cell);
        let mut state = self.state.write().await;
        state.cells.insert(scoped_key(sheet, &range), value);
    }

    /// Makes subsequent writes to `cell` fail with a transport error.
    pub async fn fail_writes_to(&self, sheet: &SheetRef, cell: &str) {
        let range = format!("{}!{}", sheet.tab_name, cell);
        let mut state = self.state.write().await;
        state.failing_ranges.insert(scoped_key(sheet, &range));
    }

    pub async fn value(&self, sheet: &SheetRef, cell: &str) -> Option<CellValue> {
        let range = format!("{}!{}", sheet.tab_name, cell);
        let state = self.state.read().await;
        state.cells.get(&scoped_key(sheet, &range)).cloned()
    }

    pub async fn writes(&self) -> Vec<RecordedWrite> {
        self.state.read().await.writes.clone()
    }

    pub async fn reads(&self) -> Vec<String> {
        self.state.read().await.reads.clone()
    }
}

fn scoped_key(sheet: &SheetRef, range: &str) -> String {
    format!("{}/{}", sheet.sheet_id, range)
}

#[async_trait]
impl CellStore for InMemoryCellStore {
    async fn get_cell(
        &self,
        sheet: &SheetRef,
        cell: &CellAddress,
    ) -> Result<Option<CellValue>, StoreError> {
        let range = sheet.range(cell);
        let mut state = self.state.write().await;
        state.reads.push(range.clone());
        Ok(state.cells.get(&scoped_key(sheet, &range)).cloned())
    }

    async fn update_cell(
        &self,
        sheet: &SheetRef,
        cell: &CellAddress,
        value: i64,
    ) -> Result<(), StoreError> {
        let range = sheet.range(cell);
        let key = scoped_key(sheet, &range);
        let mut state = self.state.write().await;
        if state.failing_ranges.contains(&key) {
            return Err(StoreError::Transport(format!("write to {range} refused")));
        }
        state.cells.insert(key, CellValue::Number(value as f64));
        state.writes.push(RecordedWrite { range, value });
        Ok(())
    }
}
