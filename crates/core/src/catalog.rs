use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::item::{Item, ItemId};
use crate::domain::storage::{Storage, StorageId};
use crate::errors::{DomainError, ReferenceKind};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("catalog validation failed: {0}")]
    Validation(String),
}

/// Static items and storages. Loaded once at startup, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<Item>,
    storages: Vec<Storage>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    items: Vec<Item>,
    #[serde(default)]
    storages: Vec<Storage>,
}

impl Catalog {
    pub fn new(items: Vec<Item>, storages: Vec<Storage>) -> Result<Self, CatalogError> {
        let storages = storages
            .into_iter()
            .map(|storage| {
                let column = storage.column.trim().to_ascii_uppercase();
                Storage { column, ..storage }
            })
            .collect::<Vec<_>>();

        validate_items(&items)?;
        validate_storages(&storages)?;

        Ok(Self { items, storages })
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file = toml::from_str::<CatalogFile>(raw)?;
        Self::new(file.items, file.storages)
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn storages(&self) -> &[Storage] {
        &self.storages
    }

    pub fn find_item(&self, id: &str) -> Result<&Item, DomainError> {
        self.items.iter().find(|item| item.id.0 == id).ok_or_else(|| {
            DomainError::UnknownReference { kind: ReferenceKind::Item, id: id.to_owned() }
        })
    }

    pub fn find_storage(&self, id: &str) -> Result<&Storage, DomainError> {
        self.storages.iter().find(|storage| storage.id.0 == id).ok_or_else(|| {
            DomainError::UnknownReference { kind: ReferenceKind::Storage, id: id.to_owned() }
        })
    }
}

fn validate_items(items: &[Item]) -> Result<(), CatalogError> {
    let mut seen = HashSet::<&ItemId>::new();
    for item in items {
        if item.id.0.trim().is_empty() {
            return Err(CatalogError::Validation("item id must not be empty".to_string()));
        }
        if item.row == 0 {
            return Err(CatalogError::Validation(format!(
                "item `{}` row must be 1 or greater",
                item.id.0
            )));
        }
        if !seen.insert(&item.id) {
            return Err(CatalogError::Validation(format!("duplicate item id `{}`", item.id.0)));
        }
    }
    Ok(())
}

fn validate_storages(storages: &[Storage]) -> Result<(), CatalogError> {
    let mut seen = HashSet::<&StorageId>::new();
    for storage in storages {
        if storage.id.0.trim().is_empty() {
            return Err(CatalogError::Validation("storage id must not be empty".to_string()));
        }
        let column_valid = !storage.column.is_empty()
            && storage.column.chars().all(|ch| ch.is_ascii_alphabetic());
        if !column_valid {
            return Err(CatalogError::Validation(format!(
                "storage `{}` column `{}` must be letters only",
                storage.id.0, storage.column
            )));
        }
        if !seen.insert(&storage.id) {
            return Err(CatalogError::Validation(format!(
                "duplicate storage id `{}`",
                storage.id.0
            )));
        }
    }
    Ok(())
}
