pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod stock;
pub mod store;

pub use catalog::{Catalog, CatalogError};
pub use domain::cell::{CellAddress, SheetRef};
pub use domain::item::{Item, ItemId};
pub use domain::storage::{Storage, StorageId};
pub use errors::{ApplicationError, DomainError, InterfaceError, ReferenceKind};
pub use stock::{EditPlan, GuardViolation, MovePlan, Verdict};
pub use store::{CellStore, CellValue, InMemoryCellStore, StoreError};
