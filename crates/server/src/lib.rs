//! Stockbot server runtime.
//!
//! - **Front door** (`front_door`) - verifies, decodes and defers webhook calls
//! - **Bus** (`bus`) - bounded in-process queue between the two paths
//! - **Worker** (`worker`) - runs commands and edits the deferred reply
//! - **Health** (`health`) - readiness of the catalog and command table
//! - **Bootstrap** (`bootstrap`) - config, catalog and client wiring

pub mod bootstrap;
pub mod bus;
pub mod front_door;
pub mod health;
pub mod worker;
