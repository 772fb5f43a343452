//! Google Sheets backing for the stock store.
//!
//! - **Auth** (`auth`) - service-account JWT exchange with a cached bearer token
//! - **Client** (`client`) - `spreadsheets.values` reads and writes behind `CellStore`
//!
//! Reads use `UNFORMATTED_VALUE` so quantities arrive as numbers; writes use
//! `USER_ENTERED` so the sheet applies its own formatting.

pub mod auth;
pub mod client;

pub use auth::{ServiceAccountTokenSource, StaticTokenSource, TokenSource};
pub use client::SheetsClient;
