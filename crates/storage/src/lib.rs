//! promptc-storage: record store for the prompt compiler.
//!
//! Loads a JSON [`Catalog`] into a [`MemoryStore`] that implements
//! `promptc_core::RecordLookup`, keeps user blueprint version history, and
//! runs advisory consistency checks over a catalog.

mod catalog;
mod error;
mod store;
mod validate;

pub use catalog::Catalog;
pub use error::StoreError;
pub use store::{BlueprintDraft, MemoryStore};
pub use validate::{check_catalog, CatalogIssue};
