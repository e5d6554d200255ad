//! Catalog persistence boundary.
//!
//! `CatalogStore` is the repository seam for products and movements; the
//! in-memory backend serves tests/dev and the SQLite backend serves the
//! deployed binary. Both honor the same contract (see the trait docs), and the
//! shared test suite in `tests.rs` runs against each.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

#[cfg(test)]
mod tests;

pub use in_memory::InMemoryCatalogStore;
pub use r#trait::{CatalogStore, MovementChange, MovementFilter, ProductQuery, StoreError};
pub use sqlite::SqliteCatalogStore;
