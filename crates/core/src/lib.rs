//! `stockroom-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives shared by the catalog and
//! inventory crates (no storage, no HTTP).

pub mod error;
pub mod id;
pub mod timestamps;

pub use error::{DomainError, DomainResult};
pub use id::{MovementId, ProductId};
pub use timestamps::Timestamped;
