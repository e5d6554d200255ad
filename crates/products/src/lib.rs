//! Products domain module.
//!
//! This crate contains the rules for catalog products, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage). Persistence lives in
//! `stockroom-infra`.

pub mod product;

pub use product::{
    normalize_name, CreateProduct, Product, UpdateProduct, CODE_MAX_LEN, NAME_MAX_LEN,
};
pub use stockroom_core::ProductId;
