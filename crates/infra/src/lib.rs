//! Infrastructure layer: persistence backends, the catalog service and
//! process configuration.

pub mod config;
pub mod service;
pub mod store;

pub use config::AppConfig;
pub use service::{
    CatalogService, InlineMovementEdit, ProductDetail, ProductSummary, ServiceError, ServiceResult,
};
