use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use stockroom_core::{MovementId, ProductId};
use stockroom_inventory::{Movement, MovementAction};
use stockroom_products::Product;

/// Storage operation error.
///
/// These are **persistence failures** (constraints, missing rows, backend
/// faults) as opposed to domain errors (field validation), which are raised
/// before a write reaches the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write (e.g. duplicate product code).
    #[error("unique constraint violated on '{field}': {message}")]
    UniqueViolation { field: String, message: String },

    /// The write referenced a row that does not exist (movement → product).
    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    /// A check constraint rejected the write (e.g. negative quantity).
    #[error("constraint violated: {0}")]
    Constraint(String),

    /// The row to update or delete does not exist.
    #[error("not found")]
    NotFound,

    /// Connection, IO or decoding failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn duplicate_code(code: &str) -> Self {
        Self::UniqueViolation {
            field: "code".to_string(),
            message: format!("a product with code '{code}' already exists"),
        }
    }
}

/// Product list query (admin list view).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductQuery {
    /// Case-insensitive substring matched against name or code.
    #[serde(default, alias = "q")]
    pub search: Option<String>,
}

impl ProductQuery {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
        }
    }

    /// The trimmed search term, if any is left after trimming.
    pub fn term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// Movement list filter. Empty filter lists every movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovementFilter {
    pub product_id: Option<ProductId>,
    pub action: Option<MovementAction>,
}

impl MovementFilter {
    pub fn for_product(product_id: ProductId) -> Self {
        Self {
            product_id: Some(product_id),
            action: None,
        }
    }

    pub fn with_action(mut self, action: MovementAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn matches(&self, movement: &Movement) -> bool {
        self.product_id.is_none_or(|p| movement.product_id() == p)
            && self.action.is_none_or(|a| movement.action() == a)
    }
}

/// One already-validated change to a product's movements, applied as part of
/// [`CatalogStore::save_product_form`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementChange {
    Insert(Movement),
    Update(Movement),
    Delete(MovementId),
}

/// Relational catalog store: products and the movements that reference them.
///
/// ## Contract
///
/// Implementations must:
/// - reject a product whose `code` is already used by another product with
///   [`StoreError::UniqueViolation`]
/// - reject a movement whose `product_id` has no product with
///   [`StoreError::ForeignKeyViolation`]
/// - delete a product's movements together with the product
/// - return [`StoreError::NotFound`] when updating or deleting a missing row
/// - list products by `name` ascending (ties by `code`) and movements by
///   `updated_at` descending (ties by id, newest first)
/// - run each write atomically; a failed write leaves no partial state
///
/// Records arrive already validated and timestamped by the domain layer; the
/// store never changes field values.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    async fn update_product(&self, product: &Product) -> Result<(), StoreError>;

    /// Delete a product and, by cascade, all of its movements.
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError>;

    async fn insert_movement(&self, movement: &Movement) -> Result<(), StoreError>;

    async fn get_movement(&self, id: MovementId) -> Result<Option<Movement>, StoreError>;

    async fn update_movement(&self, movement: &Movement) -> Result<(), StoreError>;

    async fn delete_movement(&self, id: MovementId) -> Result<(), StoreError>;

    async fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, StoreError>;

    /// Save a product edit together with inline movement changes, all or nothing.
    async fn save_product_form(
        &self,
        product: &Product,
        changes: &[MovementChange],
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        (**self).insert_product(product).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).get_product(id).await
    }

    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        (**self).update_product(product).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        (**self).delete_product(id).await
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        (**self).list_products(query).await
    }

    async fn insert_movement(&self, movement: &Movement) -> Result<(), StoreError> {
        (**self).insert_movement(movement).await
    }

    async fn get_movement(&self, id: MovementId) -> Result<Option<Movement>, StoreError> {
        (**self).get_movement(id).await
    }

    async fn update_movement(&self, movement: &Movement) -> Result<(), StoreError> {
        (**self).update_movement(movement).await
    }

    async fn delete_movement(&self, id: MovementId) -> Result<(), StoreError> {
        (**self).delete_movement(id).await
    }

    async fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, StoreError> {
        (**self).list_movements(filter).await
    }

    async fn save_product_form(
        &self,
        product: &Product,
        changes: &[MovementChange],
    ) -> Result<(), StoreError> {
        (**self).save_product_form(product, changes).await
    }
}
