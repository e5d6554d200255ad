//! Catalog application service.
//!
//! `CatalogService` is the write/read pipeline used by the HTTP layer:
//!
//! ```text
//! command
//!   ↓
//! 1. Build/validate the record (pure domain code; rejects bad input)
//!   ↓
//! 2. Check references the domain cannot see (product exists, movement belongs)
//!   ↓
//! 3. Persist through the `CatalogStore` (one atomic write)
//! ```
//!
//! Nothing reaches the store unless step 1 succeeded, so a rejected command
//! never leaves partial state behind.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, instrument, warn};

use stockroom_core::{DomainError, MovementId, ProductId};
use stockroom_inventory::{Movement, RecordMovement, StockLevel, UpdateMovement};
use stockroom_products::{CreateProduct, Product, UpdateProduct};

use crate::store::{CatalogStore, MovementChange, MovementFilter, ProductQuery, StoreError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Input rejected before persistence.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Persistence failed (constraint, missing row, backend).
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found() -> Self {
        Self::Domain(DomainError::NotFound)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::Domain(DomainError::NotFound) | ServiceError::Store(StoreError::NotFound)
        )
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Product row for the admin list view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductSummary {
    pub product: Product,
    pub stock: StockLevel,
}

/// Product detail view: the product, its movements (newest first) and its total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDetail {
    pub product: Product,
    pub movements: Vec<Movement>,
    pub stock: StockLevel,
}

/// One row of the inline movement editor shown on a product's edit form.
///
/// Each row goes through the same validation as a standalone movement write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineMovementEdit {
    Add {
        action: Option<String>,
        quantity: Option<i64>,
        note: Option<String>,
    },
    Change {
        id: MovementId,
        action: Option<String>,
        quantity: Option<i64>,
        note: Option<String>,
    },
    Remove {
        id: MovementId,
    },
}

/// Orchestrates domain validation and persistence for products and movements.
#[derive(Debug, Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S> CatalogService<S>
where
    S: CatalogStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    // -------------------------
    // Products
    // -------------------------

    #[instrument(skip(self, cmd), fields(product_id = %cmd.product_id, code = %cmd.code), err)]
    pub async fn create_product(&self, cmd: CreateProduct) -> ServiceResult<Product> {
        let product = Product::create(cmd)?;
        self.store
            .insert_product(&product)
            .await
            .inspect_err(|e| log_conflict(e, &product))?;

        info!(product_id = %product.id_typed(), "product created");
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> ServiceResult<Product> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(ServiceError::not_found)
    }

    #[instrument(skip(self, cmd), fields(product_id = %id), err)]
    pub async fn update_product(&self, id: ProductId, cmd: UpdateProduct) -> ServiceResult<Product> {
        let current = self.get_product(id).await?;
        let product = current.edit(&cmd)?;
        self.store
            .update_product(&product)
            .await
            .inspect_err(|e| log_conflict(e, &product))?;

        info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Delete a product; its movements go with it.
    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn delete_product(&self, id: ProductId) -> ServiceResult<()> {
        self.store.delete_product(id).await?;
        info!(product_id = %id, "product deleted (movements cascaded)");
        Ok(())
    }

    pub async fn list_products(&self, query: &ProductQuery) -> ServiceResult<Vec<Product>> {
        Ok(self.store.list_products(query).await?)
    }

    /// Deposits minus withdrawals for one product, computed from its current movements.
    pub async fn warehouse_total(&self, id: ProductId) -> ServiceResult<StockLevel> {
        self.get_product(id).await?;
        let movements = self.store.list_movements(&MovementFilter::for_product(id)).await?;
        Ok(StockLevel::from_movements(&movements))
    }

    /// Products for the admin list (name ascending), each with its warehouse total.
    pub async fn product_summaries(&self, query: &ProductQuery) -> ServiceResult<Vec<ProductSummary>> {
        let products = self.store.list_products(query).await?;
        let mut summaries = Vec::with_capacity(products.len());
        for product in products {
            let movements = self
                .store
                .list_movements(&MovementFilter::for_product(product.id_typed()))
                .await?;
            summaries.push(ProductSummary {
                stock: StockLevel::from_movements(&movements),
                product,
            });
        }
        Ok(summaries)
    }

    pub async fn product_detail(&self, id: ProductId) -> ServiceResult<ProductDetail> {
        let product = self.get_product(id).await?;
        let movements = self.store.list_movements(&MovementFilter::for_product(id)).await?;
        Ok(ProductDetail {
            stock: StockLevel::from_movements(&movements),
            product,
            movements,
        })
    }

    /// Save a product's edit form: the product fields plus its inline movement rows.
    ///
    /// Every row is validated before anything is written; the store then applies
    /// the product update and all rows in one atomic unit.
    #[instrument(skip(self, cmd, edits), fields(product_id = %id, rows = edits.len()), err)]
    pub async fn save_product_form(
        &self,
        id: ProductId,
        cmd: UpdateProduct,
        edits: Vec<InlineMovementEdit>,
    ) -> ServiceResult<ProductDetail> {
        let current = self.get_product(id).await?;
        let product = current.edit(&cmd)?;

        let existing: HashMap<MovementId, Movement> = self
            .store
            .list_movements(&MovementFilter::for_product(id))
            .await?
            .into_iter()
            .map(|m| (m.id_typed(), m))
            .collect();

        let mut changes = Vec::with_capacity(edits.len());
        for edit in edits {
            let change = match edit {
                InlineMovementEdit::Add {
                    action,
                    quantity,
                    note,
                } => MovementChange::Insert(Movement::record(RecordMovement {
                    movement_id: MovementId::new(),
                    product_id: id,
                    action,
                    quantity,
                    note,
                    occurred_at: cmd.occurred_at,
                })?),
                InlineMovementEdit::Change {
                    id: movement_id,
                    action,
                    quantity,
                    note,
                } => {
                    let movement = existing
                        .get(&movement_id)
                        .ok_or_else(|| not_owned(movement_id, id))?;
                    MovementChange::Update(movement.edit(&UpdateMovement {
                        product_id: None,
                        action,
                        quantity,
                        note,
                        occurred_at: cmd.occurred_at,
                    })?)
                }
                InlineMovementEdit::Remove { id: movement_id } => {
                    if !existing.contains_key(&movement_id) {
                        return Err(not_owned(movement_id, id).into());
                    }
                    MovementChange::Delete(movement_id)
                }
            };
            changes.push(change);
        }

        self.store
            .save_product_form(&product, &changes)
            .await
            .inspect_err(|e| log_conflict(e, &product))?;

        info!(product_id = %id, changes = changes.len(), "product form saved");
        self.product_detail(id).await
    }

    // -------------------------
    // Movements
    // -------------------------

    #[instrument(skip(self, cmd), fields(movement_id = %cmd.movement_id, product_id = %cmd.product_id), err)]
    pub async fn record_movement(&self, cmd: RecordMovement) -> ServiceResult<Movement> {
        let movement = Movement::record(cmd)?;
        self.require_product_ref(movement.product_id()).await?;
        self.store.insert_movement(&movement).await?;

        info!(
            movement_id = %movement.id_typed(),
            action = %movement.action(),
            quantity = %movement.quantity(),
            "movement recorded"
        );
        Ok(movement)
    }

    pub async fn get_movement(&self, id: MovementId) -> ServiceResult<Movement> {
        self.store
            .get_movement(id)
            .await?
            .ok_or_else(ServiceError::not_found)
    }

    #[instrument(skip(self, cmd), fields(movement_id = %id), err)]
    pub async fn update_movement(&self, id: MovementId, cmd: UpdateMovement) -> ServiceResult<Movement> {
        let current = self.get_movement(id).await?;
        let movement = current.edit(&cmd)?;
        if let Some(product_id) = cmd.product_id {
            self.require_product_ref(product_id).await?;
        }
        self.store.update_movement(&movement).await?;

        info!(movement_id = %id, "movement updated");
        Ok(movement)
    }

    #[instrument(skip(self), fields(movement_id = %id), err)]
    pub async fn delete_movement(&self, id: MovementId) -> ServiceResult<()> {
        self.store.delete_movement(id).await?;
        info!(movement_id = %id, "movement deleted");
        Ok(())
    }

    /// Movements matching `filter`, most recently modified first.
    pub async fn list_movements(&self, filter: &MovementFilter) -> ServiceResult<Vec<Movement>> {
        Ok(self.store.list_movements(filter).await?)
    }

    async fn require_product_ref(&self, product_id: ProductId) -> ServiceResult<()> {
        match self.store.get_product(product_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::field(
                "product_id",
                format!("product {product_id} does not exist"),
            )
            .into()),
        }
    }
}

fn not_owned(movement_id: MovementId, product_id: ProductId) -> DomainError {
    DomainError::field(
        "movements",
        format!("movement {movement_id} does not belong to product {product_id}"),
    )
}

fn log_conflict(err: &StoreError, product: &Product) {
    if let StoreError::UniqueViolation { field, .. } = err {
        warn!(
            product_id = %product.id_typed(),
            code = %product.code(),
            field = %field,
            "product write rejected by unique constraint"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use stockroom_core::Timestamped;
    use stockroom_inventory::MovementAction;

    use crate::store::InMemoryCatalogStore;

    fn service() -> CatalogService<InMemoryCatalogStore> {
        CatalogService::new(InMemoryCatalogStore::new())
    }

    fn t0() -> DateTime<Utc> {
        Utc::now()
    }

    async fn product(svc: &CatalogService<InMemoryCatalogStore>, code: &str, name: &str) -> Product {
        svc.create_product(CreateProduct::new(code, name, t0())).await.unwrap()
    }

    async fn movement(
        svc: &CatalogService<InMemoryCatalogStore>,
        product_id: ProductId,
        action: MovementAction,
        quantity: i64,
    ) -> Movement {
        svc.record_movement(RecordMovement::new(product_id, action, quantity, t0()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn total_is_deposits_minus_withdrawals() {
        let svc = service();
        let p = product(&svc, "SKU-1", "widget").await;
        movement(&svc, p.id_typed(), MovementAction::Deposit, 50).await;
        movement(&svc, p.id_typed(), MovementAction::Withdrawal, 20).await;
        movement(&svc, p.id_typed(), MovementAction::Deposit, 5).await;

        assert_eq!(svc.warehouse_total(p.id_typed()).await.unwrap().total, 35);
    }

    #[tokio::test]
    async fn total_of_product_without_movements_is_zero() {
        let svc = service();
        let p = product(&svc, "SKU-1", "widget").await;
        assert_eq!(svc.warehouse_total(p.id_typed()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn total_of_missing_product_is_not_found() {
        let svc = service();
        let err = svc.warehouse_total(ProductId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_and_first_kept() {
        let svc = service();
        let first = product(&svc, "SKU-1", "widget").await;

        let err = svc
            .create_product(CreateProduct::new("SKU-1", "gadget", t0()))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::UniqueViolation { .. })));

        let stored = svc.get_product(first.id_typed()).await.unwrap();
        assert_eq!(stored, first);
        assert_eq!(svc.list_products(&ProductQuery::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_movement_never_reaches_the_store() {
        let svc = service();
        let p = product(&svc, "SKU-1", "widget").await;

        let negative = RecordMovement::new(p.id_typed(), MovementAction::Deposit, -1, t0());
        assert!(matches!(
            svc.record_movement(negative).await,
            Err(ServiceError::Domain(DomainError::Validation(_)))
        ));

        let mut transfer = RecordMovement::new(p.id_typed(), MovementAction::Deposit, 3, t0());
        transfer.action = Some("transfer".to_string());
        assert!(svc.record_movement(transfer).await.is_err());

        let all = svc.list_movements(&MovementFilter::default()).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn movement_for_unknown_product_is_a_validation_error() {
        let svc = service();
        let cmd = RecordMovement::new(ProductId::new(), MovementAction::Deposit, 1, t0());
        match svc.record_movement(cmd).await.unwrap_err() {
            ServiceError::Domain(DomainError::Validation(msg)) => assert!(msg.starts_with("product_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn deleting_product_cascades_to_movements() {
        let svc = service();
        let p = product(&svc, "SKU-1", "widget").await;
        let other = product(&svc, "SKU-2", "gadget").await;
        movement(&svc, p.id_typed(), MovementAction::Deposit, 4).await;
        movement(&svc, p.id_typed(), MovementAction::Withdrawal, 1).await;
        movement(&svc, other.id_typed(), MovementAction::Deposit, 9).await;

        svc.delete_product(p.id_typed()).await.unwrap();

        let left = svc
            .list_movements(&MovementFilter::for_product(p.id_typed()))
            .await
            .unwrap();
        assert!(left.is_empty());
        assert_eq!(svc.warehouse_total(other.id_typed()).await.unwrap().total, 9);
    }

    #[tokio::test]
    async fn update_renormalizes_name_and_refreshes_timestamp() {
        let svc = service();
        let p = product(&svc, "SKU-1", "widget").await;
        let later = p.updated_at() + Duration::seconds(5);

        let updated = svc
            .update_product(
                p.id_typed(),
                UpdateProduct {
                    name: Some("blue widget".to_string()),
                    ..UpdateProduct::touch(later)
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name(), "BLUE WIDGET");
        assert_eq!(updated.updated_at(), later);
        assert_eq!(updated.created_at(), p.created_at());
        let stored = svc.get_product(p.id_typed()).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn product_form_applies_inline_rows_atomically() {
        let svc = service();
        let p = product(&svc, "SKU-1", "widget").await;
        let keep = movement(&svc, p.id_typed(), MovementAction::Deposit, 10).await;
        let drop = movement(&svc, p.id_typed(), MovementAction::Deposit, 99).await;

        let detail = svc
            .save_product_form(
                p.id_typed(),
                UpdateProduct::touch(t0() + Duration::seconds(1)),
                vec![
                    InlineMovementEdit::Change {
                        id: keep.id_typed(),
                        action: None,
                        quantity: Some(12),
                        note: None,
                    },
                    InlineMovementEdit::Remove { id: drop.id_typed() },
                    InlineMovementEdit::Add {
                        action: Some("withdrawal".to_string()),
                        quantity: Some(2),
                        note: Some("damaged".to_string()),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(detail.movements.len(), 2);
        assert_eq!(detail.stock.total, 10);
    }

    #[tokio::test]
    async fn invalid_inline_row_rejects_whole_form() {
        let svc = service();
        let p = product(&svc, "SKU-1", "widget").await;
        let m = movement(&svc, p.id_typed(), MovementAction::Deposit, 10).await;

        let err = svc
            .save_product_form(
                p.id_typed(),
                UpdateProduct {
                    name: Some("renamed".to_string()),
                    ..UpdateProduct::touch(t0())
                },
                vec![
                    InlineMovementEdit::Remove { id: m.id_typed() },
                    InlineMovementEdit::Add {
                        action: None,
                        quantity: Some(-1),
                        note: None,
                    },
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let detail = svc.product_detail(p.id_typed()).await.unwrap();
        assert_eq!(detail.product.name(), "WIDGET");
        assert_eq!(detail.movements, vec![m]);
    }

    #[tokio::test]
    async fn inline_rows_cannot_touch_other_products_movements() {
        let svc = service();
        let p = product(&svc, "SKU-1", "widget").await;
        let other = product(&svc, "SKU-2", "gadget").await;
        let foreign = movement(&svc, other.id_typed(), MovementAction::Deposit, 3).await;

        let err = svc
            .save_product_form(
                p.id_typed(),
                UpdateProduct::touch(t0()),
                vec![InlineMovementEdit::Remove { id: foreign.id_typed() }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));
        assert!(svc.get_movement(foreign.id_typed()).await.is_ok());
    }

    #[tokio::test]
    async fn summaries_carry_totals_in_name_order() {
        let svc = service();
        let b = product(&svc, "B", "bolt").await;
        let a = product(&svc, "A", "anchor").await;
        movement(&svc, b.id_typed(), MovementAction::Withdrawal, 4).await;
        movement(&svc, a.id_typed(), MovementAction::Deposit, 2).await;

        let rows = svc.product_summaries(&ProductQuery::default()).await.unwrap();
        let view: Vec<(&str, i64)> = rows
            .iter()
            .map(|r| (r.product.name(), r.stock.total))
            .collect();
        assert_eq!(view, vec![("ANCHOR", 2), ("BOLT", -4)]);
    }
}
