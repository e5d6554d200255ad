use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use stockroom_core::{MovementId, ProductId, Timestamped};
use stockroom_inventory::Movement;
use stockroom_products::Product;

use super::r#trait::{CatalogStore, MovementChange, MovementFilter, ProductQuery, StoreError};

#[derive(Debug, Clone, Default)]
struct Tables {
    products: HashMap<ProductId, Product>,
    movements: HashMap<MovementId, Movement>,
}

impl Tables {
    fn check_code_free(&self, product: &Product) -> Result<(), StoreError> {
        let taken = self
            .products
            .values()
            .any(|p| p.code() == product.code() && p.id_typed() != product.id_typed());
        if taken {
            return Err(StoreError::duplicate_code(product.code()));
        }
        Ok(())
    }

    fn check_product_exists(&self, product_id: ProductId) -> Result<(), StoreError> {
        if !self.products.contains_key(&product_id) {
            return Err(StoreError::ForeignKeyViolation(format!(
                "movement references missing product {product_id}"
            )));
        }
        Ok(())
    }

    fn update_product(&mut self, product: &Product) -> Result<(), StoreError> {
        if !self.products.contains_key(&product.id_typed()) {
            return Err(StoreError::NotFound);
        }
        self.check_code_free(product)?;
        self.products.insert(product.id_typed(), product.clone());
        Ok(())
    }

    fn insert_movement(&mut self, movement: &Movement) -> Result<(), StoreError> {
        self.check_product_exists(movement.product_id())?;
        if self.movements.contains_key(&movement.id_typed()) {
            return Err(StoreError::UniqueViolation {
                field: "id".to_string(),
                message: format!("movement {} already exists", movement.id_typed()),
            });
        }
        self.movements.insert(movement.id_typed(), movement.clone());
        Ok(())
    }

    fn update_movement(&mut self, movement: &Movement) -> Result<(), StoreError> {
        if !self.movements.contains_key(&movement.id_typed()) {
            return Err(StoreError::NotFound);
        }
        self.check_product_exists(movement.product_id())?;
        self.movements.insert(movement.id_typed(), movement.clone());
        Ok(())
    }

    fn delete_movement(&mut self, id: MovementId) -> Result<(), StoreError> {
        self.movements.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

/// In-memory catalog store.
///
/// Intended for tests/dev. Both tables sit behind one lock so cascades and
/// form saves are atomic.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    tables: RwLock<Tables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.products.contains_key(&product.id_typed()) {
            return Err(StoreError::UniqueViolation {
                field: "id".to_string(),
                message: format!("product {} already exists", product.id_typed()),
            });
        }
        tables.check_code_free(product)?;
        tables.products.insert(product.id_typed(), product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        self.write()?.update_product(product)
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.products.remove(&id).is_none() {
            return Err(StoreError::NotFound);
        }
        tables.movements.retain(|_, m| m.product_id() != id);
        Ok(())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let tables = self.read()?;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| query.term().is_none_or(|t| p.matches_search(t)))
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.code().cmp(b.code())));
        Ok(products)
    }

    async fn insert_movement(&self, movement: &Movement) -> Result<(), StoreError> {
        self.write()?.insert_movement(movement)
    }

    async fn get_movement(&self, id: MovementId) -> Result<Option<Movement>, StoreError> {
        Ok(self.read()?.movements.get(&id).cloned())
    }

    async fn update_movement(&self, movement: &Movement) -> Result<(), StoreError> {
        self.write()?.update_movement(movement)
    }

    async fn delete_movement(&self, id: MovementId) -> Result<(), StoreError> {
        self.write()?.delete_movement(id)
    }

    async fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, StoreError> {
        let tables = self.read()?;
        let mut movements: Vec<Movement> = tables
            .movements
            .values()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        movements.sort_by(|a, b| {
            b.updated_at()
                .cmp(&a.updated_at())
                .then_with(|| b.id_typed().cmp(&a.id_typed()))
        });
        Ok(movements)
    }

    async fn save_product_form(
        &self,
        product: &Product,
        changes: &[MovementChange],
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;

        // Apply to a scratch copy; swap in only if every change succeeds.
        let mut next = tables.clone();
        next.update_product(product)?;
        for change in changes {
            match change {
                MovementChange::Insert(m) => next.insert_movement(m)?,
                MovementChange::Update(m) => next.update_movement(m)?,
                MovementChange::Delete(id) => next.delete_movement(*id)?,
            }
        }

        *tables = next;
        Ok(())
    }
}
