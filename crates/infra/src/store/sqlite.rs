//! SQLite-backed catalog store.
//!
//! Persists products and movements in two relational tables. Integrity rules
//! live in the schema so they hold for every writer:
//!
//! | Rule | Schema | StoreError |
//! |------|--------|------------|
//! | product code is unique | `product.code UNIQUE` | `UniqueViolation { field: "code" }` |
//! | movement references an existing product | `FOREIGN KEY ... ON DELETE CASCADE` | `ForeignKeyViolation` |
//! | quantity is non-negative | `CHECK (quantity >= 0)` | `Constraint` |
//! | action is a known tag | `CHECK (action IN ('withdrawal', 'deposit'))` | `Constraint` |
//!
//! Foreign keys are switched on for every pooled connection. Timestamps are
//! stored as RFC 3339 UTC text, which sorts chronologically.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection};
use tracing::{debug, instrument};
use uuid::Uuid;

use stockroom_core::{MovementId, ProductId, Timestamped};
use stockroom_inventory::{Movement, MovementAction, Quantity};
use stockroom_products::Product;

use super::r#trait::{CatalogStore, MovementChange, MovementFilter, ProductQuery, StoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS product (
        id          BLOB PRIMARY KEY NOT NULL,
        code        TEXT NOT NULL UNIQUE CHECK (length(code) <= 128),
        name        TEXT NOT NULL,
        is_active   INTEGER NOT NULL DEFAULT 1,
        description TEXT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS product_name_idx ON product (name)",
    r#"
    CREATE TABLE IF NOT EXISTS movement (
        id          BLOB PRIMARY KEY NOT NULL,
        product_id  BLOB NOT NULL REFERENCES product (id) ON DELETE CASCADE,
        action      TEXT NOT NULL DEFAULT 'deposit' CHECK (action IN ('withdrawal', 'deposit')),
        quantity    INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
        note        TEXT NULL,
        created_at  TEXT NOT NULL,
        updated_at  TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS movement_product_idx ON movement (product_id)",
    "CREATE INDEX IF NOT EXISTS movement_updated_idx ON movement (updated_at)",
];

/// SQLite catalog store.
///
/// ## Thread Safety
///
/// `SqlitePool` is `Send + Sync`; the store can be shared behind an `Arc`.
/// Every write runs in its own transaction.
#[derive(Debug, Clone)]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
}

impl SqliteCatalogStore {
    /// Wrap an existing pool. Call [`migrate`](Self::migrate) before use.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// In-memory URLs get a single long-lived connection, since each SQLite
    /// connection would otherwise see its own empty database.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("connect", e))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if is_memory_url(url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self::new(pool);
        store.migrate().await?;
        debug!(url, "sqlite catalog store ready");
        Ok(store)
    }

    /// Fresh private in-memory database (tests/dev).
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO product (id, code, name, is_active, description, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(Uuid::from(product.id_typed()))
        .bind(product.code())
        .bind(product.name())
        .bind(product.is_active())
        .bind(product.description())
        .bind(product.created_at())
        .bind(product.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| code_conflict(map_sqlx_error("insert_product", e), product))?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, code, name, is_active, description, created_at, updated_at
            FROM product
            WHERE id = ?1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| product_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("get_product", e))
    }

    #[instrument(skip(self, product), fields(product_id = %product.id_typed()), err)]
    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;
        write_product(&mut tx, product).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM product WHERE id = ?1")
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, code, name, is_active, description, created_at, updated_at
            FROM product
            ORDER BY name ASC, code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        let products = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_products", e))?;

        // SQLite's lower()/upper() fold ASCII only; the search term is matched
        // in Rust so accented names behave as in the in-memory store.
        Ok(match query.term() {
            Some(term) => products
                .into_iter()
                .filter(|p| p.matches_search(term))
                .collect(),
            None => products,
        })
    }

    #[instrument(skip(self, movement), fields(movement_id = %movement.id_typed(), product_id = %movement.product_id()), err)]
    async fn insert_movement(&self, movement: &Movement) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("insert_movement", e))?;
        insert_movement_row(&mut conn, movement).await
    }

    async fn get_movement(&self, id: MovementId) -> Result<Option<Movement>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, action, quantity, note, created_at, updated_at
            FROM movement
            WHERE id = ?1
            "#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_movement", e))?;

        row.map(|r| movement_from_row(&r))
            .transpose()
            .map_err(|e| map_sqlx_error("get_movement", e))
    }

    #[instrument(skip(self, movement), fields(movement_id = %movement.id_typed()), err)]
    async fn update_movement(&self, movement: &Movement) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("update_movement", e))?;
        update_movement_row(&mut conn, movement).await
    }

    #[instrument(skip(self), fields(movement_id = %id), err)]
    async fn delete_movement(&self, id: MovementId) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("delete_movement", e))?;
        delete_movement_row(&mut conn, id).await
    }

    async fn list_movements(&self, filter: &MovementFilter) -> Result<Vec<Movement>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, action, quantity, note, created_at, updated_at
            FROM movement
            WHERE (?1 IS NULL OR product_id = ?1)
              AND (?2 IS NULL OR action = ?2)
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(filter.product_id.map(Uuid::from))
        .bind(filter.action.map(MovementAction::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        rows.iter()
            .map(movement_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_movements", e))
    }

    #[instrument(skip(self, product, changes), fields(product_id = %product.id_typed(), changes = changes.len()), err)]
    async fn save_product_form(
        &self,
        product: &Product,
        changes: &[MovementChange],
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("save_product_form", e))?;

        write_product(&mut tx, product).await?;
        for change in changes {
            match change {
                MovementChange::Insert(m) => insert_movement_row(&mut tx, m).await?,
                MovementChange::Update(m) => update_movement_row(&mut tx, m).await?,
                MovementChange::Delete(id) => delete_movement_row(&mut tx, *id).await?,
            }
        }

        // Dropping `tx` on any early return above rolls everything back.
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("save_product_form", e))
    }
}

async fn write_product(conn: &mut SqliteConnection, product: &Product) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE product
        SET code = ?2,
            name = ?3,
            is_active = ?4,
            description = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(Uuid::from(product.id_typed()))
    .bind(product.code())
    .bind(product.name())
    .bind(product.is_active())
    .bind(product.description())
    .bind(product.updated_at())
    .execute(&mut *conn)
    .await
    .map_err(|e| code_conflict(map_sqlx_error("update_product", e), product))?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

async fn insert_movement_row(
    conn: &mut SqliteConnection,
    movement: &Movement,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO movement (id, product_id, action, quantity, note, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(Uuid::from(movement.id_typed()))
    .bind(Uuid::from(movement.product_id()))
    .bind(movement.action().as_str())
    .bind(i64::from(movement.quantity()))
    .bind(movement.note())
    .bind(movement.created_at())
    .bind(movement.updated_at())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;
    Ok(())
}

async fn update_movement_row(
    conn: &mut SqliteConnection,
    movement: &Movement,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE movement
        SET product_id = ?2,
            action = ?3,
            quantity = ?4,
            note = ?5,
            updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(Uuid::from(movement.id_typed()))
    .bind(Uuid::from(movement.product_id()))
    .bind(movement.action().as_str())
    .bind(i64::from(movement.quantity()))
    .bind(movement.note())
    .bind(movement.updated_at())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("update_movement", e))?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

async fn delete_movement_row(conn: &mut SqliteConnection, id: MovementId) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM movement WHERE id = ?1")
        .bind(Uuid::from(id))
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_movement", e))?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

fn product_from_row(row: &SqliteRow) -> Result<Product, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Product::restore(
        ProductId::from_uuid(id),
        row.try_get("code")?,
        row.try_get("name")?,
        row.try_get("is_active")?,
        row.try_get("description")?,
        created_at,
        updated_at,
    ))
}

fn movement_from_row(row: &SqliteRow) -> Result<Movement, sqlx::Error> {
    let id: Uuid = row.try_get("id")?;
    let product_id: Uuid = row.try_get("product_id")?;
    let action: String = row.try_get("action")?;
    let quantity: i64 = row.try_get("quantity")?;

    let action = MovementAction::from_str(&action).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    let quantity = Quantity::new(quantity).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(Movement::restore(
        MovementId::from_uuid(id),
        ProductId::from_uuid(product_id),
        action,
        quantity,
        row.try_get("note")?,
        row.try_get("created_at")?,
        row.try_get("updated_at")?,
    ))
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Reword a unique violation on `product.code` with the offending code.
fn code_conflict(err: StoreError, product: &Product) -> StoreError {
    match err {
        StoreError::UniqueViolation { ref field, .. } if field == "code" => {
            StoreError::duplicate_code(product.code())
        }
        other => other,
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            if db_err.is_unique_violation() {
                let field = if db_err.message().contains("product.code") {
                    "code"
                } else {
                    "id"
                };
                StoreError::UniqueViolation {
                    field: field.to_string(),
                    message: msg,
                }
            } else if db_err.is_foreign_key_violation() {
                StoreError::ForeignKeyViolation(msg)
            } else if db_err.is_check_violation() {
                StoreError::Constraint(msg)
            } else {
                StoreError::Backend(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
