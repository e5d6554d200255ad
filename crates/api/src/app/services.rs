use std::sync::Arc;

use stockroom_infra::AppConfig;
use stockroom_infra::service::CatalogService;
use stockroom_infra::store::{CatalogStore, InMemoryCatalogStore, SqliteCatalogStore, StoreError};

/// Type-erased store so the router does not carry a backend type parameter.
pub type SharedCatalogStore = Arc<dyn CatalogStore>;

/// Everything handlers need, shared behind an `Arc` via `Extension`.
pub struct AppServices {
    pub catalog: CatalogService<SharedCatalogStore>,
}

impl AppServices {
    pub fn new(store: SharedCatalogStore) -> Self {
        Self {
            catalog: CatalogService::new(store),
        }
    }

    /// Process-local store; state is lost on restart.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()))
    }

    /// SQLite store from configuration, schema applied.
    pub async fn from_config(config: &AppConfig) -> Result<Self, StoreError> {
        let store =
            SqliteCatalogStore::connect(&config.database_url, config.db_max_connections).await?;
        Ok(Self::new(Arc::new(store)))
    }
}
