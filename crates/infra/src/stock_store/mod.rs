//! Inventory store backends.
//!
//! Two statically known implementations of `InventoryStore`:
//! - `InMemoryInventoryStore`: reference store for tests/dev
//! - `TransactionalInventoryStore<PostgresStockBackend>`: conditional atomic
//!   writes against PostgreSQL
//!
//! The backend is chosen once at startup from validated configuration.

pub mod in_memory;
pub mod postgres;
pub mod transactional;

use std::sync::Arc;

use tracing::info;

use stockline_inventory::InventoryStore;

use crate::config::{ConfigError, StoreBackendConfig};

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresStockBackend;
pub use transactional::{
    BackendError, BackendOperation, ConditionalDecrement, StockBackend, TransactionalInventoryStore,
    MAX_BATCH_SKUS,
};

/// Shared, type-erased store handle.
pub type SharedStore = Arc<dyn InventoryStore>;

/// Build the configured store. No silent fallback between backends.
///
/// Must be called from within a tokio runtime (the postgres pool needs one).
pub fn build_store(config: &StoreBackendConfig) -> Result<SharedStore, ConfigError> {
    match config {
        StoreBackendConfig::Memory { seed } => {
            let store = InMemoryInventoryStore::with_stock(seed.iter().map(|(sku, qty)| (sku.clone(), *qty)));
            info!(seeded_skus = seed.len(), "using in-memory inventory store");
            Ok(Arc::new(store))
        }
        StoreBackendConfig::Postgres { database_url, table } => {
            let backend = PostgresStockBackend::connect_lazy(database_url, table.clone())?;
            info!(%table, "using postgres inventory store");
            Ok(Arc::new(TransactionalInventoryStore::new(backend)))
        }
    }
}
