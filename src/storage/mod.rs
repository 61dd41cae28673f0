pub mod memory;
pub mod provider;
pub mod sqlite;

pub use memory::*;
pub use provider::*;
pub use sqlite::*;

use std::sync::Arc;

use crate::config::{DatabaseConfig, StoreBackend};
use crate::db::Database;
use crate::error::Result;

/// Open the image store selected by configuration
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn ImageStore>> {
    let store: Arc<dyn ImageStore> = match config.backend {
        StoreBackend::Sqlite => {
            let db = Database::new(&config.path).await?;
            db.run_migrations().await?;
            Arc::new(SqliteImageStore::new(db))
        }
        StoreBackend::Memory => Arc::new(MemoryImageStore::new()),
    };

    tracing::info!("Image store initialized ({})", store.store_type());
    Ok(store)
}
