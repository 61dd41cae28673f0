use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ImageRecord, NewImage};

/// Image record store
///
/// Records are immutable once created, so implementations need no
/// cross-record transactions or concurrency tokens.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist a new record, assigning its id and upload date
    async fn create(&self, image: NewImage) -> Result<ImageRecord>;

    /// All records, newest upload first
    async fn get_all(&self) -> Result<Vec<ImageRecord>>;

    async fn get(&self, id: i64) -> Result<Option<ImageRecord>>;

    /// Remove a record; `false` when no record had this id
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Get the store type name
    fn store_type(&self) -> &'static str;
}
