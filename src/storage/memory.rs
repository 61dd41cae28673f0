use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::models::{ImageRecord, NewImage};
use crate::storage::ImageStore;

/// In-process image store, used for development and tests
pub struct MemoryImageStore {
    inner: RwLock<Inner>,
}

struct Inner {
    next_id: i64,
    images: BTreeMap<i64, ImageRecord>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                images: BTreeMap::new(),
            }),
        }
    }
}

impl Default for MemoryImageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn create(&self, image: NewImage) -> Result<ImageRecord> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let record = ImageRecord {
            id,
            filename: image.filename,
            originalname: image.originalname,
            mimetype: image.mimetype,
            size: image.size,
            data: image.data,
            upload_date: Utc::now(),
        };
        inner.images.insert(id, record.clone());
        Ok(record)
    }

    async fn get_all(&self) -> Result<Vec<ImageRecord>> {
        let inner = self.inner.read().await;
        let mut images: Vec<ImageRecord> = inner.images.values().cloned().collect();
        images.sort_by(|a, b| {
            b.upload_date
                .cmp(&a.upload_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(images)
    }

    async fn get(&self, id: i64) -> Result<Option<ImageRecord>> {
        Ok(self.inner.read().await.images.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.inner.write().await.images.remove(&id).is_some())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_monotonic_and_never_reused() {
        let store = MemoryImageStore::new();
        let a = store
            .create(NewImage::from_bytes("a.png", "image/png", b"a"))
            .await
            .unwrap();
        assert!(store.delete(a.id).await.unwrap());

        let b = store
            .create(NewImage::from_bytes("b.png", "image/png", b"b"))
            .await
            .unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_get_all_newest_first() {
        let store = MemoryImageStore::new();
        let a = store
            .create(NewImage::from_bytes("a.png", "image/png", b"a"))
            .await
            .unwrap();
        let b = store
            .create(NewImage::from_bytes("b.png", "image/png", b"b"))
            .await
            .unwrap();

        let ids: Vec<i64> = store.get_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_delete_reports_missing() {
        let store = MemoryImageStore::new();
        assert!(!store.delete(5).await.unwrap());
        assert!(store.get(5).await.unwrap().is_none());
    }
}
