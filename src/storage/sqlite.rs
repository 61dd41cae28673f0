use async_trait::async_trait;
use chrono::Utc;

use crate::db::Database;
use crate::error::Result;
use crate::models::{ImageRecord, NewImage};
use crate::storage::ImageStore;

/// SQLite backed image store
pub struct SqliteImageStore {
    db: Database,
}

impl SqliteImageStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    async fn create(&self, image: NewImage) -> Result<ImageRecord> {
        let record: ImageRecord = sqlx::query_as(
            r#"
            INSERT INTO images (filename, originalname, mimetype, size, data, upload_date)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, filename, originalname, mimetype, size, data, upload_date
            "#,
        )
        .bind(&image.filename)
        .bind(&image.originalname)
        .bind(&image.mimetype)
        .bind(image.size)
        .bind(&image.data)
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;

        tracing::debug!("Inserted image {} ({})", record.id, record.filename);
        Ok(record)
    }

    async fn get_all(&self) -> Result<Vec<ImageRecord>> {
        let images = sqlx::query_as("SELECT * FROM images ORDER BY upload_date DESC, id DESC")
            .fetch_all(self.db.pool())
            .await?;
        Ok(images)
    }

    async fn get(&self, id: i64) -> Result<Option<ImageRecord>> {
        let image = sqlx::query_as("SELECT * FROM images WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(image)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn store_type(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (SqliteImageStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(db_path.to_str().unwrap()).await.unwrap();
        db.run_migrations().await.unwrap();
        (SqliteImageStore::new(db), temp_dir)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (store, _temp) = create_test_store().await;

        let created = store
            .create(NewImage::from_bytes("Sun Set.png", "image/png", b"\x89PNG"))
            .await
            .unwrap();
        assert!(created.id > 0);
        assert_eq!(created.filename, "sun_set.png");

        let fetched = store.get(created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.decode_data().unwrap(), b"\x89PNG");

        assert!(store.get(created.id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_newest_first() {
        let (store, _temp) = create_test_store().await;

        let a = store
            .create(NewImage::from_bytes("a.gif", "image/gif", b"GIF89a"))
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let b = store
            .create(NewImage::from_bytes("b.gif", "image/gif", b"GIF89a"))
            .await
            .unwrap();
        assert!(b.id > a.id);

        let ids: Vec<i64> = store.get_all().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_delete_once() {
        let (store, _temp) = create_test_store().await;

        let created = store
            .create(NewImage::from_bytes("x.jpg", "image/jpeg", b"\xFF\xD8"))
            .await
            .unwrap();
        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.delete(created.id).await.unwrap());
        assert!(store.get_all().await.unwrap().is_empty());
    }
}
