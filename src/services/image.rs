use bytes::Bytes;

use crate::error::{AppError, Result};
use crate::models::{ImageRecord, ImageSummary, NewImage};
use crate::storage::ImageStore;
use crate::validation::{self, Candidate, UploadLimits};

/// One file part received by the upload endpoint
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl Candidate for IncomingFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Image service
pub struct ImageService;

impl ImageService {
    pub async fn list_images(store: &dyn ImageStore) -> Result<Vec<ImageRecord>> {
        store.get_all().await
    }

    pub async fn get_image(store: &dyn ImageStore, id: i64) -> Result<ImageRecord> {
        store
            .get(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Image not found".to_string()))
    }

    /// Persist a batch of files, all or nothing
    ///
    /// Any invalid file fails the whole batch before a record is written. A
    /// store failure part-way removes the records already created for the batch.
    pub async fn upload_batch(
        store: &dyn ImageStore,
        limits: &UploadLimits,
        files: Vec<IncomingFile>,
    ) -> Result<Vec<ImageSummary>> {
        if files.is_empty() {
            return Err(AppError::BadRequest("No files were uploaded".to_string()));
        }
        if files.len() > limits.max_files {
            return Err(AppError::BadRequest(format!(
                "Too many files; at most {} can be uploaded at once",
                limits.max_files
            )));
        }

        let partition = validation::partition(files, limits);
        if !partition.rejected.is_empty() {
            let issues = partition.issues();
            tracing::warn!("Rejecting upload batch: {} invalid file(s)", issues.len());
            return Err(AppError::Validation(issues));
        }

        let mut created: Vec<ImageRecord> = Vec::with_capacity(partition.accepted.len());
        for file in &partition.accepted {
            let mimetype = validation::mime_essence(&file.mime_type);
            let image = NewImage::from_bytes(&file.name, &mimetype, &file.data);
            match store.create(image).await {
                Ok(record) => created.push(record),
                Err(e) => {
                    Self::discard(store, &created).await;
                    return Err(e);
                }
            }
        }

        tracing::info!("Uploaded {} image(s)", created.len());
        Ok(created.into_iter().map(ImageSummary::from).collect())
    }

    async fn discard(store: &dyn ImageStore, records: &[ImageRecord]) {
        for record in records {
            if let Err(e) = store.delete(record.id).await {
                tracing::error!("Failed to roll back image {}: {}", record.id, e);
            }
        }
    }

    pub async fn delete_image(store: &dyn ImageStore, id: i64) -> Result<()> {
        if !store.delete(id).await? {
            return Err(AppError::NotFound("Image not found".to_string()));
        }
        tracing::info!("Deleted image {}", id);
        Ok(())
    }
}
