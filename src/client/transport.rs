use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::client::error::TransferError;
use crate::client::source::SourceFile;
use crate::models::{ImageRecord, UploadResponse};

/// Network side of the upload client
#[async_trait]
pub trait GalleryTransport: Send + Sync + 'static {
    /// Send every file in one multipart request
    async fn upload(&self, files: Vec<SourceFile>) -> Result<UploadResponse, TransferError>;

    async fn list(&self) -> Result<Vec<ImageRecord>, TransferError>;

    async fn delete(&self, id: i64) -> Result<(), TransferError>;
}

#[derive(Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Transport speaking to the gallery HTTP API
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into `TransferError::Rejected`
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, TransferError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorMessage>(&text) {
            Ok(body) => body.message,
            Err(_) if !text.trim().is_empty() => text,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };

        Err(TransferError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl GalleryTransport for HttpTransport {
    async fn upload(&self, files: Vec<SourceFile>) -> Result<UploadResponse, TransferError> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.data.to_vec())
                .file_name(file.name)
                .mime_str(&file.mime_type)?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(self.url("/api/images/upload"))
            .multipart(form)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn list(&self) -> Result<Vec<ImageRecord>, TransferError> {
        let response = self.client.get(self.url("/api/images")).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, id: i64) -> Result<(), TransferError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/images/{}", id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
