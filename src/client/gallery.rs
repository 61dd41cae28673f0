//! Client-side gallery projection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::client::error::{ClientError, Result};
use crate::models::ImageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        }
    }
}

/// Last fetched record list plus presentation state
#[derive(Debug, Default)]
pub struct GalleryProjection {
    images: Vec<ImageRecord>,
    view_mode: ViewMode,
    viewer: Option<usize>,
}

impl GalleryProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn find(&self, id: i64) -> Option<&ImageRecord> {
        self.images.iter().find(|r| r.id == id)
    }

    /// Swap in a freshly fetched list
    ///
    /// An open viewer follows its record to its new position; if the record is
    /// gone the viewer stays on the same index, clamped to the new list.
    pub fn replace(&mut self, images: Vec<ImageRecord>) {
        let current_id = self.current().map(|r| r.id);
        self.images = images;

        self.viewer = match (self.viewer, current_id) {
            (_, _) if self.images.is_empty() => None,
            (Some(index), Some(id)) => Some(
                self.images
                    .iter()
                    .position(|r| r.id == id)
                    .unwrap_or_else(|| index.min(self.images.len() - 1)),
            ),
            _ => None,
        };
    }

    pub fn open_viewer(&mut self, id: i64) -> Result<&ImageRecord> {
        let index = self
            .images
            .iter()
            .position(|r| r.id == id)
            .ok_or(ClientError::UnknownImage(id))?;
        self.viewer = Some(index);
        Ok(&self.images[index])
    }

    pub fn close_viewer(&mut self) {
        self.viewer = None;
    }

    pub fn current(&self) -> Option<&ImageRecord> {
        self.viewer.and_then(|i| self.images.get(i))
    }

    pub fn next(&mut self) -> Option<&ImageRecord> {
        let len = self.images.len();
        let index = self.viewer?;
        self.viewer = Some((index + 1) % len);
        self.current()
    }

    pub fn previous(&mut self) -> Option<&ImageRecord> {
        let len = self.images.len();
        let index = self.viewer?;
        self.viewer = Some(if index == 0 { len - 1 } else { index - 1 });
        self.current()
    }

    /// Decode a record's payload for saving
    pub fn download_payload(&self, id: i64) -> Result<DownloadPayload> {
        let record = self.find(id).ok_or(ClientError::UnknownImage(id))?;
        Ok(DownloadPayload {
            id,
            file_name: download_name(&record.originalname),
            bytes: record.decode_data()?,
        })
    }

    /// Decode a record's payload and write it to `dir` under its original name
    pub async fn download(&self, id: i64, dir: &Path) -> Result<PathBuf> {
        self.download_payload(id)?.save(dir).await
    }
}

/// Decoded image bytes ready to be written to disk
#[derive(Debug, Clone)]
pub struct DownloadPayload {
    id: i64,
    file_name: String,
    bytes: Vec<u8>,
}

impl DownloadPayload {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub async fn save(self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, self.bytes).await?;
        tracing::info!("Saved image {} to {:?}", self.id, path);
        Ok(path)
    }
}

/// Keep only the final path component of a user supplied name
fn download_name(original: &str) -> String {
    let name = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        "image".to_string()
    } else {
        name.to_string()
    }
}

/// Human readable size: `0 Bytes`, `512 Bytes`, `1.5 KB`, `2 MB`
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

/// Short date such as `Mar 4, 2025`
pub fn format_upload_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Absolute URL of the raw image endpoint
pub fn shareable_url(base_url: &str, id: i64) -> String {
    format!("{}/images/{}", base_url.trim_end_matches('/'), id)
}

/// Text after the last dot, empty when there is none
pub fn file_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => "",
        Some(i) => &name[i + 1..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};
    use chrono::TimeZone;

    fn record(id: i64) -> ImageRecord {
        ImageRecord {
            id,
            filename: format!("img{id}.png"),
            originalname: format!("Img {id}.png"),
            mimetype: "image/png".to_string(),
            size: 3,
            data: general_purpose::STANDARD.encode([1u8, 2, 3]),
            upload_date: Utc::now(),
        }
    }

    #[test]
    fn test_viewer_wraps() {
        let mut gallery = GalleryProjection::new();
        gallery.replace(vec![record(3), record(2), record(1)]);

        assert_eq!(gallery.open_viewer(3).unwrap().id, 3);
        assert_eq!(gallery.previous().unwrap().id, 1);
        assert_eq!(gallery.next().unwrap().id, 3);
        assert_eq!(gallery.next().unwrap().id, 2);
        assert_eq!(gallery.next().unwrap().id, 1);
        assert_eq!(gallery.next().unwrap().id, 3);

        gallery.close_viewer();
        assert!(gallery.next().is_none());
        assert!(matches!(gallery.open_viewer(42), Err(ClientError::UnknownImage(42))));
    }

    #[test]
    fn test_viewer_survives_refetch() {
        let mut gallery = GalleryProjection::new();
        gallery.replace(vec![record(2), record(1)]);
        gallery.open_viewer(1).unwrap();

        // A newer record pushes the open one down the list
        gallery.replace(vec![record(3), record(2), record(1)]);
        assert_eq!(gallery.current().unwrap().id, 1);

        // The open record was deleted
        gallery.replace(vec![record(3)]);
        assert_eq!(gallery.current().unwrap().id, 3);

        gallery.replace(vec![]);
        assert!(gallery.current().is_none());
    }

    #[test]
    fn test_view_mode_toggle() {
        let mut gallery = GalleryProjection::new();
        assert_eq!(gallery.view_mode(), ViewMode::Grid);
        gallery.set_view_mode(gallery.view_mode().toggled());
        assert_eq!(gallery.view_mode(), ViewMode::List);
    }

    #[tokio::test]
    async fn test_download_writes_decoded_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut gallery = GalleryProjection::new();
        gallery.replace(vec![record(7)]);

        let path = gallery.download(7, dir.path()).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "Img 7.png");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![1u8, 2, 3]);

        assert!(matches!(
            gallery.download(8, dir.path()).await,
            Err(ClientError::UnknownImage(8))
        ));
    }

    #[test]
    fn test_download_name_strips_directories() {
        assert_eq!(download_name("../../etc/passwd"), "passwd");
        assert_eq!(download_name("C:\\pics\\cat.jpg"), "cat.jpg");
        assert_eq!(download_name(".."), "image");
    }

    #[test]
    fn test_formatting_helpers() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");

        let date = Utc.with_ymd_and_hms(2025, 3, 4, 12, 0, 0).unwrap();
        assert_eq!(format_upload_date(&date), "Mar 4, 2025");

        assert_eq!(shareable_url("http://localhost:5000/", 9), "http://localhost:5000/images/9");

        assert_eq!(file_extension("photo.final.JPG"), "JPG");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(".hidden"), "");
    }
}
