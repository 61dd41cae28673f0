use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Persisted image row
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: i64,
    pub filename: String,
    pub originalname: String,
    pub mimetype: String,
    pub size: i64,
    /// Base64 encoded image bytes
    pub data: String,
    #[serde(rename = "uploadDate")]
    pub upload_date: DateTime<Utc>,
}

impl ImageRecord {
    /// Decode the stored base64 payload back to raw bytes
    pub fn decode_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(&self.data)
    }

    pub fn summary(&self) -> ImageSummary {
        ImageSummary {
            id: self.id,
            filename: self.filename.clone(),
            originalname: self.originalname.clone(),
            mimetype: self.mimetype.clone(),
            size: self.size,
            upload_date: self.upload_date,
        }
    }
}

/// Image record without its payload, as returned by the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub id: i64,
    pub filename: String,
    pub originalname: String,
    pub mimetype: String,
    pub size: i64,
    #[serde(rename = "uploadDate")]
    pub upload_date: DateTime<Utc>,
}

impl From<ImageRecord> for ImageSummary {
    fn from(record: ImageRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            originalname: record.originalname,
            mimetype: record.mimetype,
            size: record.size,
            upload_date: record.upload_date,
        }
    }
}

/// Validated fields for a new record; id and upload date are assigned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub filename: String,
    pub originalname: String,
    pub mimetype: String,
    pub size: i64,
    pub data: String,
}

impl NewImage {
    pub fn from_bytes(original_name: &str, mimetype: &str, bytes: &[u8]) -> Self {
        Self {
            filename: normalize_filename(original_name),
            originalname: original_name.to_string(),
            mimetype: mimetype.to_string(),
            size: bytes.len() as i64,
            data: general_purpose::STANDARD.encode(bytes),
        }
    }
}

/// Upload endpoint response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub images: Vec<ImageSummary>,
}

/// Lowercase the name and collapse every whitespace run into one underscore
pub fn normalize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
        } else {
            out.extend(c.to_lowercase());
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_filename() {
        assert_eq!(normalize_filename("My Holiday  Photo.JPG"), "my_holiday_photo.jpg");
        assert_eq!(normalize_filename("tab\there.png"), "tab_here.png");
        assert_eq!(normalize_filename("plain.gif"), "plain.gif");
    }

    #[test]
    fn test_new_image_encodes_payload() {
        let bytes = [0xFFu8, 0xD8, 0xFF, 0xE0, 0x00];
        let image = NewImage::from_bytes("Cat Pic.jpg", "image/jpeg", &bytes);
        assert_eq!(image.filename, "cat_pic.jpg");
        assert_eq!(image.originalname, "Cat Pic.jpg");
        assert_eq!(image.size, 5);
        assert_eq!(general_purpose::STANDARD.decode(&image.data).unwrap(), bytes);
    }

    #[test]
    fn test_wire_names() {
        let record = ImageRecord {
            id: 1,
            filename: "a.png".to_string(),
            originalname: "A.png".to_string(),
            mimetype: "image/png".to_string(),
            size: 3,
            data: "AAAA".to_string(),
            upload_date: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("uploadDate").is_some());
        assert!(json.get("originalname").is_some());

        let summary = serde_json::to_value(record.summary()).unwrap();
        assert!(summary.get("data").is_none());
    }
}
