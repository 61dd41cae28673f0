use bytes::Bytes;
use std::path::Path;

use crate::validation::Candidate;

/// A file picked by the user, held in memory until it is uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build from raw bytes, declaring the type guessed from the file name
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self::new(name, mime_type, data)
    }

    /// Read a file from disk
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::from_bytes(name, data))
    }
}

impl Candidate for SourceFile {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_guessed_from_name() {
        assert_eq!(SourceFile::from_bytes("a.JPG", vec![1u8]).mime_type, "image/jpeg");
        assert_eq!(SourceFile::from_bytes("b.gif", vec![1u8]).mime_type, "image/gif");
        assert_eq!(SourceFile::from_bytes("notes.txt", vec![1u8]).mime_type, "text/plain");
        assert_eq!(
            SourceFile::from_bytes("no_extension", vec![1u8]).mime_type,
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn test_from_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("pic.png");
        tokio::fs::write(&path, b"\x89PNG").await.unwrap();

        let file = SourceFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "pic.png");
        assert_eq!(file.mime_type, "image/png");
        assert_eq!(file.size(), 4);
    }
}
