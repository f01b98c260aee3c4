//! Photo capture.
//!
//! The device camera sits behind [`PhotoSource`]; the workflow only ever sees
//! the resulting [`PhotoRef`].

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::HandoverResult;
use crate::inspection::PhotoRef;

/// Something that can take a photo.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// Captures one photo. On error nothing has been recorded.
    async fn capture(&self) -> HandoverResult<PhotoRef>;
}

/// Encodes image bytes as a `data:` URI.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> PhotoRef {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// MIME type for an image file extension.
pub fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FilePhotoSource;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::*;
    use crate::error::HandoverError;
    use std::path::PathBuf;

    /// Reads an image file from disk, e.g. a camera roll export.
    #[derive(Debug, Clone)]
    pub struct FilePhotoSource {
        path: PathBuf,
    }

    impl FilePhotoSource {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self { path: path.into() }
        }
    }

    #[async_trait]
    impl PhotoSource for FilePhotoSource {
        async fn capture(&self) -> HandoverResult<PhotoRef> {
            let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
                HandoverError::photo(format!("{}: {}", self.path.display(), e))
            })?;
            if bytes.is_empty() {
                return Err(HandoverError::photo(format!(
                    "{}: file is empty",
                    self.path.display()
                )));
            }
            let mime = self
                .path
                .extension()
                .and_then(|e| e.to_str())
                .map(mime_for_extension)
                .unwrap_or("application/octet-stream");
            Ok(to_data_uri(mime, &bytes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandoverError;

    #[test]
    fn test_data_uri() {
        assert_eq!(to_data_uri("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_mime_lookup() {
        assert_eq!(mime_for_extension("JPG"), "image/jpeg");
        assert_eq!(mime_for_extension("webp"), "image/webp");
        assert_eq!(mime_for_extension("txt"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_file_source_reads_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("front.jpg");
        std::fs::write(&path, b"\xff\xd8\xff").unwrap();

        let photo = FilePhotoSource::new(&path).capture().await.unwrap();
        assert!(photo.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FilePhotoSource::new("/nonexistent/photo.png");
        assert!(matches!(source.capture().await, Err(HandoverError::Photo(_))));
    }

    #[tokio::test]
    async fn test_file_source_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let source = FilePhotoSource::new(file.path());
        assert!(matches!(source.capture().await, Err(HandoverError::Photo(_))));
    }
}
