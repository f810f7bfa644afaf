//! Image upload store used by attendance check-ins.
//!
//! The `ImageStore` trait is the seam to the upload backend; the server ships
//! a disk-backed implementation whose files are served under `/uploads`.

use std::path::PathBuf;

use axum::body::Bytes;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("unsupported image format")]
    UnsupportedFormat,
    #[error("invalid upload category: {0}")]
    InvalidCategory(String),
    #[error("image write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Store every file under `category`, returning one public URL per file in order.
    async fn upload(&self, category: &str, files: Vec<Bytes>) -> Result<Vec<String>, ImageError>;
}

/// File extension for a supported image, sniffed from its magic bytes.
#[must_use]
pub fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("jpg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("png"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}

fn valid_category(category: &str) -> bool {
    !category.is_empty() && category.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub struct DiskImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl DiskImageStore {
    #[must_use]
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self { root, public_base_url }
    }
}

#[async_trait::async_trait]
impl ImageStore for DiskImageStore {
    async fn upload(&self, category: &str, files: Vec<Bytes>) -> Result<Vec<String>, ImageError> {
        if !valid_category(category) {
            return Err(ImageError::InvalidCategory(category.to_owned()));
        }
        // Reject the whole batch before writing anything.
        let extensions = files
            .iter()
            .map(|f| sniff_extension(f).ok_or(ImageError::UnsupportedFormat))
            .collect::<Result<Vec<_>, _>>()?;

        let dir = self.root.join(category);
        tokio::fs::create_dir_all(&dir).await?;

        let mut urls = Vec::with_capacity(files.len());
        for (file, ext) in files.iter().zip(extensions) {
            let name = format!("{}.{ext}", Uuid::new_v4());
            tokio::fs::write(dir.join(&name), file).await?;
            urls.push(format!("{}/uploads/{category}/{name}", self.public_base_url));
        }
        Ok(urls)
    }
}

#[cfg(test)]
#[path = "image_test.rs"]
mod tests;
