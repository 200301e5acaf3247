//! File storage for profile photos.
//!
//! Photos are written flat into one root directory. The path stored on the
//! profile is the public URL path (`/content/photos/<file>`), which the server
//! maps back onto the same directory when serving.

mod validation;

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::routes::PHOTOS_PREFIX;

pub use validation::{ImageFormat, InvalidReason, detect_image_type};

/// Upload limit when none is configured.
pub const DEFAULT_MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;

const MAX_STEM_LEN: usize = 64;

/// A photo received from a form, before it is stored.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Client-supplied file name, untrusted
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("The uploaded photo is empty")]
    Empty,

    #[error("The uploaded photo is {size} bytes, the limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("The uploaded file is not a supported image")]
    NotAnImage,

    #[error("Photo storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhotoError {
    /// Whether the upload itself was at fault rather than the storage
    pub fn is_rejected_upload(&self) -> bool {
        !matches!(self, PhotoError::Io(_))
    }
}

#[derive(Debug, Clone)]
pub struct PhotoStore {
    root: PathBuf,
    max_bytes: usize,
}

impl PhotoStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validate and write an upload, returning its public path.
    pub async fn save(&self, upload: &PhotoUpload) -> Result<String, PhotoError> {
        if upload.bytes.is_empty() {
            return Err(PhotoError::Empty);
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(PhotoError::TooLarge {
                size: upload.bytes.len(),
                max: self.max_bytes,
            });
        }
        let format =
            detect_image_type(&upload.bytes).map_err(|_| PhotoError::NotAnImage)?;

        // The extension follows the detected format so the file is always
        // served with an image content type.
        let file_name = format!(
            "{}-{}.{}",
            Uuid::new_v4(),
            sanitize_file_stem(&upload.file_name),
            format.extension()
        );
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), &upload.bytes).await?;

        info!(
            file = %file_name,
            content_type = format.mime_type(),
            size = upload.bytes.len(),
            "photo stored"
        );
        Ok(format!("{PHOTOS_PREFIX}/{file_name}"))
    }

    /// Delete a previously stored photo. Paths that do not point into this
    /// store are ignored; a file that is already gone is not an error.
    pub async fn remove(&self, public_path: &str) -> Result<bool, PhotoError> {
        let Some(path) = self.resolve(public_path) else {
            warn!(path = public_path, "ignoring photo path outside storage");
            return Ok(false);
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = public_path, "photo removed");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = public_path, "photo already absent");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Map a public path onto a file directly inside the root.
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path
            .strip_prefix(PHOTOS_PREFIX)?
            .strip_prefix('/')?;
        let safe = !name.starts_with('.')
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if name.is_empty() || !safe {
            return None;
        }
        Some(self.root.join(name))
    }
}

/// Reduce a client file name to a base name of `[A-Za-z0-9_-]` without its
/// extension.
pub fn sanitize_file_stem(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.trim_matches('.').is_empty() => stem,
        _ => base,
    };
    let cleaned: String = stem
        .chars()
        .filter(|c| *c != '.')
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned
    }
}
