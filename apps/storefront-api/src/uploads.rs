//! Product image storage on local disk.
//!
//! Files land in the upload directory as
//! `productImage-<millis>-<random>.<ext>` and are served as `/uploads/<file>`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Public URL prefix of uploaded files.
pub const UPLOAD_URL_PREFIX: &str = "/uploads/";

/// A file written to the upload directory.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub path: PathBuf,
    pub url: String,
}

/// Whether the declared content type is an image.
pub fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("image/"))
}

/// Picks a file extension: the uploaded name's, else the MIME subtype.
fn extension(file_name: Option<&str>, content_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str());
    let from_type = content_type
        .and_then(|ct| ct.split('/').nth(1))
        .map(|sub| sub.split(['+', ';']).next().unwrap_or(sub));

    from_name
        .or(from_type)
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.bytes().all(|b| b.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

fn unique_name(ext: &str) -> String {
    let random = (Uuid::new_v4().as_u128() % 1_000_000_000) as u64;
    format!("productImage-{}-{}.{}", Utc::now().timestamp_millis(), random, ext)
}

/// Writes an uploaded image and returns where it went.
pub async fn save_image(
    upload_dir: &Path,
    file_name: Option<&str>,
    content_type: Option<&str>,
    bytes: &[u8],
) -> ApiResult<StoredImage> {
    if !is_image(content_type) {
        return Err(ApiError::bad_request("Only image files are allowed"));
    }

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(ApiError::internal)?;

    let name = unique_name(&extension(file_name, content_type));
    let path = upload_dir.join(&name);
    tokio::fs::write(&path, bytes).await.map_err(ApiError::internal)?;

    debug!(file = %name, size = bytes.len(), "Image stored");
    Ok(StoredImage {
        path,
        url: format!("{UPLOAD_URL_PREFIX}{name}"),
    })
}

/// Resolves an `/uploads/<file>` URL to a path in `upload_dir`.
///
/// Anything else, including names with path separators, yields `None`.
pub fn path_for_url(upload_dir: &Path, url: &str) -> Option<PathBuf> {
    let name = url.strip_prefix(UPLOAD_URL_PREFIX)?;
    if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return None;
    }
    Some(upload_dir.join(name))
}

/// Deletes a stored file. Failures are logged, never returned.
pub async fn remove_file(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove image");
    }
}

/// Deletes the file behind an image URL, if it is one of ours.
pub async fn remove_by_url(upload_dir: &Path, url: &str) {
    if let Some(path) = path_for_url(upload_dir, url) {
        remove_file(&path).await;
    }
}
