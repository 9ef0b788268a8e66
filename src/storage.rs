use actix_web::web;
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::AppError;

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub path: PathBuf,
    pub url: String,
}

/// Writes uploads under one directory and hands back the URL they are served at.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    route: String,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, route: &str) -> Self {
        Self {
            dir: dir.into(),
            route: route.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub async fn save(
        &self,
        client_name: &str,
        format: ImageFormat,
        data: Vec<u8>,
    ) -> Result<StoredUpload, AppError> {
        let name = stored_name(client_name, format);
        let path = self.dir.join(&name);

        let target = path.clone();
        web::block(move || fs::write(&target, &data))
            .await
            .map_err(|e| AppError::Internal(format!("upload writer cancelled: {}", e)))??;

        log::debug!("Stored upload at {}", path.display());
        Ok(StoredUpload {
            url: format!("{}/{}", self.route, name),
            path,
        })
    }
}

/// Unique on-disk name: random prefix, the sanitized client stem, and the
/// extension of the sniffed format. The client's own extension is discarded
/// since the static route derives the served content type from it.
fn stored_name(client_name: &str, format: ImageFormat) -> String {
    let sanitized = sanitize_filename(client_name);
    let stem = Path::new(&sanitized)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("upload");
    let ext = format.extensions_str().first().copied().unwrap_or("img");
    format!("{}-{}.{}", Uuid::new_v4().simple(), stem, ext)
}

/// Keeps only the final path component and a conservative character set.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.');

    if trimmed.is_empty() {
        return "upload".to_string();
    }
    // keep the tail so the extension survives truncation
    let skip = trimmed.chars().count().saturating_sub(MAX_NAME_LEN);
    trimmed.chars().skip(skip).collect()
}
