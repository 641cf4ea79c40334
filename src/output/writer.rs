//! Whole-file JSON persistence for the published documents.
//!
//! Readers on the site may fetch a file at any moment, so a document is
//! written to a sibling `.tmp` file and renamed over the target.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::{error, info, warn};

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let mut data = serde_json::to_vec_pretty(value).context("Failed to serialize document")?;
    data.push(b'\n');

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &data)
        .await
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        error!(error = %e, path = %path.display(), "Failed to rename temp file");
        let _ = fs::remove_file(&temp_path).await;
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }

    info!(path = %path.display(), size = data.len(), "Wrote output file");
    Ok(())
}

/// Previous run's document, if there is a readable one.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Could not read previous output");
            return None;
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Previous output is not valid, ignoring it");
            None
        }
    }
}
