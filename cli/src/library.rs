//! Loading and saving the JSON library store.

use crate::error::{AppError, Result};
use shelfkeep_engine::MemoryStore;
use std::path::Path;

/// Open the library at `path`. A missing file is an empty library.
pub async fn load(path: &Path) -> Result<MemoryStore> {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => {
            let store =
                MemoryStore::from_json(&json).map_err(|e| AppError::Store(e.to_string()))?;
            tracing::debug!(path = %path.display(), "loaded library store");
            Ok(store)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "library store not found, starting empty");
            Ok(MemoryStore::new())
        }
        Err(e) => Err(e.into()),
    }
}

/// Write the library to `path`, replacing it only once the new contents are
/// fully on disk.
pub async fn save(store: &MemoryStore, path: &Path) -> Result<()> {
    let json = store
        .to_json()
        .await
        .map_err(|e| AppError::Store(e.to_string()))?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    tracing::debug!(path = %path.display(), "saved library store");
    Ok(())
}
