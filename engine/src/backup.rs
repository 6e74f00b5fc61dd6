//! Backup file creation, restore, and rotation.
//!
//! ## Usage
//!
//! ```ignore
//! use shelfkeep_engine::{BackupConfig, BackupManager, Repositories, SourceCatalog};
//!
//! let manager = BackupManager::new(Repositories::from_store(&store), BackupConfig::default());
//!
//! // Create backup
//! let info = manager.create_backup(&path, &SourceCatalog::new()).await?;
//!
//! // Restore from backup
//! let report = manager.restore_backup(&path).await?;
//! ```
//!
//! Nothing here locks the store. Running two restores against the same store
//! at once can race on category insertion; callers must serialize them. An
//! aborted `create_backup` can leave a truncated file behind.

use crate::codec::{self, Compression};
use crate::dump::{self, BackupOptions, SourceCatalog};
use crate::error::Result;
use crate::reconcile::{RestoreReport, Restorer};
use crate::repository::Repositories;
use crate::{Snapshot, Timestamp};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Prefix of generated backup file names.
pub const BACKUP_FILE_PREFIX: &str = "shelfkeep_";
/// Suffix of generated backup file names.
pub const BACKUP_FILE_SUFFIX: &str = ".skb.gz";
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Configuration for backup operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupConfig {
    /// Gzip level for new backups.
    pub compression: Compression,
    /// Parts of the library to include.
    pub options: BackupOptions,
}

/// Result of writing a backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub path: PathBuf,
    /// Size of the written file in bytes.
    pub size: usize,
    pub item_count: usize,
}

/// Generated file name for a backup taken at `now`.
pub fn backup_file_name(now: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        BACKUP_FILE_PREFIX,
        now.format(BACKUP_TIME_FORMAT),
        BACKUP_FILE_SUFFIX
    )
}

/// Time encoded in a generated backup file name.
pub fn parse_backup_file_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name
        .strip_prefix(BACKUP_FILE_PREFIX)?
        .strip_suffix(BACKUP_FILE_SUFFIX)?;
    NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Delete all but the `keep` newest generated backups in `dir`.
///
/// Files that do not follow the generated naming scheme are never touched.
/// Returns the deleted paths, oldest first.
#[instrument]
pub async fn prune_backups(dir: &Path, keep: usize) -> Result<Vec<PathBuf>> {
    let mut backups = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(taken_at) = name.to_str().and_then(parse_backup_file_name) else {
            continue;
        };
        if entry.file_type().await?.is_file() {
            backups.push((taken_at, entry.path()));
        }
    }

    backups.sort();
    let excess = backups.len().saturating_sub(keep);
    let mut deleted = Vec::with_capacity(excess);
    for (_, path) in backups.into_iter().take(excess) {
        tokio::fs::remove_file(&path).await?;
        tracing::debug!(path = %path.display(), "pruned old backup");
        deleted.push(path);
    }
    Ok(deleted)
}

/// Creates and restores backups against a set of repositories.
pub struct BackupManager<'a> {
    repos: Repositories<'a>,
    config: BackupConfig,
}

impl<'a> BackupManager<'a> {
    pub fn new(repos: Repositories<'a>, config: BackupConfig) -> Self {
        Self { repos, config }
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Snapshot the live library.
    pub async fn build_dump(&self, catalog: &SourceCatalog) -> Result<Snapshot> {
        dump::build_dump(
            self.repos,
            catalog,
            self.config.options,
            now_millis(),
        )
        .await
    }

    /// Decode a backup payload.
    pub fn load_dump(&self, bytes: &[u8]) -> Result<Snapshot> {
        codec::decode(bytes)
    }

    /// Write a backup of the live library to `destination`.
    #[instrument(skip(self, catalog), fields(destination = %destination.display()))]
    pub async fn create_backup(
        &self,
        destination: &Path,
        catalog: &SourceCatalog,
    ) -> Result<BackupInfo> {
        let snapshot = self.build_dump(catalog).await?;
        let bytes = codec::encode_with(&snapshot, self.config.compression)?;

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(destination, &bytes).await?;

        let info = BackupInfo {
            path: destination.to_path_buf(),
            size: bytes.len(),
            item_count: snapshot.item_count(),
        };
        tracing::info!(size = info.size, items = info.item_count, "backup created");
        Ok(info)
    }

    /// Merge the backup at `source` into the live library.
    #[instrument(skip(self), fields(source = %source.display()))]
    pub async fn restore_backup(&self, source: &Path) -> Result<RestoreReport> {
        let bytes = tokio::fs::read(source).await?;
        let snapshot = self.load_dump(&bytes)?;
        tracing::info!(
            items = snapshot.item_count(),
            categories = snapshot.categories.len(),
            "restoring backup"
        );
        Restorer::new(self.repos).restore_snapshot(&snapshot).await
    }
}

fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn file_name_roundtrip() {
        let at = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 0).unwrap();
        let name = backup_file_name(at);
        assert_eq!(name, "shelfkeep_2024-02-01_09-30-00.skb.gz");
        assert_eq!(parse_backup_file_name(&name), Some(at));
    }

    #[test]
    fn backups_in_the_same_minute_get_distinct_names() {
        let first = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 5).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 2, 1, 9, 30, 41).unwrap();
        assert_ne!(backup_file_name(first), backup_file_name(second));
    }

    #[test]
    fn foreign_file_names_are_ignored() {
        assert_eq!(parse_backup_file_name("notes.txt"), None);
        assert_eq!(parse_backup_file_name("shelfkeep_garbage.skb.gz"), None);
    }

    #[tokio::test]
    async fn prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let names = [
            "shelfkeep_2024-01-01_00-00-00.skb.gz",
            "shelfkeep_2024-01-03_00-00-00.skb.gz",
            "shelfkeep_2024-01-02_00-00-00.skb.gz",
            "unrelated.skb.gz",
        ];
        for name in names {
            tokio::fs::write(dir.path().join(name), b"x").await.unwrap();
        }

        let deleted = prune_backups(dir.path(), 1).await.unwrap();

        let deleted: Vec<_> = deleted
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            deleted,
            vec![
                "shelfkeep_2024-01-01_00-00-00.skb.gz".to_string(),
                "shelfkeep_2024-01-02_00-00-00.skb.gz".to_string()
            ]
        );
        assert!(dir.path().join("shelfkeep_2024-01-03_00-00-00.skb.gz").exists());
        assert!(dir.path().join("unrelated.skb.gz").exists());
    }
}
