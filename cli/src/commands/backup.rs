//! Backup and restore commands.
//!
//! Both commands load the JSON library store, run the engine against it, and
//! (for restore) write the merged library back.

use crate::config::Config;
use crate::error::Result;
use crate::library;
use shelfkeep_engine::{
    backup_file_name, prune_backups, BackupConfig, BackupInfo, BackupManager, BackupOptions,
    Repositories, RestoreReport,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Create a backup of the library.
///
/// Without an explicit `output`, the backup goes into the configured backup
/// directory under a generated name and older generated backups beyond
/// `max_backups` are pruned.
pub async fn create(
    config: &Config,
    output: Option<PathBuf>,
    options: BackupOptions,
) -> Result<BackupInfo> {
    info!("Creating backup of {}", config.store_path.display());
    let store = library::load(&config.store_path).await?;

    let backup_config = BackupConfig {
        compression: config.compression,
        options,
    };
    let manager = BackupManager::new(Repositories::from_store(&store), backup_config);

    let rotate = output.is_none();
    let destination =
        output.unwrap_or_else(|| config.backup_dir.join(backup_file_name(chrono::Utc::now())));
    let info = manager.create_backup(&destination, &config.sources).await?;

    if rotate {
        let pruned = prune_backups(&config.backup_dir, config.max_backups).await?;
        if !pruned.is_empty() {
            info!("Pruned {} old backup(s)", pruned.len());
        }
    }

    println!("Backup created");
    println!("  Path: {}", info.path.display());
    println!("  Size: {} bytes", info.size);
    println!("  Items: {}", info.item_count);
    Ok(info)
}

/// Merge a backup file into the library and save the result.
pub async fn restore(config: &Config, file: &Path) -> Result<RestoreReport> {
    info!("Restoring {} into {}", file.display(), config.store_path.display());
    let store = library::load(&config.store_path).await?;

    let manager = BackupManager::new(Repositories::from_store(&store), BackupConfig::default());
    let result = manager.restore_backup(file).await;

    // Steps committed before a failure stay applied, so the library is saved
    // either way.
    library::save(&store, &config.store_path).await?;
    let report = result?;

    println!("Restore complete");
    println!(
        "  Items: {} new, {} refreshed, {} unchanged",
        report.items_inserted, report.items_refreshed, report.items_kept
    );
    println!(
        "  Units: {} inserted, {} updated, {} replaced",
        report.units_inserted, report.units_updated, report.units_deleted
    );
    println!("  Categories: {} new", report.categories_inserted);
    println!(
        "  Tracks: {} new, {} updated",
        report.tracks_inserted, report.tracks_updated
    );
    if report.category_refs_dropped > 0 {
        println!(
            "  Dropped {} unresolved category reference(s)",
            report.category_refs_dropped
        );
    }
    Ok(report)
}
