//! Prune command: delete old generated backups.

use crate::config::Config;
use crate::error::Result;
use shelfkeep_engine::prune_backups;
use std::path::PathBuf;

pub async fn run(config: &Config, keep: Option<usize>) -> Result<Vec<PathBuf>> {
    let keep = keep.unwrap_or(config.max_backups);
    let deleted = prune_backups(&config.backup_dir, keep).await?;
    for path in &deleted {
        println!("Deleted {}", path.display());
    }
    println!("Kept the {} newest backup(s)", keep);
    Ok(deleted)
}
