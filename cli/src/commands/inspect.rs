//! Inspect command: summarize a backup file without restoring it.

use crate::error::Result;
use chrono::{DateTime, Utc};
use shelfkeep_engine::{codec, Snapshot, SnapshotMetadata};
use std::path::Path;

/// Print a summary of the backup at `file`.
pub async fn run(file: &Path, json: bool) -> Result<SnapshotMetadata> {
    let bytes = tokio::fs::read(file).await?;
    let snapshot = codec::decode(&bytes)?;
    let metadata = SnapshotMetadata::from(&snapshot);

    if json {
        let rendered = serde_json::to_string_pretty(&metadata)
            .map_err(|e| crate::error::AppError::Store(e.to_string()))?;
        println!("{rendered}");
    } else {
        print_text(file, &snapshot, &metadata);
    }
    Ok(metadata)
}

fn print_text(file: &Path, snapshot: &Snapshot, metadata: &SnapshotMetadata) {
    println!("Backup: {}", file.display());
    println!("  Format version: {}", metadata.version);
    println!("  Created: {}", format_timestamp(metadata.created_at));
    println!("  Items: {}", metadata.item_count);
    println!("  Units: {}", metadata.unit_count);
    println!("  Categories: {}", metadata.category_count);
    println!("  Tracks: {}", metadata.track_count);
    for source in &snapshot.sources {
        let name = if source.name.is_empty() {
            "(unknown)"
        } else {
            source.name.as_str()
        };
        println!("  Source {}: {}", source.source_id, name);
    }
}

fn format_timestamp(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
