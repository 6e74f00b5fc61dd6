//! Building snapshots from live repositories.
//!
//! The dump reads only. It selects every favorited item, attaches the parts
//! enabled in [`BackupOptions`], and records the non-system categories. Item
//! memberships are written as the category `order` values, which become the
//! backup-local indices resolved again at restore time.

use crate::error::{EntityKind, Result};
use crate::repository::Repositories;
use crate::snapshot::{BackupCategory, BackupItem, BackupSource, BackupTrack, BackupUnit};
use crate::{Error, LibraryItem, Snapshot, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::instrument;

/// Which parts of the library a backup includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupOptions {
    pub categories: bool,
    pub units: bool,
    pub tracks: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            categories: true,
            units: true,
            tracks: true,
        }
    }
}

/// Display names of the content sources items come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCatalog {
    names: BTreeMap<i64, String>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source_id: i64, name: impl Into<String>) -> Self {
        self.insert(source_id, name);
        self
    }

    pub fn insert(&mut self, source_id: i64, name: impl Into<String>) {
        self.names.insert(source_id, name.into());
    }

    /// Name of a source, empty when unknown.
    pub fn name(&self, source_id: i64) -> &str {
        self.names.get(&source_id).map(String::as_str).unwrap_or("")
    }
}

/// Read the live library into a snapshot.
#[instrument(skip_all)]
pub async fn build_dump(
    repos: Repositories<'_>,
    catalog: &SourceCatalog,
    options: BackupOptions,
    created_at: Timestamp,
) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new(created_at);

    let favorites = repos
        .items
        .find_favorites()
        .await
        .map_err(Error::repository(EntityKind::Item))?;

    let mut seen_sources = HashSet::new();
    for item in &favorites {
        if seen_sources.insert(item.source_id) {
            snapshot.sources.push(BackupSource {
                source_id: item.source_id,
                name: catalog.name(item.source_id).to_string(),
            });
        }
        snapshot.items.push(dump_item(repos, item, options).await?);
    }

    if options.categories {
        let categories = repos
            .categories
            .find_all()
            .await
            .map_err(Error::repository(EntityKind::Category))?;
        snapshot.categories = categories
            .iter()
            .filter(|c| !c.is_system)
            .map(BackupCategory::from_live)
            .collect();
    }

    tracing::debug!(
        items = snapshot.item_count(),
        units = snapshot.unit_count(),
        categories = snapshot.categories.len(),
        "built dump"
    );
    Ok(snapshot)
}

async fn dump_item(
    repos: Repositories<'_>,
    item: &LibraryItem,
    options: BackupOptions,
) -> Result<BackupItem> {
    let mut backup = BackupItem::from_live(item);

    if options.units {
        let units = repos
            .units
            .find_by_item(item.id)
            .await
            .map_err(Error::repository(EntityKind::Unit))?;
        backup.units = units.iter().map(BackupUnit::from_live).collect();
    }

    if options.categories {
        let categories = repos
            .item_categories
            .find_by_item(item.id)
            .await
            .map_err(Error::repository(EntityKind::ItemCategory))?;
        backup.categories = categories
            .iter()
            .filter(|c| !c.is_system)
            .map(|c| c.order)
            .collect();
    }

    if options.tracks {
        let tracks = repos
            .tracks
            .find_by_item(item.id)
            .await
            .map_err(Error::repository(EntityKind::Track))?;
        backup.tracks = tracks.iter().map(BackupTrack::from_live).collect();
    }

    Ok(backup)
}
