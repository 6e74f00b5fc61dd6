//! Reconciliation of a snapshot into a live library.
//!
//! Restoring never blindly overwrites: every entity type has a merge rule that
//! keeps newer local state and never duplicates what is already there. Applying
//! the same snapshot twice leaves the store as applying it once.
//!
//! # Algorithm
//!
//! 1. Insert snapshot categories whose names are unknown (ignoring case), then
//!    build the backup-local index -> live id mapping once, up front
//! 2. For each item, in snapshot order:
//!    a. insert it, or refresh its metadata when the snapshot is fresher or the
//!       item had been removed from the library
//!    b. replace or merge its units depending on which side is newer
//!    c. replace its category memberships through the mapping
//!    d. insert or max-merge its tracks
//!
//! The first failure stops the restore. Work already committed for earlier
//! steps is kept; restores are not transactional across entity types.

use crate::error::{EntityKind, Result};
use crate::repository::Repositories;
use crate::snapshot::{BackupCategory, BackupItem, BackupTrack, BackupUnit};
use crate::{
    CategoryId, Error, ItemId, ItemUpdate, LibraryItem, NewCategory, Snapshot, TrackUpdate, Unit,
    UnitUpdate,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::instrument;

/// Backup-local category index -> live category id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMapping {
    by_index: HashMap<i32, CategoryId>,
}

impl CategoryMapping {
    pub fn get(&self, index: i32) -> Option<CategoryId> {
        self.by_index.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.by_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_index.is_empty()
    }
}

/// What happened to a snapshot item's live counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// No live item existed; one was inserted
    Inserted(ItemId),
    /// Live metadata was overwritten from the snapshot
    Refreshed(ItemId),
    /// Live metadata was newer and left alone
    Kept(ItemId),
}

impl ItemOutcome {
    pub fn id(&self) -> ItemId {
        match self {
            ItemOutcome::Inserted(id) | ItemOutcome::Refreshed(id) | ItemOutcome::Kept(id) => *id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, ItemOutcome::Inserted(_))
    }
}

/// Counts of what a restore changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub categories_inserted: usize,
    pub items_inserted: usize,
    pub items_refreshed: usize,
    pub items_kept: usize,
    pub units_inserted: usize,
    pub units_updated: usize,
    pub units_deleted: usize,
    pub memberships_replaced: usize,
    pub category_refs_dropped: usize,
    pub tracks_inserted: usize,
    pub tracks_updated: usize,
}

/// Applies snapshots to a set of repositories.
pub struct Restorer<'a> {
    repos: Repositories<'a>,
    report: RestoreReport,
}

impl<'a> Restorer<'a> {
    /// Create a new restorer.
    pub fn new(repos: Repositories<'a>) -> Self {
        Self {
            repos,
            report: RestoreReport::default(),
        }
    }

    /// Changes made so far.
    pub fn report(&self) -> &RestoreReport {
        &self.report
    }

    pub fn into_report(self) -> RestoreReport {
        self.report
    }

    /// Restore a whole snapshot, stopping at the first error.
    #[instrument(skip_all, fields(items = snapshot.items.len()))]
    pub async fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<RestoreReport> {
        let mapping = self.restore_categories(&snapshot.categories).await?;

        for item in &snapshot.items {
            let outcome = self.restore_item(item).await?;
            self.restore_units(item, outcome.is_inserted()).await?;
            self.restore_item_categories(outcome.id(), &item.categories, &mapping)
                .await?;
            self.restore_tracks(outcome.id(), &item.tracks).await?;
        }

        tracing::info!(
            categories_inserted = self.report.categories_inserted,
            items_inserted = self.report.items_inserted,
            items_refreshed = self.report.items_refreshed,
            items_kept = self.report.items_kept,
            units_inserted = self.report.units_inserted,
            units_updated = self.report.units_updated,
            tracks_inserted = self.report.tracks_inserted,
            tracks_updated = self.report.tracks_updated,
            "restore finished"
        );
        Ok(self.report.clone())
    }

    /// Insert unknown categories and map every snapshot category to a live id.
    #[instrument(skip_all, fields(categories = categories.len()))]
    pub async fn restore_categories(
        &mut self,
        categories: &[BackupCategory],
    ) -> Result<CategoryMapping> {
        let mut mapping = CategoryMapping::default();
        if categories.is_empty() {
            return Ok(mapping);
        }

        let existing = self
            .repos
            .categories
            .find_all()
            .await
            .map_err(Error::repository(EntityKind::Category))?;

        let mut known: HashSet<String> = existing
            .iter()
            .filter(|c| !c.is_system)
            .map(|c| c.name.to_lowercase())
            .collect();
        let mut next_order = existing.iter().map(|c| c.order).max().map_or(0, |o| o + 1);

        let mut inserts = Vec::new();
        for category in categories {
            if known.insert(category.name.to_lowercase()) {
                inserts.push(NewCategory {
                    name: category.name.clone(),
                    order: next_order,
                    flags: category.flags,
                });
                next_order += 1;
            }
        }

        if !inserts.is_empty() {
            let count = inserts.len();
            self.repos
                .categories
                .insert_many(inserts)
                .await
                .map_err(Error::repository(EntityKind::Category))?;
            self.report.categories_inserted += count;
            tracing::debug!(count, "inserted categories");
        }

        let live: HashMap<String, CategoryId> = self
            .repos
            .categories
            .find_all()
            .await
            .map_err(Error::repository(EntityKind::Category))?
            .into_iter()
            .filter(|c| !c.is_system)
            .map(|c| (c.name.to_lowercase(), c.id))
            .collect();

        for category in categories {
            let Some(&id) = live.get(&category.name.to_lowercase()) else {
                return Err(invariant(format!(
                    "category '{}' missing after insertion",
                    category.name
                )));
            };
            if let Some(&kept) = mapping.by_index.get(&category.order) {
                if kept != id {
                    tracing::warn!(
                        index = category.order,
                        name = %category.name,
                        "category index already mapped, keeping the first"
                    );
                }
                continue;
            }
            mapping.by_index.insert(category.order, id);
        }

        Ok(mapping)
    }

    /// Insert the item or refresh its metadata, depending on freshness.
    #[instrument(skip_all, fields(key = %item.external_key, source = item.source_id))]
    pub async fn restore_item(&mut self, item: &BackupItem) -> Result<ItemOutcome> {
        let live = self
            .repos
            .items
            .find_by_key(&item.external_key, item.source_id)
            .await
            .map_err(Error::repository(EntityKind::Item))?;

        let outcome = match live {
            None => {
                let id = self
                    .repos
                    .items
                    .insert(item.to_new_item())
                    .await
                    .map_err(Error::repository(EntityKind::Item))?;
                self.report.items_inserted += 1;
                ItemOutcome::Inserted(id)
            }
            Some(live) if item.last_init > live.last_init || !live.favorite => {
                self.repos
                    .items
                    .update(metadata_update(&live, item))
                    .await
                    .map_err(Error::repository(EntityKind::Item))?;
                self.report.items_refreshed += 1;
                ItemOutcome::Refreshed(live.id)
            }
            Some(live) => {
                self.report.items_kept += 1;
                ItemOutcome::Kept(live.id)
            }
        };

        tracing::debug!(?outcome, "restored item");
        Ok(outcome)
    }

    /// Reconcile the units of an item already restored by
    /// [`restore_item`](Self::restore_item).
    ///
    /// When the snapshot's `last_update` is newer (or the item was only just
    /// inserted), live units are replaced by the snapshot's, keeping local
    /// reading state. Otherwise live units are updated in place and nothing is
    /// inserted or deleted.
    #[instrument(skip_all, fields(key = %item.external_key, units = item.units.len()))]
    pub async fn restore_units(&mut self, item: &BackupItem, newly_inserted: bool) -> Result<()> {
        if item.units.is_empty() {
            return Ok(());
        }

        let live_item = self
            .repos
            .items
            .find_by_key(&item.external_key, item.source_id)
            .await
            .map_err(Error::repository(EntityKind::Item))?
            .ok_or_else(|| {
                invariant(format!(
                    "item {} (source {}) missing during unit restore",
                    item.external_key, item.source_id
                ))
            })?;

        let live_units = self
            .repos
            .units
            .find_by_item(live_item.id)
            .await
            .map_err(Error::repository(EntityKind::Unit))?;

        if newly_inserted || item.last_update > live_item.last_update {
            self.replace_units(&live_item, item, live_units).await
        } else {
            self.merge_units(item, live_units).await
        }
    }

    async fn replace_units(
        &mut self,
        live_item: &LibraryItem,
        item: &BackupItem,
        live_units: Vec<Unit>,
    ) -> Result<()> {
        let by_key: HashMap<&str, &Unit> = live_units
            .iter()
            .map(|u| (u.unit_key.as_str(), u))
            .collect();

        let mut seen = HashSet::new();
        let mut inserts = Vec::with_capacity(item.units.len());
        for unit in &item.units {
            if !seen.insert(unit.unit_key.as_str()) {
                tracing::warn!(unit_key = %unit.unit_key, "duplicate unit in snapshot skipped");
                continue;
            }
            let mut new = unit.to_new_unit(live_item.id);
            if let Some(local) = by_key.get(unit.unit_key.as_str()) {
                new.read |= local.read;
                new.bookmark |= local.bookmark;
                new.progress = new.progress.max(local.progress);
            }
            inserts.push(new);
        }

        if !live_units.is_empty() {
            let ids: Vec<_> = live_units.iter().map(|u| u.id).collect();
            let count = ids.len();
            self.repos
                .units
                .delete_many(ids)
                .await
                .map_err(Error::repository(EntityKind::Unit))?;
            self.report.units_deleted += count;
        }

        let count = inserts.len();
        self.repos
            .units
            .insert_many(inserts)
            .await
            .map_err(Error::repository(EntityKind::Unit))?;
        self.report.units_inserted += count;

        if item.last_update > live_item.last_update {
            let mut update = ItemUpdate::new(live_item.id);
            update.last_update = Some(item.last_update);
            self.repos
                .items
                .update(update)
                .await
                .map_err(Error::repository(EntityKind::Item))?;
        }

        tracing::debug!(inserted = count, "replaced units from snapshot");
        Ok(())
    }

    async fn merge_units(&mut self, item: &BackupItem, live_units: Vec<Unit>) -> Result<()> {
        let mut by_key: HashMap<&str, &BackupUnit> = HashMap::with_capacity(item.units.len());
        for unit in &item.units {
            by_key.entry(unit.unit_key.as_str()).or_insert(unit);
        }

        let updates: Vec<UnitUpdate> = live_units
            .iter()
            .filter_map(|local| {
                let backup = by_key.get(local.unit_key.as_str())?;
                merged_unit_update(local, backup)
            })
            .collect();

        if !updates.is_empty() {
            let count = updates.len();
            self.repos
                .units
                .update_many(updates)
                .await
                .map_err(Error::repository(EntityKind::Unit))?;
            self.report.units_updated += count;
            tracing::debug!(updated = count, "merged units in place");
        }
        Ok(())
    }

    /// Replace the item's category memberships with the mapped snapshot ones.
    ///
    /// Indices with no mapping are dropped. When none resolve, live
    /// memberships are left as they are.
    #[instrument(skip_all, fields(item_id = item_id, refs = indices.len()))]
    pub async fn restore_item_categories(
        &mut self,
        item_id: ItemId,
        indices: &[i32],
        mapping: &CategoryMapping,
    ) -> Result<()> {
        if indices.is_empty() {
            return Ok(());
        }

        let mut category_ids = Vec::with_capacity(indices.len());
        for &index in indices {
            match mapping.get(index) {
                Some(id) if !category_ids.contains(&id) => category_ids.push(id),
                Some(_) => {}
                None => {
                    tracing::warn!(index, "dropping unresolved category reference");
                    self.report.category_refs_dropped += 1;
                }
            }
        }

        if category_ids.is_empty() {
            return Ok(());
        }

        self.repos
            .item_categories
            .replace_for_item(item_id, category_ids)
            .await
            .map_err(Error::repository(EntityKind::ItemCategory))?;
        self.report.memberships_replaced += 1;
        Ok(())
    }

    /// Insert new tracks and raise progress on existing ones.
    #[instrument(skip_all, fields(item_id = item_id, tracks = tracks.len()))]
    pub async fn restore_tracks(&mut self, item_id: ItemId, tracks: &[BackupTrack]) -> Result<()> {
        if tracks.is_empty() {
            return Ok(());
        }

        let live = self
            .repos
            .tracks
            .find_by_item(item_id)
            .await
            .map_err(Error::repository(EntityKind::Track))?;

        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        let mut seen = HashSet::new();
        for track in tracks {
            if !seen.insert(track.site_id) {
                continue;
            }
            match live.iter().find(|l| l.site_id == track.site_id) {
                None => inserts.push(track.to_new_track(item_id)),
                Some(local)
                    if track.last_read > local.last_read
                        || track.total_chapters > local.total_chapters =>
                {
                    updates.push(TrackUpdate {
                        id: local.id,
                        last_read: Some(local.last_read.max(track.last_read)),
                        total_chapters: Some(local.total_chapters.max(track.total_chapters)),
                    });
                }
                Some(_) => {}
            }
        }

        if !inserts.is_empty() {
            let count = inserts.len();
            self.repos
                .tracks
                .insert_many(inserts)
                .await
                .map_err(Error::repository(EntityKind::Track))?;
            self.report.tracks_inserted += count;
        }
        if !updates.is_empty() {
            let count = updates.len();
            self.repos
                .tracks
                .update_many(updates)
                .await
                .map_err(Error::repository(EntityKind::Track))?;
            self.report.tracks_updated += count;
        }
        Ok(())
    }
}

/// Overwrite metadata from the snapshot and put the item back in the library.
fn metadata_update(live: &LibraryItem, item: &BackupItem) -> ItemUpdate {
    ItemUpdate {
        id: live.id,
        title: Some(item.title.clone()),
        author: Some(item.author.clone()),
        artist: Some(item.artist.clone()),
        description: Some(item.description.clone()),
        tags: Some(item.tags.clone()),
        status: Some(item.status),
        cover_url: Some(item.cover_url.clone()),
        custom_cover: Some(item.custom_cover),
        favorite: Some(true),
        viewer_mode: Some(item.viewer_mode),
        flags: Some(item.flags),
        last_init: Some(item.last_init),
        ..Default::default()
    }
}

/// Reading state of `local` OR'd/maxed with `backup`; `None` when unchanged.
fn merged_unit_update(local: &Unit, backup: &BackupUnit) -> Option<UnitUpdate> {
    let read = local.read || backup.read;
    let bookmark = local.bookmark || backup.bookmark;
    let progress = local.progress.max(backup.progress);

    if read == local.read && bookmark == local.bookmark && progress == local.progress {
        return None;
    }
    Some(UnitUpdate {
        id: local.id,
        read: Some(read),
        bookmark: Some(bookmark),
        progress: Some(progress),
    })
}

fn invariant(message: String) -> Error {
    tracing::error!(%message, "restore invariant violated");
    Error::InvariantViolation(message)
}
