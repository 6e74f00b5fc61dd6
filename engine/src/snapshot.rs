//! Snapshot types for moving a library between stores.
//!
//! A snapshot is the portable, repository-independent form of a library. It
//! exists only while a backup is being written or restored; the live stores
//! never persist it. Categories referenced from an item use the category's
//! `order` at dump time (a backup-local index), not a live id.
//!
//! Every field holding its type's default is left out of the encoded form and
//! filled back in on decode, which keeps backups of large libraries small.

use crate::{
    error::Result, Category, Error, ItemId, LibraryItem, NewItem, NewTrack, NewUnit, Timestamp,
    TrackRecord, Unit,
};
use serde::{Deserialize, Serialize};

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// The root aggregate of a backup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    /// Snapshot format version
    #[serde(skip_serializing_if = "is_default")]
    pub version: u32,
    /// When the dump was taken (milliseconds since epoch)
    #[serde(skip_serializing_if = "is_default")]
    pub created_at: Timestamp,
    /// Favorited items with their units, memberships and tracks
    #[serde(skip_serializing_if = "is_default")]
    pub items: Vec<BackupItem>,
    /// Non-system categories
    #[serde(skip_serializing_if = "is_default")]
    pub categories: Vec<BackupCategory>,
    /// Sources referenced by `items`
    #[serde(skip_serializing_if = "is_default")]
    pub sources: Vec<BackupSource>,
}

impl Snapshot {
    /// Create a new empty snapshot.
    pub fn new(created_at: Timestamp) -> Self {
        Self {
            version: SNAPSHOT_FORMAT_VERSION,
            created_at,
            ..Default::default()
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Count units across all items.
    pub fn unit_count(&self) -> usize {
        self.items.iter().map(|i| i.units.len()).sum()
    }

    /// Count tracks across all items.
    pub fn track_count(&self) -> usize {
        self.items.iter().map(|i| i.tracks.len()).sum()
    }

    /// Check that this build can read the snapshot.
    pub fn validate(&self) -> Result<()> {
        if self.version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::CorruptBackup(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                self.version, SNAPSHOT_FORMAT_VERSION
            )));
        }
        Ok(())
    }
}

/// A library item as stored in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupItem {
    #[serde(skip_serializing_if = "is_default")]
    pub external_key: String,
    #[serde(skip_serializing_if = "is_default")]
    pub source_id: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub title: String,
    #[serde(skip_serializing_if = "is_default")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "is_default")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "is_default")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "is_default")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "is_default")]
    pub status: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "is_default")]
    pub custom_cover: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub favorite: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub viewer_mode: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub flags: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub date_added: Timestamp,
    #[serde(skip_serializing_if = "is_default")]
    pub last_update: Timestamp,
    #[serde(skip_serializing_if = "is_default")]
    pub last_init: Timestamp,
    #[serde(skip_serializing_if = "is_default")]
    pub units: Vec<BackupUnit>,
    /// Backup-local category indices (category `order` at dump time)
    #[serde(skip_serializing_if = "is_default")]
    pub categories: Vec<i32>,
    #[serde(skip_serializing_if = "is_default")]
    pub tracks: Vec<BackupTrack>,
}

impl BackupItem {
    /// Capture a live item. Units, memberships and tracks are filled in by the
    /// dump builder.
    pub fn from_live(item: &LibraryItem) -> Self {
        Self {
            external_key: item.external_key.clone(),
            source_id: item.source_id,
            title: item.title.clone(),
            author: item.author.clone(),
            artist: item.artist.clone(),
            description: item.description.clone(),
            tags: item.tags.clone(),
            status: item.status,
            cover_url: item.cover_url.clone(),
            custom_cover: item.custom_cover,
            favorite: item.favorite,
            viewer_mode: item.viewer_mode,
            flags: item.flags,
            date_added: item.date_added,
            last_update: item.last_update,
            last_init: item.last_init,
            ..Default::default()
        }
    }

    /// Insert request for this item. Restored items always land in the
    /// library, whatever the snapshot says.
    pub fn to_new_item(&self) -> NewItem {
        NewItem {
            external_key: self.external_key.clone(),
            source_id: self.source_id,
            title: self.title.clone(),
            author: self.author.clone(),
            artist: self.artist.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            status: self.status,
            cover_url: self.cover_url.clone(),
            custom_cover: self.custom_cover,
            favorite: true,
            viewer_mode: self.viewer_mode,
            flags: self.flags,
            date_added: self.date_added,
            last_update: self.last_update,
            last_init: self.last_init,
        }
    }
}

/// A unit as stored in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupUnit {
    #[serde(skip_serializing_if = "is_default")]
    pub unit_key: String,
    #[serde(skip_serializing_if = "is_default")]
    pub name: String,
    #[serde(skip_serializing_if = "is_default")]
    pub scanlator: Option<String>,
    #[serde(skip_serializing_if = "is_default")]
    pub read: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub bookmark: bool,
    #[serde(skip_serializing_if = "is_default")]
    pub progress: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub number: f32,
    #[serde(skip_serializing_if = "is_default")]
    pub source_order: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub date_fetch: Timestamp,
    #[serde(skip_serializing_if = "is_default")]
    pub date_upload: Timestamp,
}

impl BackupUnit {
    pub fn from_live(unit: &Unit) -> Self {
        Self {
            unit_key: unit.unit_key.clone(),
            name: unit.name.clone(),
            scanlator: unit.scanlator.clone(),
            read: unit.read,
            bookmark: unit.bookmark,
            progress: unit.progress,
            number: unit.number,
            source_order: unit.source_order,
            date_fetch: unit.date_fetch,
            date_upload: unit.date_upload,
        }
    }

    pub fn to_new_unit(&self, item_id: ItemId) -> NewUnit {
        NewUnit {
            item_id,
            unit_key: self.unit_key.clone(),
            name: self.name.clone(),
            scanlator: self.scanlator.clone(),
            read: self.read,
            bookmark: self.bookmark,
            progress: self.progress,
            number: self.number,
            source_order: self.source_order,
            date_fetch: self.date_fetch,
            date_upload: self.date_upload,
        }
    }
}

/// A category as stored in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupCategory {
    #[serde(skip_serializing_if = "is_default")]
    pub name: String,
    /// Also the backup-local index items use to reference this category
    #[serde(skip_serializing_if = "is_default")]
    pub order: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub flags: i32,
}

impl BackupCategory {
    pub fn from_live(category: &Category) -> Self {
        Self {
            name: category.name.clone(),
            order: category.order,
            flags: category.flags,
        }
    }
}

/// A tracking-site record as stored in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupTrack {
    #[serde(skip_serializing_if = "is_default")]
    pub site_id: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub remote_id: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub title: String,
    #[serde(skip_serializing_if = "is_default")]
    pub last_read: f32,
    #[serde(skip_serializing_if = "is_default")]
    pub total_chapters: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub score: f32,
    #[serde(skip_serializing_if = "is_default")]
    pub status: i32,
    #[serde(skip_serializing_if = "is_default")]
    pub tracking_url: String,
}

impl BackupTrack {
    pub fn from_live(track: &TrackRecord) -> Self {
        Self {
            site_id: track.site_id,
            remote_id: track.remote_id,
            title: track.title.clone(),
            last_read: track.last_read,
            total_chapters: track.total_chapters,
            score: track.score,
            status: track.status,
            tracking_url: track.tracking_url.clone(),
        }
    }

    pub fn to_new_track(&self, item_id: ItemId) -> NewTrack {
        NewTrack {
            item_id,
            site_id: self.site_id,
            remote_id: self.remote_id,
            title: self.title.clone(),
            last_read: self.last_read,
            total_chapters: self.total_chapters,
            score: self.score,
            status: self.status,
            tracking_url: self.tracking_url.clone(),
        }
    }
}

/// A content source referenced by the backed-up items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackupSource {
    #[serde(skip_serializing_if = "is_default")]
    pub source_id: i64,
    #[serde(skip_serializing_if = "is_default")]
    pub name: String,
}

/// Summary of a snapshot (without the full data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub version: u32,
    pub created_at: Timestamp,
    pub item_count: usize,
    pub unit_count: usize,
    pub category_count: usize,
    pub track_count: usize,
    pub source_count: usize,
}

impl From<&Snapshot> for SnapshotMetadata {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            version: snapshot.version,
            created_at: snapshot.created_at,
            item_count: snapshot.item_count(),
            unit_count: snapshot.unit_count(),
            category_count: snapshot.categories.len(),
            track_count: snapshot.track_count(),
            source_count: snapshot.sources.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_item() -> LibraryItem {
        LibraryItem {
            id: 42,
            external_key: "/series/9".into(),
            source_id: 3,
            title: "Nine".into(),
            author: Some("A".into()),
            artist: None,
            description: Some("desc".into()),
            tags: vec!["drama".into()],
            status: 2,
            cover_url: None,
            custom_cover: true,
            favorite: false,
            viewer_mode: 1,
            flags: 4,
            date_added: 100,
            last_update: 200,
            last_init: 300,
        }
    }

    #[test]
    fn create_empty_snapshot() {
        let snapshot = Snapshot::new(1000);
        assert_eq!(snapshot.version, SNAPSHOT_FORMAT_VERSION);
        assert_eq!(snapshot.created_at, 1000);
        assert_eq!(snapshot.item_count(), 0);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn restored_items_are_always_favorites() {
        let backup = BackupItem::from_live(&live_item());
        assert!(!backup.favorite);

        let new = backup.to_new_item();
        assert!(new.favorite);
        assert_eq!(new.external_key, "/series/9");
        assert_eq!(new.last_init, 300);
        assert!(new.custom_cover);
    }

    #[test]
    fn default_fields_are_omitted() {
        let unit = BackupUnit {
            unit_key: "c1".into(),
            read: true,
            ..Default::default()
        };
        let json = serde_json::to_value(&unit).unwrap();
        assert_eq!(json, serde_json::json!({"unitKey": "c1", "read": true}));

        let parsed: BackupUnit = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, unit);
    }

    #[test]
    fn reject_future_format_version() {
        let snapshot = Snapshot {
            version: SNAPSHOT_FORMAT_VERSION + 1,
            ..Default::default()
        };
        assert!(matches!(snapshot.validate(), Err(Error::CorruptBackup(_))));
    }

    #[test]
    fn snapshot_metadata() {
        let mut snapshot = Snapshot::new(5);
        let mut item = BackupItem::from_live(&live_item());
        item.units = vec![BackupUnit::default(), BackupUnit::default()];
        item.tracks = vec![BackupTrack::default()];
        snapshot.items.push(item);
        snapshot.categories.push(BackupCategory {
            name: "Reading".into(),
            order: 1,
            flags: 0,
        });

        let metadata: SnapshotMetadata = (&snapshot).into();

        assert_eq!(metadata.version, SNAPSHOT_FORMAT_VERSION);
        assert_eq!(metadata.item_count, 1);
        assert_eq!(metadata.unit_count, 2);
        assert_eq!(metadata.track_count, 1);
        assert_eq!(metadata.category_count, 1);
        assert_eq!(metadata.source_count, 0);
    }
}
