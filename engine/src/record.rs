//! Record types for live library entities.
//!
//! These are the rows the repositories own. The engine only reads them and
//! issues insert/update/delete requests built from the `New*` and `*Update`
//! types below.

use crate::{CategoryId, ItemId, Timestamp, TrackId, UnitId};
use serde::{Deserialize, Serialize};

/// A library item (a series, book, or anything else with units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItem {
    pub id: ItemId,
    /// Key of the item at its source; unique together with `source_id`
    pub external_key: String,
    pub source_id: i64,
    pub title: String,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub status: i32,
    pub cover_url: Option<String>,
    pub custom_cover: bool,
    pub favorite: bool,
    pub viewer_mode: i32,
    pub flags: i32,
    pub date_added: Timestamp,
    /// Content freshness: last time the unit list changed
    pub last_update: Timestamp,
    /// Metadata freshness: last time the metadata was refreshed
    pub last_init: Timestamp,
}

impl LibraryItem {
    /// Build the live row for a freshly inserted item.
    pub fn from_new(id: ItemId, new: NewItem) -> Self {
        Self {
            id,
            external_key: new.external_key,
            source_id: new.source_id,
            title: new.title,
            author: new.author,
            artist: new.artist,
            description: new.description,
            tags: new.tags,
            status: new.status,
            cover_url: new.cover_url,
            custom_cover: new.custom_cover,
            favorite: new.favorite,
            viewer_mode: new.viewer_mode,
            flags: new.flags,
            date_added: new.date_added,
            last_update: new.last_update,
            last_init: new.last_init,
        }
    }

    /// Apply a partial update in place.
    pub fn apply(&mut self, update: ItemUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(author) = update.author {
            self.author = author;
        }
        if let Some(artist) = update.artist {
            self.artist = artist;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(cover_url) = update.cover_url {
            self.cover_url = cover_url;
        }
        if let Some(custom_cover) = update.custom_cover {
            self.custom_cover = custom_cover;
        }
        if let Some(favorite) = update.favorite {
            self.favorite = favorite;
        }
        if let Some(viewer_mode) = update.viewer_mode {
            self.viewer_mode = viewer_mode;
        }
        if let Some(flags) = update.flags {
            self.flags = flags;
        }
        if let Some(date_added) = update.date_added {
            self.date_added = date_added;
        }
        if let Some(last_update) = update.last_update {
            self.last_update = last_update;
        }
        if let Some(last_init) = update.last_init {
            self.last_init = last_init;
        }
    }
}

/// Insert request for a library item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub external_key: String,
    pub source_id: i64,
    pub title: String,
    pub author: Option<String>,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub status: i32,
    pub cover_url: Option<String>,
    pub custom_cover: bool,
    pub favorite: bool,
    pub viewer_mode: i32,
    pub flags: i32,
    pub date_added: Timestamp,
    pub last_update: Timestamp,
    pub last_init: Timestamp,
}

/// Partial update for a library item. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub id: ItemId,
    pub title: Option<String>,
    pub author: Option<Option<String>>,
    pub artist: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<i32>,
    pub cover_url: Option<Option<String>>,
    pub custom_cover: Option<bool>,
    pub favorite: Option<bool>,
    pub viewer_mode: Option<i32>,
    pub flags: Option<i32>,
    pub date_added: Option<Timestamp>,
    pub last_update: Option<Timestamp>,
    pub last_init: Option<Timestamp>,
}

impl ItemUpdate {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// A unit (chapter, episode, volume) of a library item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: UnitId,
    pub item_id: ItemId,
    /// Unique within the parent item
    pub unit_key: String,
    pub name: String,
    pub scanlator: Option<String>,
    pub read: bool,
    pub bookmark: bool,
    pub progress: i64,
    pub number: f32,
    pub source_order: i32,
    pub date_fetch: Timestamp,
    pub date_upload: Timestamp,
}

impl Unit {
    pub fn from_new(id: UnitId, new: NewUnit) -> Self {
        Self {
            id,
            item_id: new.item_id,
            unit_key: new.unit_key,
            name: new.name,
            scanlator: new.scanlator,
            read: new.read,
            bookmark: new.bookmark,
            progress: new.progress,
            number: new.number,
            source_order: new.source_order,
            date_fetch: new.date_fetch,
            date_upload: new.date_upload,
        }
    }

    pub fn apply(&mut self, update: &UnitUpdate) {
        if let Some(read) = update.read {
            self.read = read;
        }
        if let Some(bookmark) = update.bookmark {
            self.bookmark = bookmark;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUnit {
    pub item_id: ItemId,
    pub unit_key: String,
    pub name: String,
    pub scanlator: Option<String>,
    pub read: bool,
    pub bookmark: bool,
    pub progress: i64,
    pub number: f32,
    pub source_order: i32,
    pub date_fetch: Timestamp,
    pub date_upload: Timestamp,
}

/// Reading-state update for a unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitUpdate {
    pub id: UnitId,
    pub read: Option<bool>,
    pub bookmark: Option<bool>,
    pub progress: Option<i64>,
}

/// A user category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub order: i32,
    pub flags: i32,
    /// System categories never take part in backup or restore
    pub is_system: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub order: i32,
    pub flags: i32,
}

/// Membership of an item in a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCategory {
    pub item_id: ItemId,
    pub category_id: CategoryId,
}

/// Progress of an item on an external tracking site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRecord {
    pub id: TrackId,
    pub item_id: ItemId,
    /// Unique within the parent item
    pub site_id: i32,
    pub remote_id: i64,
    pub title: String,
    pub last_read: f32,
    pub total_chapters: i32,
    pub score: f32,
    pub status: i32,
    pub tracking_url: String,
}

impl TrackRecord {
    pub fn from_new(id: TrackId, new: NewTrack) -> Self {
        Self {
            id,
            item_id: new.item_id,
            site_id: new.site_id,
            remote_id: new.remote_id,
            title: new.title,
            last_read: new.last_read,
            total_chapters: new.total_chapters,
            score: new.score,
            status: new.status,
            tracking_url: new.tracking_url,
        }
    }

    pub fn apply(&mut self, update: &TrackUpdate) {
        if let Some(last_read) = update.last_read {
            self.last_read = last_read;
        }
        if let Some(total_chapters) = update.total_chapters {
            self.total_chapters = total_chapters;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTrack {
    pub item_id: ItemId,
    pub site_id: i32,
    pub remote_id: i64,
    pub title: String,
    pub last_read: f32,
    pub total_chapters: i32,
    pub score: f32,
    pub status: i32,
    pub tracking_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackUpdate {
    pub id: TrackId,
    pub last_read: Option<f32>,
    pub total_chapters: Option<i32>,
}
