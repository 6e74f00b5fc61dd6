//! MemoryStore - an in-memory library implementing every repository.
//!
//! All state lives in a [`LibraryState`] behind a [`RwLock`], so the
//! repository traits can operate on `&self`. The store enforces the same
//! uniqueness rules a real backend would (item keys, unit keys per item,
//! track sites per item, category names), which makes accidental duplicates
//! visible in tests instead of silently succeeding.
//!
//! State can be exported to JSON and imported again; the CLI uses this as its
//! on-disk library format.

use crate::error::{EntityKind, RepositoryError};
use crate::repository::{
    CategoryRepository, ItemCategoryRepository, ItemRepository, RepoResult, TrackRepository,
    UnitRepository,
};
use crate::{
    error::Result, Category, CategoryId, Error, ItemCategory, ItemId, ItemUpdate, LibraryItem,
    NewCategory, NewItem, NewTrack, NewUnit, TrackId, TrackRecord, TrackUpdate, Unit, UnitId,
    UnitUpdate,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;
use tokio::sync::RwLock;

/// Plain library contents. Ordered maps keep exports deterministic and make
/// fetch order equal to insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryState {
    next_id: i64,
    items: BTreeMap<ItemId, LibraryItem>,
    units: BTreeMap<UnitId, Unit>,
    categories: BTreeMap<CategoryId, Category>,
    item_categories: BTreeSet<ItemCategory>,
    tracks: BTreeMap<TrackId, TrackRecord>,
}

impl LibraryState {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Insert an item, enforcing `(external_key, source_id)` uniqueness.
    pub fn add_item(&mut self, item: NewItem) -> RepoResult<ItemId> {
        if self
            .item_by_key(&item.external_key, item.source_id)
            .is_some()
        {
            return Err(RepositoryError::new(format!(
                "item already exists: {} (source {})",
                item.external_key, item.source_id
            )));
        }
        let id = self.allocate_id();
        self.items.insert(id, LibraryItem::from_new(id, item));
        Ok(id)
    }

    /// Insert a unit, enforcing `unit_key` uniqueness within the item.
    pub fn add_unit(&mut self, unit: NewUnit) -> RepoResult<UnitId> {
        if !self.items.contains_key(&unit.item_id) {
            return Err(RepositoryError::new(format!(
                "unit references missing item {}",
                unit.item_id
            )));
        }
        if self
            .units
            .values()
            .any(|u| u.item_id == unit.item_id && u.unit_key == unit.unit_key)
        {
            return Err(RepositoryError::new(format!(
                "unit already exists: {} (item {})",
                unit.unit_key, unit.item_id
            )));
        }
        let id = self.allocate_id();
        self.units.insert(id, Unit::from_new(id, unit));
        Ok(id)
    }

    /// Insert a category. User category names are unique ignoring case.
    pub fn add_category(&mut self, category: NewCategory, is_system: bool) -> RepoResult<CategoryId> {
        if !is_system {
            let lowered = category.name.to_lowercase();
            if self
                .categories
                .values()
                .any(|c| !c.is_system && c.name.to_lowercase() == lowered)
            {
                return Err(RepositoryError::new(format!(
                    "category already exists: {}",
                    category.name
                )));
            }
        }
        let id = self.allocate_id();
        self.categories.insert(
            id,
            Category {
                id,
                name: category.name,
                order: category.order,
                flags: category.flags,
                is_system,
            },
        );
        Ok(id)
    }

    pub fn link(&mut self, item_id: ItemId, category_id: CategoryId) -> RepoResult<()> {
        if !self.items.contains_key(&item_id) {
            return Err(RepositoryError::new(format!("missing item {item_id}")));
        }
        if !self.categories.contains_key(&category_id) {
            return Err(RepositoryError::new(format!(
                "missing category {category_id}"
            )));
        }
        self.item_categories.insert(ItemCategory {
            item_id,
            category_id,
        });
        Ok(())
    }

    /// Insert a track, enforcing `site_id` uniqueness within the item.
    pub fn add_track(&mut self, track: NewTrack) -> RepoResult<TrackId> {
        if !self.items.contains_key(&track.item_id) {
            return Err(RepositoryError::new(format!(
                "track references missing item {}",
                track.item_id
            )));
        }
        if self
            .tracks
            .values()
            .any(|t| t.item_id == track.item_id && t.site_id == track.site_id)
        {
            return Err(RepositoryError::new(format!(
                "track already exists: site {} (item {})",
                track.site_id, track.item_id
            )));
        }
        let id = self.allocate_id();
        self.tracks.insert(id, TrackRecord::from_new(id, track));
        Ok(id)
    }

    pub fn items(&self) -> impl Iterator<Item = &LibraryItem> {
        self.items.values()
    }

    pub fn item(&self, id: ItemId) -> Option<&LibraryItem> {
        self.items.get(&id)
    }

    pub fn item_by_key(&self, external_key: &str, source_id: i64) -> Option<&LibraryItem> {
        self.items
            .values()
            .find(|i| i.external_key == external_key && i.source_id == source_id)
    }

    pub fn units_of(&self, item_id: ItemId) -> Vec<&Unit> {
        self.units.values().filter(|u| u.item_id == item_id).collect()
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.values()
    }

    pub fn categories_of(&self, item_id: ItemId) -> Vec<&Category> {
        self.item_categories
            .iter()
            .filter(|ic| ic.item_id == item_id)
            .filter_map(|ic| self.categories.get(&ic.category_id))
            .collect()
    }

    pub fn tracks_of(&self, item_id: ItemId) -> Vec<&TrackRecord> {
        self.tracks
            .values()
            .filter(|t| t.item_id == item_id)
            .collect()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn membership_count(&self) -> usize {
        self.item_categories.len()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

/// In-memory implementation of every repository trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<LibraryState>,
    failing: Mutex<HashSet<EntityKind>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `state`.
    pub fn with_state(state: LibraryState) -> Self {
        Self {
            state: RwLock::new(state),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Copy of the current contents.
    pub async fn state(&self) -> LibraryState {
        self.state.read().await.clone()
    }

    /// Make every call against `entity`'s repository fail until
    /// [`clear_failures`](Self::clear_failures) is called.
    pub fn fail_on(&self, entity: EntityKind) {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(entity);
    }

    pub fn clear_failures(&self) {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn check(&self, entity: EntityKind) -> RepoResult<()> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if failing.contains(&entity) {
            return Err(RepositoryError::new(format!("{entity} store unavailable")));
        }
        Ok(())
    }

    /// Serialize the store contents to JSON.
    pub async fn to_json(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string_pretty(&*state).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load store contents from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let state: LibraryState = serde_json::from_str(json)
            .map_err(|e| Error::Serialization(format!("invalid library store: {e}")))?;
        Ok(Self::with_state(state))
    }
}

#[async_trait]
impl ItemRepository for MemoryStore {
    async fn find_by_key(
        &self,
        external_key: &str,
        source_id: i64,
    ) -> RepoResult<Option<LibraryItem>> {
        self.check(EntityKind::Item)?;
        let state = self.state.read().await;
        Ok(state.item_by_key(external_key, source_id).cloned())
    }

    async fn find_favorites(&self) -> RepoResult<Vec<LibraryItem>> {
        self.check(EntityKind::Item)?;
        let state = self.state.read().await;
        Ok(state.items.values().filter(|i| i.favorite).cloned().collect())
    }

    async fn insert(&self, item: NewItem) -> RepoResult<ItemId> {
        self.check(EntityKind::Item)?;
        self.state.write().await.add_item(item)
    }

    async fn update(&self, update: ItemUpdate) -> RepoResult<()> {
        self.check(EntityKind::Item)?;
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(&update.id)
            .ok_or_else(|| RepositoryError::new(format!("item not found: {}", update.id)))?;
        item.apply(update);
        Ok(())
    }
}

#[async_trait]
impl UnitRepository for MemoryStore {
    async fn find_by_item(&self, item_id: ItemId) -> RepoResult<Vec<Unit>> {
        self.check(EntityKind::Unit)?;
        let state = self.state.read().await;
        Ok(state.units_of(item_id).into_iter().cloned().collect())
    }

    async fn insert_many(&self, units: Vec<NewUnit>) -> RepoResult<()> {
        self.check(EntityKind::Unit)?;
        let mut state = self.state.write().await;
        for unit in units {
            state.add_unit(unit)?;
        }
        Ok(())
    }

    async fn delete_many(&self, ids: Vec<UnitId>) -> RepoResult<()> {
        self.check(EntityKind::Unit)?;
        let mut state = self.state.write().await;
        for id in ids {
            state.units.remove(&id);
        }
        Ok(())
    }

    async fn update_many(&self, updates: Vec<UnitUpdate>) -> RepoResult<()> {
        self.check(EntityKind::Unit)?;
        let mut state = self.state.write().await;
        for update in &updates {
            let unit = state
                .units
                .get_mut(&update.id)
                .ok_or_else(|| RepositoryError::new(format!("unit not found: {}", update.id)))?;
            unit.apply(update);
        }
        Ok(())
    }
}

#[async_trait]
impl CategoryRepository for MemoryStore {
    async fn find_all(&self) -> RepoResult<Vec<Category>> {
        self.check(EntityKind::Category)?;
        let state = self.state.read().await;
        Ok(state.categories.values().cloned().collect())
    }

    async fn insert_many(&self, categories: Vec<NewCategory>) -> RepoResult<()> {
        self.check(EntityKind::Category)?;
        let mut state = self.state.write().await;
        for category in categories {
            state.add_category(category, false)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ItemCategoryRepository for MemoryStore {
    async fn find_by_item(&self, item_id: ItemId) -> RepoResult<Vec<Category>> {
        self.check(EntityKind::ItemCategory)?;
        let state = self.state.read().await;
        Ok(state.categories_of(item_id).into_iter().cloned().collect())
    }

    async fn replace_for_item(
        &self,
        item_id: ItemId,
        category_ids: Vec<CategoryId>,
    ) -> RepoResult<()> {
        self.check(EntityKind::ItemCategory)?;
        let mut state = self.state.write().await;
        state.item_categories.retain(|ic| ic.item_id != item_id);
        for category_id in category_ids {
            state.link(item_id, category_id)?;
        }
        Ok(())
    }
}

#[async_trait]
impl TrackRepository for MemoryStore {
    async fn find_by_item(&self, item_id: ItemId) -> RepoResult<Vec<TrackRecord>> {
        self.check(EntityKind::Track)?;
        let state = self.state.read().await;
        Ok(state.tracks_of(item_id).into_iter().cloned().collect())
    }

    async fn insert_many(&self, tracks: Vec<NewTrack>) -> RepoResult<()> {
        self.check(EntityKind::Track)?;
        let mut state = self.state.write().await;
        for track in tracks {
            state.add_track(track)?;
        }
        Ok(())
    }

    async fn update_many(&self, updates: Vec<TrackUpdate>) -> RepoResult<()> {
        self.check(EntityKind::Track)?;
        let mut state = self.state.write().await;
        for update in &updates {
            let track = state
                .tracks
                .get_mut(&update.id)
                .ok_or_else(|| RepositoryError::new(format!("track not found: {}", update.id)))?;
            track.apply(update);
        }
        Ok(())
    }
}
