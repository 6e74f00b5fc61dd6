//! Repository contracts consumed by the engine.
//!
//! The engine never talks to a storage engine directly. Each entity family is
//! reached through a narrow async trait, so restores can be exercised against
//! [`MemoryStore`](crate::MemoryStore) or any real backend. Implementations
//! must not cache between calls: every call observes the effects of the ones
//! before it.

use crate::error::RepositoryError;
use crate::{
    Category, CategoryId, ItemId, ItemUpdate, LibraryItem, NewCategory, NewItem, NewTrack,
    NewUnit, TrackRecord, TrackUpdate, Unit, UnitId, UnitUpdate,
};
use async_trait::async_trait;

/// Result type returned by repository collaborators.
pub type RepoResult<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Find an item by its identity key.
    async fn find_by_key(&self, external_key: &str, source_id: i64)
        -> RepoResult<Option<LibraryItem>>;

    /// All items currently in the library, in storage order.
    async fn find_favorites(&self) -> RepoResult<Vec<LibraryItem>>;

    /// Insert an item and return its new id.
    async fn insert(&self, item: NewItem) -> RepoResult<ItemId>;

    async fn update(&self, update: ItemUpdate) -> RepoResult<()>;
}

#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn find_by_item(&self, item_id: ItemId) -> RepoResult<Vec<Unit>>;

    async fn insert_many(&self, units: Vec<NewUnit>) -> RepoResult<()>;

    async fn delete_many(&self, ids: Vec<UnitId>) -> RepoResult<()>;

    async fn update_many(&self, updates: Vec<UnitUpdate>) -> RepoResult<()>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories, system ones included.
    async fn find_all(&self) -> RepoResult<Vec<Category>>;

    async fn insert_many(&self, categories: Vec<NewCategory>) -> RepoResult<()>;
}

#[async_trait]
pub trait ItemCategoryRepository: Send + Sync {
    /// Categories the item belongs to.
    async fn find_by_item(&self, item_id: ItemId) -> RepoResult<Vec<Category>>;

    /// Replace every membership of the item with `category_ids`.
    async fn replace_for_item(
        &self,
        item_id: ItemId,
        category_ids: Vec<CategoryId>,
    ) -> RepoResult<()>;
}

#[async_trait]
pub trait TrackRepository: Send + Sync {
    async fn find_by_item(&self, item_id: ItemId) -> RepoResult<Vec<TrackRecord>>;

    async fn insert_many(&self, tracks: Vec<NewTrack>) -> RepoResult<()>;

    async fn update_many(&self, updates: Vec<TrackUpdate>) -> RepoResult<()>;
}

/// One handle per entity family.
#[derive(Clone, Copy)]
pub struct Repositories<'a> {
    pub items: &'a dyn ItemRepository,
    pub units: &'a dyn UnitRepository,
    pub categories: &'a dyn CategoryRepository,
    pub item_categories: &'a dyn ItemCategoryRepository,
    pub tracks: &'a dyn TrackRepository,
}

impl<'a> Repositories<'a> {
    /// Use one object that implements every repository.
    pub fn from_store<S>(store: &'a S) -> Self
    where
        S: ItemRepository
            + UnitRepository
            + CategoryRepository
            + ItemCategoryRepository
            + TrackRepository,
    {
        Self {
            items: store,
            units: store,
            categories: store,
            item_categories: store,
            tracks: store,
        }
    }
}
