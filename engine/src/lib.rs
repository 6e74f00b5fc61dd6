//! # Shelfkeep Engine
//!
//! Backup and restore for a personal library: items, their units (chapters,
//! episodes), categories, and tracking-site progress.
//!
//! A backup captures the favorited part of a library as a [`Snapshot`]. A
//! restore merges a snapshot back into a live library without destroying
//! newer local state and without duplicating what is already there. All
//! conflicts are resolved automatically, and restoring the same snapshot twice
//! has the same effect as restoring it once.
//!
//! ## Layers
//!
//! - [`codec`] - snapshot <-> gzip-compressed CBOR bytes
//! - [`snapshot`] - the portable model, independent of any repository
//! - [`dump`] - reads live repositories into a snapshot
//! - [`reconcile`] - merges a snapshot into live repositories
//! - [`backup`] - file-level entry points tying the layers together
//!
//! Storage is reached only through the traits in [`repository`]. The
//! [`MemoryStore`] implements all of them in memory.
//!
//! ## Quick Start
//!
//! ```rust
//! use shelfkeep_engine::{
//!     codec, BackupOptions, MemoryStore, Repositories, Restorer, SourceCatalog,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> shelfkeep_engine::Result<()> {
//! let source = MemoryStore::new();
//! let target = MemoryStore::new();
//!
//! // 1. Dump one library
//! let snapshot = shelfkeep_engine::dump::build_dump(
//!     Repositories::from_store(&source),
//!     &SourceCatalog::new(),
//!     BackupOptions::default(),
//!     1706745600000,
//! )
//! .await?;
//!
//! // 2. Move it around as bytes
//! let bytes = codec::encode(&snapshot)?;
//! let decoded = codec::decode(&bytes)?;
//!
//! // 3. Merge it into another
//! let report = Restorer::new(Repositories::from_store(&target))
//!     .restore_snapshot(&decoded)
//!     .await?;
//! assert_eq!(report.items_inserted, 0);
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod codec;
pub mod dump;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod repository;
pub mod snapshot;
pub mod store;

// Re-export main types at crate root
pub use backup::{
    backup_file_name, prune_backups, BackupConfig, BackupInfo, BackupManager,
};
pub use codec::Compression;
pub use dump::{BackupOptions, SourceCatalog};
pub use error::{EntityKind, Error, RepositoryError, Result};
pub use reconcile::{CategoryMapping, ItemOutcome, RestoreReport, Restorer};
pub use record::{
    Category, ItemCategory, ItemUpdate, LibraryItem, NewCategory, NewItem, NewTrack, NewUnit,
    TrackRecord, TrackUpdate, Unit, UnitUpdate,
};
pub use repository::{
    CategoryRepository, ItemCategoryRepository, ItemRepository, Repositories, TrackRepository,
    UnitRepository,
};
pub use snapshot::{
    BackupCategory, BackupItem, BackupSource, BackupTrack, BackupUnit, Snapshot,
    SnapshotMetadata, SNAPSHOT_FORMAT_VERSION,
};
pub use store::{LibraryState, MemoryStore};

/// Type aliases for clarity
pub type ItemId = i64;
pub type UnitId = i64;
pub type CategoryId = i64;
pub type TrackId = i64;
pub type Timestamp = i64;
