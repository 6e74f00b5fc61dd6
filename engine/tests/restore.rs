//! End-to-end restore behavior against the in-memory store.

use shelfkeep_engine::{
    codec, BackupCategory, BackupConfig, BackupItem, BackupManager, BackupOptions, BackupTrack,
    BackupUnit, EntityKind, Error, LibraryState, MemoryStore, NewCategory, NewItem, NewTrack,
    NewUnit, Repositories, Restorer, Snapshot, SourceCatalog,
};

fn live_item(key: &str, last_update: i64, last_init: i64, favorite: bool) -> NewItem {
    NewItem {
        external_key: key.into(),
        source_id: 1,
        title: "Live".into(),
        author: Some("Live author".into()),
        artist: None,
        description: Some("Live description".into()),
        tags: vec!["live".into()],
        status: 1,
        cover_url: None,
        custom_cover: false,
        favorite,
        viewer_mode: 0,
        flags: 0,
        date_added: 1,
        last_update,
        last_init,
    }
}

fn live_unit(item_id: i64, key: &str, read: bool, progress: i64) -> NewUnit {
    NewUnit {
        item_id,
        unit_key: key.into(),
        name: key.into(),
        scanlator: None,
        read,
        bookmark: false,
        progress,
        number: 1.0,
        source_order: 0,
        date_fetch: 0,
        date_upload: 0,
    }
}

fn snapshot_item(key: &str, last_update: i64, last_init: i64) -> BackupItem {
    BackupItem {
        external_key: key.into(),
        source_id: 1,
        title: "Snapshot".into(),
        author: Some("Snapshot author".into()),
        tags: vec!["snap".into()],
        favorite: true,
        last_update,
        last_init,
        ..Default::default()
    }
}

fn unit(key: &str, read: bool, progress: i64) -> BackupUnit {
    BackupUnit {
        unit_key: key.into(),
        name: key.into(),
        read,
        progress,
        ..Default::default()
    }
}

fn rich_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::new(1_706_745_600_000);
    snapshot.categories = vec![
        BackupCategory {
            name: "Action".into(),
            order: 1,
            flags: 0,
        },
        BackupCategory {
            name: "Drama".into(),
            order: 2,
            flags: 0,
        },
    ];

    let mut first = snapshot_item("/one", 200, 40);
    first.units = vec![unit("c1", true, 3), unit("c2", false, 0)];
    first.categories = vec![1, 2];
    first.tracks = vec![BackupTrack {
        site_id: 1,
        last_read: 1.0,
        total_chapters: 2,
        ..Default::default()
    }];

    let mut second = snapshot_item("/two", 300, 10);
    second.units = vec![unit("x1", false, 7)];
    second.categories = vec![2];

    snapshot.items = vec![first, second];
    snapshot
}

async fn restore(store: &MemoryStore, snapshot: &Snapshot) -> shelfkeep_engine::Result<()> {
    Restorer::new(Repositories::from_store(store))
        .restore_snapshot(snapshot)
        .await
        .map(|_| ())
}

#[tokio::test]
async fn restore_into_empty_store() {
    let store = MemoryStore::new();
    restore(&store, &rich_snapshot()).await.unwrap();

    let state = store.state().await;
    assert_eq!(state.items().count(), 2);
    assert_eq!(state.unit_count(), 3);
    assert_eq!(state.categories().count(), 2);
    assert_eq!(state.membership_count(), 3);
    assert_eq!(state.track_count(), 1);

    let one = state.item_by_key("/one", 1).unwrap();
    assert!(one.favorite);
    assert_eq!(one.last_update, 200);
}

#[tokio::test]
async fn restoring_twice_equals_restoring_once() {
    let mut state = LibraryState::new();
    let id = state.add_item(live_item("/one", 100, 50, true)).unwrap();
    state.add_unit(live_unit(id, "c1", false, 5)).unwrap();
    let store = MemoryStore::with_state(state);
    let snapshot = rich_snapshot();

    restore(&store, &snapshot).await.unwrap();
    let once = store.state().await;

    restore(&store, &snapshot).await.unwrap();
    let twice = store.state().await;

    assert_eq!(once, twice);
}

#[tokio::test]
async fn category_names_dedup_ignoring_case() {
    let mut state = LibraryState::new();
    let existing = state
        .add_category(
            NewCategory {
                name: "action".into(),
                order: 0,
                flags: 0,
            },
            false,
        )
        .unwrap();
    let store = MemoryStore::with_state(state);

    let mut snapshot = Snapshot::new(0);
    snapshot.categories = vec![BackupCategory {
        name: "Action".into(),
        order: 5,
        flags: 0,
    }];
    let mut item = snapshot_item("/one", 1, 1);
    item.categories = vec![5];
    snapshot.items = vec![item];

    restore(&store, &snapshot).await.unwrap();

    let state = store.state().await;
    assert_eq!(state.categories().count(), 1);
    let id = state.item_by_key("/one", 1).unwrap().id;
    let memberships: Vec<_> = state.categories_of(id).iter().map(|c| c.id).collect();
    assert_eq!(memberships, vec![existing]);
}

#[tokio::test]
async fn newer_snapshot_units_replace_live_rows() {
    let mut state = LibraryState::new();
    let id = state.add_item(live_item("/one", 100, 50, true)).unwrap();
    let old_unit = state.add_unit(live_unit(id, "c1", false, 5)).unwrap();
    let store = MemoryStore::with_state(state);

    let mut snapshot = Snapshot::new(0);
    let mut item = snapshot_item("/one", 200, 50);
    item.units = vec![unit("c1", true, 3)];
    snapshot.items = vec![item];

    restore(&store, &snapshot).await.unwrap();

    let state = store.state().await;
    let units = state.units_of(id);
    assert_eq!(units.len(), 1);
    assert!(units[0].read);
    assert_eq!(units[0].progress, 5);
    assert_ne!(units[0].id, old_unit);
}

#[tokio::test]
async fn older_snapshot_units_update_in_place() {
    let mut state = LibraryState::new();
    let id = state.add_item(live_item("/one", 200, 50, true)).unwrap();
    let old_unit = state.add_unit(live_unit(id, "c1", false, 5)).unwrap();
    let store = MemoryStore::with_state(state);

    let mut snapshot = Snapshot::new(0);
    let mut item = snapshot_item("/one", 100, 50);
    item.units = vec![unit("c1", true, 3), unit("c2", true, 1)];
    snapshot.items = vec![item];

    let report = Restorer::new(Repositories::from_store(&store))
        .restore_snapshot(&snapshot)
        .await
        .unwrap();

    let state = store.state().await;
    let units = state.units_of(id);
    assert_eq!(units.len(), 1);
    assert_eq!(units[0].id, old_unit);
    assert!(units[0].read);
    assert_eq!(units[0].progress, 5);
    assert_eq!(report.units_inserted, 0);
    assert_eq!(report.units_deleted, 0);
    assert_eq!(report.units_updated, 1);
}

#[tokio::test]
async fn fresher_live_metadata_is_preserved() {
    let mut state = LibraryState::new();
    let id = state.add_item(live_item("/one", 100, 50, true)).unwrap();
    let store = MemoryStore::with_state(state);
    let before = store.state().await.item(id).cloned().unwrap();

    let mut snapshot = Snapshot::new(0);
    snapshot.items = vec![snapshot_item("/one", 100, 40)];
    restore(&store, &snapshot).await.unwrap();

    assert_eq!(store.state().await.item(id), Some(&before));
}

#[tokio::test]
async fn removed_item_is_resurrected() {
    let mut state = LibraryState::new();
    let id = state.add_item(live_item("/one", 100, 999, false)).unwrap();
    let store = MemoryStore::with_state(state);

    let mut snapshot = Snapshot::new(0);
    snapshot.items = vec![snapshot_item("/one", 100, 1)];
    restore(&store, &snapshot).await.unwrap();

    let state = store.state().await;
    let item = state.item(id).unwrap();
    assert!(item.favorite);
    assert_eq!(item.title, "Snapshot");
    assert_eq!(item.author.as_deref(), Some("Snapshot author"));
    assert_eq!(item.tags, vec!["snap".to_string()]);
}

#[tokio::test]
async fn tracks_merge_field_by_field() {
    let mut state = LibraryState::new();
    let id = state.add_item(live_item("/one", 100, 50, true)).unwrap();
    state
        .add_track(NewTrack {
            item_id: id,
            site_id: 3,
            remote_id: 1,
            title: "Tracked".into(),
            last_read: 10.0,
            total_chapters: 20,
            score: 0.0,
            status: 0,
            tracking_url: String::new(),
        })
        .unwrap();
    let store = MemoryStore::with_state(state);

    let mut snapshot = Snapshot::new(0);
    let mut item = snapshot_item("/one", 100, 50);
    item.tracks = vec![BackupTrack {
        site_id: 3,
        last_read: 15.0,
        total_chapters: 18,
        ..Default::default()
    }];
    snapshot.items = vec![item];
    restore(&store, &snapshot).await.unwrap();

    let state = store.state().await;
    let tracks = state.tracks_of(id);
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].last_read, 15.0);
    assert_eq!(tracks[0].total_chapters, 20);
}

#[tokio::test]
async fn repository_failure_stops_later_items() {
    let store = MemoryStore::new();
    store.fail_on(EntityKind::Track);

    let err = restore(&store, &rich_snapshot()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Repository {
            entity: EntityKind::Track,
            ..
        }
    ));

    // The first item was committed up to its tracks; the second never started
    let state = store.state().await;
    assert!(state.item_by_key("/one", 1).is_some());
    assert!(state.item_by_key("/two", 1).is_none());
    assert_eq!(state.categories().count(), 2);
}

#[tokio::test]
async fn category_failure_stops_before_items() {
    let store = MemoryStore::new();
    store.fail_on(EntityKind::Category);

    let err = restore(&store, &rich_snapshot()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Repository {
            entity: EntityKind::Category,
            ..
        }
    ));
    assert_eq!(store.state().await.items().count(), 0);
}

#[tokio::test]
async fn backup_file_roundtrip_between_stores() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("library.skb.gz");

    let source = MemoryStore::new();
    restore(&source, &rich_snapshot()).await.unwrap();

    let manager = BackupManager::new(Repositories::from_store(&source), BackupConfig::default());
    let info = manager
        .create_backup(&path, &SourceCatalog::new().with_source(1, "One"))
        .await
        .unwrap();
    assert_eq!(info.item_count, 2);
    assert!(info.size > 0);

    let target = MemoryStore::new();
    let manager = BackupManager::new(Repositories::from_store(&target), BackupConfig::default());
    let report = manager.restore_backup(&path).await.unwrap();
    assert_eq!(report.items_inserted, 2);

    let restored = target.state().await;
    assert_eq!(restored.unit_count(), 3);
    assert_eq!(restored.membership_count(), 3);
    assert_eq!(restored.track_count(), 1);
}

#[tokio::test]
async fn dump_respects_backup_options() {
    let source = MemoryStore::new();
    restore(&source, &rich_snapshot()).await.unwrap();

    let config = BackupConfig {
        options: BackupOptions {
            units: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let manager = BackupManager::new(Repositories::from_store(&source), config);
    let snapshot = manager.build_dump(&SourceCatalog::new()).await.unwrap();

    assert_eq!(snapshot.item_count(), 2);
    assert_eq!(snapshot.unit_count(), 0);
    assert_eq!(snapshot.categories.len(), 2);
}

#[tokio::test]
async fn corrupt_file_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.skb.gz");
    let mut bytes = codec::encode(&rich_snapshot()).unwrap();
    bytes.truncate(bytes.len() / 2);
    tokio::fs::write(&path, &bytes).await.unwrap();

    let store = MemoryStore::new();
    let manager = BackupManager::new(Repositories::from_store(&store), BackupConfig::default());
    let err = manager.restore_backup(&path).await.unwrap_err();

    assert!(matches!(err, Error::CorruptBackup(_)));
    assert_eq!(store.state().await, LibraryState::new());
}

#[tokio::test]
async fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let manager = BackupManager::new(Repositories::from_store(&store), BackupConfig::default());

    let err = manager
        .restore_backup(&dir.path().join("absent.skb.gz"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
