mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{context_with, context_with_store, ScriptedRemote, DATASET};
use mysic::service::{Track, FAVORITES_PLAYLIST_ID, LOCAL_PLAYLIST_PREFIX};
use mysic::storage::{KvStore, MemoryStore, RedbStore, PLAYLISTS_KEY};
use mysic::ErrorKind;

fn track(id: &str, title: &str) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        artist: "Satu".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn adding_the_same_track_twice_lists_it_once() {
    let context = context_with(Arc::new(ScriptedRemote::unreachable()), DATASET);
    let store = &context.playlists;

    let playlist = store.create_playlist("Sore", "").await.unwrap();
    store.add_track(&playlist.id, &track("1", "A")).await.unwrap();
    store.add_track(&playlist.id, &track("1", "A")).await.unwrap();

    let listed = store.list_playlists().await;
    let found = listed.data.iter().find(|p| p.id == playlist.id).unwrap();
    assert_eq!(found.track_ids, vec!["1"]);
}

#[tokio::test]
async fn anonymous_mutations_stay_local() {
    let remote = Arc::new(ScriptedRemote::unreachable());
    let context = context_with(remote.clone(), DATASET);

    let playlist = context.playlists.create_playlist("Pagi", "").await.unwrap();
    context
        .playlists
        .add_track(&playlist.id, &track("2", "B"))
        .await
        .unwrap();
    context
        .playlists
        .add_track("1", &track("3", "C"))
        .await
        .unwrap();

    assert!(playlist.id.starts_with(LOCAL_PLAYLIST_PREFIX));
    assert_eq!(remote.mutation_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_name_is_a_validation_error() {
    let context = context_with(Arc::new(ScriptedRemote::unreachable()), DATASET);
    let err = context.playlists.create_playlist("", "desc").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn local_additions_merge_into_dataset_playlist() {
    let context = context_with(Arc::new(ScriptedRemote::unreachable()), DATASET);
    let store = &context.playlists;

    store.add_track("1", &track("3", "C")).await.unwrap();
    store.add_track("1", &track("1", "A")).await.unwrap();

    let listed = store.list_playlists().await;
    let santai = listed.data.iter().find(|p| p.id == "1").unwrap();
    assert_eq!(santai.track_ids, vec!["2", "3", "1"]);
}

#[tokio::test]
async fn playlists_and_favorites_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.redb");

    let id = {
        let backing: Arc<dyn KvStore> = Arc::new(RedbStore::open(&path).unwrap());
        let context = context_with_store(Arc::new(ScriptedRemote::unreachable()), DATASET, backing);
        let playlist = context.playlists.create_playlist("Malam", "tenang").await.unwrap();
        context
            .playlists
            .add_track(&playlist.id, &track("2", "B"))
            .await
            .unwrap();
        context
            .playlists
            .add_track(FAVORITES_PLAYLIST_ID, &track("1", "A"))
            .await
            .unwrap();
        playlist.id
    };

    let backing: Arc<dyn KvStore> = Arc::new(RedbStore::open(&path).unwrap());
    let context = context_with_store(Arc::new(ScriptedRemote::unreachable()), DATASET, backing);

    let found = context.playlists.get_tracks(&id).await;
    assert!(found.success);
    assert_eq!(found.data.playlist.name, "Malam");
    assert_eq!(found.data.tracks[0].title, "B");

    let favorites = context.playlists.get_tracks(FAVORITES_PLAYLIST_ID).await;
    assert_eq!(favorites.data.playlist.track_ids, vec!["1"]);
}

#[tokio::test]
async fn favorites_restore_without_general_namespace() {
    let backing = Arc::new(MemoryStore::new());
    let context = context_with_store(
        Arc::new(ScriptedRemote::unreachable()),
        DATASET,
        backing.clone(),
    );
    context
        .playlists
        .add_track(FAVORITES_PLAYLIST_ID, &track("2", "B"))
        .await
        .unwrap();

    backing.remove(PLAYLISTS_KEY).await.unwrap();

    let listed = context.playlists.list_playlists().await;
    assert_eq!(listed.data[0].id, FAVORITES_PLAYLIST_ID);
    assert_eq!(listed.data[0].track_ids, vec!["2"]);
}

#[tokio::test]
async fn read_only_storage_reports_persistence_failure() {
    let context = context_with_store(
        Arc::new(ScriptedRemote::unreachable()),
        DATASET,
        Arc::new(MemoryStore::read_only()),
    );

    let err = context.playlists.create_playlist("X", "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);

    let err = context.playlists.record_play("1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Persistence);

    // Reads still answer
    let listed = context.playlists.list_playlists().await;
    assert!(listed.success);
}

#[tokio::test]
async fn plays_are_listed_newest_first() {
    let context = context_with(Arc::new(ScriptedRemote::unreachable()), DATASET);

    context.playlists.record_play("1").await.unwrap();
    context.playlists.record_play("2").await.unwrap();
    context.playlists.record_play("2").await.unwrap();

    let recent = context.playlists.recent_plays(10).await;
    let ids: Vec<&str> = recent.iter().map(|e| e.track_id.as_str()).collect();
    assert_eq!(ids, vec!["2", "1"]);
}
