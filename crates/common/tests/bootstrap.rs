//! Integration tests for the session bootstrap: one account sync shared
//! by every concurrent caller, and preloading of open projects

mod common;

use std::sync::Arc;

use ::common::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_sync() {
    let fx = common::setup();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let fs = fx.fs.clone();
        tasks.push(tokio::spawn(async move {
            match i % 3 {
                0 => fs.stat("/Game").await.map(|_| ()),
                1 => fs.read_directory("/Game/scripts").await.map(|_| ()),
                _ => fs.read_file("/Game/scripts/player.js").await.map(|_| ()),
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(fx.service.calls("fetch_user_id"), 1);
    assert_eq!(fx.service.calls("list_projects"), 1);
    assert_eq!(fx.service.asset_listings(fx.game, None), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_listings_of_one_project_are_coalesced() {
    let fx = common::setup();
    fx.fs.projects().await.unwrap();

    let listings = (0..8).map(|_| {
        let fs = fx.fs.clone();
        tokio::spawn(async move { fs.read_directory("/Game").await })
    });
    for result in futures::future::join_all(listings).await {
        assert_eq!(result.unwrap().unwrap().len(), 1);
    }

    assert_eq!(fx.service.calls("list_assets"), 1);
}

#[tokio::test]
async fn test_failed_sync_is_retried() {
    let fx = common::setup();
    fx.service.set_unauthorized(true);

    let result = fx.fs.stat("/Game").await;
    assert!(matches!(result, Err(FsError::Unauthorized(_))));

    fx.service.set_unauthorized(false);
    assert!(fx.fs.stat("/Game").await.is_ok());
    assert_eq!(fx.service.calls("fetch_user_id"), 2);
}

#[tokio::test]
async fn test_bootstrap_preloads_open_projects() {
    let fx = common::setup();
    fx.workspace.open("Game");

    fx.fs.projects().await.unwrap();

    let game = fx.fs.cache().get_by_name("Game").unwrap();
    assert!(game.has_tree());
    assert_eq!(fx.service.asset_listings(fx.game, None), 1);

    fx.fs.read_directory("/Game/scripts").await.unwrap();
    assert_eq!(fx.service.calls("list_assets"), 1);
}

#[tokio::test]
async fn test_bootstrap_restores_stored_branch() {
    let (service, game) = common::game_service();
    let feature = service.add_branch(game, "feature");
    service.add_file(game, Some(&feature), "feature.js", None, "script", b"");

    let workspace = Arc::new(MemoryWorkspace::with_open_projects(["Game"]));
    workspace.set_branch("Game", "feature").unwrap();
    let fs = AssetFs::builder(service.clone())
        .workspace(workspace)
        .build();

    let entries = fs.read_directory("/Game").await.unwrap();

    assert_eq!(entries, vec![("feature.js".to_string(), FileType::File)]);
    assert_eq!(fs.branch_name("Game").await.unwrap(), "feature");
    assert_eq!(service.asset_listings(game, Some(&feature)), 1);
    assert_eq!(service.asset_listings(game, None), 0);
}

#[tokio::test]
async fn test_bootstrap_skips_unknown_open_projects() {
    let fx = common::setup();
    fx.workspace.open("Deleted");
    fx.workspace.open("Game");

    let projects = fx.fs.projects().await.unwrap();
    assert_eq!(projects.len(), 1);
    assert!(fx.fs.cache().get_by_name("Game").unwrap().has_tree());
}

#[tokio::test]
async fn test_shared_cache_is_seen_by_both_filesystems() {
    let (service, game) = common::game_service();
    let cache = Arc::new(ProjectCache::new());
    let first = AssetFs::builder(service.clone()).cache(cache.clone()).build();
    let second = AssetFs::builder(service.clone()).cache(cache.clone()).build();

    first.read_directory("/Game").await.unwrap();
    second.read_directory("/Game/scripts").await.unwrap();

    assert_eq!(service.calls("list_projects"), 1);
    assert_eq!(service.asset_listings(game, None), 1);
}
