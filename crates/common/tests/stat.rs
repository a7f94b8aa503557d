//! Integration tests for stat

mod common;

use ::common::prelude::*;

#[tokio::test]
async fn test_stat_project_root_is_directory() {
    let fx = common::setup();
    let empty = fx.service.add_project("Empty");

    for path in ["/Game", "/Empty", "/Game:feature", "/Game/"] {
        let stat = fx.fs.stat(path).await.unwrap();
        assert_eq!(stat.file_type, FileType::Directory, "{path}");
        assert_eq!(stat.size, 0);
    }
    assert!(fx.fs.cache().get_by_id(empty).is_some());
}

#[tokio::test]
async fn test_stat_project_root_uses_project_timestamps() {
    let fx = common::setup();

    let stat = fx.fs.stat("/Game").await.unwrap();
    let project = fx.fs.cache().get_by_name("Game").unwrap();
    assert_eq!(stat.created, project.record().created.as_millis());
    assert!(stat.modified > 0);
    // the root never needs the asset listing
    assert_eq!(fx.service.calls("list_assets"), 0);
}

#[tokio::test]
async fn test_stat_file_and_folder() {
    let fx = common::setup();

    let folder = fx.fs.stat("/Game/scripts").await.unwrap();
    assert_eq!(folder.file_type, FileType::Directory);
    assert_eq!(folder.size, 0);

    let file = fx.fs.stat("/Game/scripts/player.js").await.unwrap();
    assert_eq!(file.file_type, FileType::File);
    assert_eq!(file.size, common::PLAYER_SRC.len() as u64);
}

#[tokio::test]
async fn test_stat_cold_cache_syncs_account_once() {
    let fx = common::setup();

    fx.fs.stat("/Game").await.unwrap();
    fx.fs.stat("/Game/scripts").await.unwrap();
    fx.fs.stat("/Game/scripts/player.js").await.unwrap();

    assert_eq!(fx.service.calls("fetch_user_id"), 1);
    assert_eq!(fx.service.calls("list_projects"), 1);
}

#[tokio::test]
async fn test_stat_missing_is_not_found() {
    let fx = common::setup();

    for path in ["/Nope", "/Game/nope.js", "/Game/missing/player.js"] {
        let result = fx.fs.stat(path).await;
        assert!(
            matches!(result, Err(FsError::NotFound(_))),
            "{path}: {result:?}"
        );
    }
}

#[tokio::test]
async fn test_stat_ignored_segments_never_reach_remote() {
    let fx = common::setup();

    for path in ["/Game/.vscode", "/Game/.git/HEAD", "/Game/node_modules/x/index.js"] {
        let result = fx.fs.stat(path).await;
        assert!(matches!(result, Err(FsError::NotFound(_))), "{path}");
    }
    assert_eq!(fx.service.calls("fetch_user_id"), 0);
    assert_eq!(fx.service.calls("list_assets"), 0);
}

#[tokio::test]
async fn test_stat_invalid_path() {
    let fx = common::setup();

    let result = fx.fs.stat("Game/scripts").await;
    assert!(matches!(result, Err(FsError::InvalidPath(_))));
}
