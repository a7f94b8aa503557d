//! Integration tests for reading file content

mod common;

use std::sync::Arc;

use ::common::prelude::*;

#[tokio::test]
async fn test_read_fetches_content_once() {
    let fx = common::setup();

    let first = fx.fs.read_file("/Game/scripts/player.js").await.unwrap();
    let second = fx.fs.read_file("/Game/scripts/player.js").await.unwrap();

    assert_eq!(first, common::PLAYER_SRC);
    assert_eq!(second, common::PLAYER_SRC);
    assert_eq!(fx.service.calls("get_file_content"), 1);
}

#[tokio::test]
async fn test_read_directories_are_empty() {
    let fx = common::setup();

    assert!(fx.fs.read_file("/Game").await.unwrap().is_empty());
    assert!(fx.fs.read_file("/Game/scripts").await.unwrap().is_empty());
    assert_eq!(fx.service.calls("get_file_content"), 0);
}

#[tokio::test]
async fn test_read_missing_file() {
    let fx = common::setup();

    let result = fx.fs.read_file("/Game/scripts/enemy.js").await;
    assert!(matches!(result, Err(FsError::NotFound(_))));
}

#[tokio::test]
async fn test_read_ignored_path() {
    let fx = common::setup();

    let result = fx.fs.read_file("/Game/.vscode/settings.json").await;
    assert!(matches!(result, Err(FsError::NotFound(_))));
    assert_eq!(fx.service.calls("list_projects"), 0);
}

#[tokio::test]
async fn test_read_refetches_after_pull() {
    let fx = common::setup();
    fx.fs.read_file("/Game/scripts/player.js").await.unwrap();

    fx.service
        .edit_remotely(common::PLAYER_ID, None, b"// rewritten\n");
    // still served from the cache
    let cached = fx.fs.read_file("/Game/scripts/player.js").await.unwrap();
    assert_eq!(cached, common::PLAYER_SRC);

    fx.fs.pull_latest("/Game").await.unwrap();
    let fresh = fx.fs.read_file("/Game/scripts/player.js").await.unwrap();
    assert_eq!(fresh, "// rewritten\n");
    assert_eq!(fx.service.calls("get_file_content"), 2);
}

#[tokio::test]
async fn test_read_prepends_script_preamble() {
    let config = FsConfig {
        script_preamble: Some("// @ts-nocheck\n".to_string()),
        ..FsConfig::default()
    };
    let fx = common::setup_with(config, Arc::new(AutoConfirm(true)));
    fx.service
        .add_file(fx.game, None, "notes.txt", None, "text", b"plain");

    let script = fx.fs.read_file("/Game/scripts/player.js").await.unwrap();
    assert!(script.starts_with(b"// @ts-nocheck\nexport class Player"));

    let text = fx.fs.read_file("/Game/notes.txt").await.unwrap();
    assert_eq!(text, "plain");
}

#[tokio::test]
async fn test_read_unauthorized_propagates() {
    let fx = common::setup();
    fx.service.set_unauthorized(true);

    let result = fx.fs.read_file("/Game/scripts/player.js").await;
    assert!(matches!(result, Err(FsError::Unauthorized(_))));
}
