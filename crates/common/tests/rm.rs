//! Integration tests for delete operations

mod common;

use ::common::prelude::*;

#[tokio::test]
async fn test_rm_file() {
    let fx = common::setup();

    fx.fs.delete("/Game/scripts/player.js").await.unwrap();

    let result = fx.fs.stat("/Game/scripts/player.js").await;
    assert!(matches!(result, Err(FsError::NotFound(_))));
    assert!(fx.service.record(common::PLAYER_ID, None).is_none());
}

#[tokio::test]
async fn test_rm_empty_folder_does_not_ask() {
    let prompt = common::RecordingPrompt::answering(false);
    let fx = common::setup_with(FsConfig::default(), prompt.clone());
    fx.fs.create_directory("/Game/empty").await.unwrap();

    fx.fs.delete("/Game/empty").await.unwrap();

    assert!(prompt.questions().is_empty());
    assert_eq!(fx.fs.read_directory("/Game").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rm_non_empty_folder_confirmed() {
    let prompt = common::RecordingPrompt::answering(true);
    let fx = common::setup_with(FsConfig::default(), prompt.clone());

    fx.fs.delete("/Game/scripts").await.unwrap();

    assert_eq!(prompt.questions().len(), 1);
    assert!(prompt.questions()[0].contains("/Game/scripts"));
    assert!(fx.fs.read_directory("/Game").await.unwrap().is_empty());
    assert!(fx.service.records(fx.game, None).is_empty());
}

#[tokio::test]
async fn test_rm_non_empty_folder_declined() {
    let prompt = common::RecordingPrompt::answering(false);
    let fx = common::setup_with(FsConfig::default(), prompt.clone());

    let result = fx.fs.delete("/Game/scripts").await;

    assert!(matches!(result, Err(FsError::Cancelled(_))));
    assert_eq!(fx.service.calls("delete_asset"), 0);
    assert_eq!(fx.service.records(fx.game, None).len(), 2);
    assert!(fx.fs.stat("/Game/scripts/player.js").await.is_ok());
}

#[tokio::test]
async fn test_rm_missing() {
    let fx = common::setup();

    let result = fx.fs.delete("/Game/scripts/nope.js").await;
    assert!(matches!(result, Err(FsError::NotFound(_))));
}

#[tokio::test]
async fn test_rm_project_root_is_rejected() {
    let fx = common::setup();

    let result = fx.fs.delete("/Game").await;
    assert!(matches!(result, Err(FsError::InvalidOperation(_))));
}
