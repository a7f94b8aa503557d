//! Shared fixtures for filesystem integration tests
#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use common::prelude::*;
use common::remote::{AssetId, AssetRecord, FileInfo, ProjectId, RemoteTimestamp, FOLDER_TYPE};
use common::sync::content_hash;

pub const USER_ID: u64 = 7;
pub const SCRIPTS_ID: AssetId = 1;
pub const PLAYER_ID: AssetId = 2;
pub const PLAYER_SRC: &[u8] = b"export class Player {\n  update(dt) {\n    this.x += dt;\n  }\n}\n";

/// The "Game" project: a `scripts` folder holding `player.js`
pub struct Fixture {
    pub service: MemoryAssetService,
    pub fs: AssetFs<MemoryAssetService>,
    pub game: ProjectId,
    pub workspace: Arc<MemoryWorkspace>,
}

pub fn record(
    id: AssetId,
    name: &str,
    kind: &str,
    parent: Option<AssetId>,
    content: &[u8],
) -> AssetRecord {
    AssetRecord {
        id,
        name: name.to_string(),
        kind: kind.to_string(),
        parent,
        created_at: RemoteTimestamp::new("2023-12-31T00:00:00.000Z"),
        modified_at: RemoteTimestamp::new("2023-12-31T00:00:00.000Z"),
        file: (kind != FOLDER_TYPE).then(|| FileInfo {
            hash: content_hash(content),
            filename: name.to_string(),
            size: content.len() as u64,
            url: None,
        }),
    }
}

pub fn game_service() -> (MemoryAssetService, ProjectId) {
    let service = MemoryAssetService::new(USER_ID);
    let game = service.add_project("Game");
    service.insert_record(game, None, record(SCRIPTS_ID, "scripts", FOLDER_TYPE, None, b""), b"");
    service.insert_record(
        game,
        None,
        record(PLAYER_ID, "player.js", "script", Some(SCRIPTS_ID), PLAYER_SRC),
        PLAYER_SRC,
    );
    (service, game)
}

pub fn setup() -> Fixture {
    setup_with(FsConfig::default(), Arc::new(AutoConfirm(true)))
}

pub fn setup_with(config: FsConfig, prompt: Arc<dyn ConfirmationPrompt>) -> Fixture {
    init_tracing();
    let (service, game) = game_service();
    let workspace = Arc::new(MemoryWorkspace::new());
    let fs = AssetFs::builder(service.clone())
        .workspace(workspace.clone())
        .prompt(prompt)
        .config(config)
        .build();
    Fixture {
        service,
        fs,
        game,
        workspace,
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records every question and answers with a fixed reply
#[derive(Debug, Default)]
pub struct RecordingPrompt {
    pub answer: bool,
    pub asked: parking_lot::Mutex<Vec<String>>,
}

impl RecordingPrompt {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: Default::default(),
        })
    }

    pub fn questions(&self) -> Vec<String> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl ConfirmationPrompt for RecordingPrompt {
    async fn confirm(&self, message: &str) -> bool {
        self.asked.lock().push(message.to_string());
        self.answer
    }
}
