//! Integration tests for stale-write detection
//!
//! Every write re-reads the remote metadata and compares three hashes:
//! what we cached, what the remote holds now, and what we are writing.

mod common;

use ::common::prelude::*;
use ::common::sync::content_hash;
use bytes::Bytes;

const PLAYER: &str = "/Game/scripts/player.js";

// =============================================================================
// SCENARIO: Someone else edited the file since we cached it
// =============================================================================

/// Cached H0, remote H1, writing H2: the write must be rejected and the
/// cached node must stay exactly as it was.
#[tokio::test]
async fn scenario_remote_edit_then_local_write_conflicts() {
    let fx = common::setup();
    let before = fx.fs.stat(PLAYER).await.unwrap();
    fx.service
        .edit_remotely(common::PLAYER_ID, None, b"// their edit\n");

    let result = fx
        .fs
        .write_file(PLAYER, Bytes::from_static(b"// my edit\n"), false)
        .await;

    let err = result.unwrap_err();
    assert!(err.is_conflict(), "{err:?}");
    assert_eq!(fx.service.calls("upload_file"), 0);
    assert_eq!(
        fx.service.content(common::PLAYER_ID, None).unwrap(),
        b"// their edit\n"
    );
    assert_eq!(fx.fs.stat(PLAYER).await.unwrap(), before);
}

/// After a conflict the caller pulls and retries, which then succeeds.
#[tokio::test]
async fn scenario_conflict_recovers_after_pull() {
    let fx = common::setup();
    fx.fs.read_file(PLAYER).await.unwrap();
    fx.service
        .edit_remotely(common::PLAYER_ID, None, b"// their edit\n");

    let data = Bytes::from_static(b"// my edit\n");
    let err = fx.fs.write_file(PLAYER, data.clone(), false).await.unwrap_err();
    assert!(err.is_conflict());

    fx.fs.pull_latest(PLAYER).await.unwrap();
    assert_eq!(fx.fs.read_file(PLAYER).await.unwrap(), "// their edit\n");
    fx.fs.write_file(PLAYER, data.clone(), false).await.unwrap();
    assert_eq!(
        fx.service.content(common::PLAYER_ID, None).unwrap(),
        data.to_vec()
    );
}

// =============================================================================
// SCENARIO: The remote already holds what we are writing
// =============================================================================

/// Cached H0, remote H1, writing H1: tolerated.
#[tokio::test]
async fn scenario_writing_remote_content_is_tolerated() {
    let fx = common::setup();
    fx.fs.stat(PLAYER).await.unwrap();
    fx.service
        .edit_remotely(common::PLAYER_ID, None, b"// same on both sides\n");

    fx.fs
        .write_file(PLAYER, Bytes::from_static(b"// same on both sides\n"), false)
        .await
        .unwrap();

    let remote = fx.service.record(common::PLAYER_ID, None).unwrap();
    assert_eq!(
        remote.file.unwrap().hash,
        content_hash(b"// same on both sides\n")
    );
    assert_eq!(fx.service.calls("upload_file"), 1);
}

// =============================================================================
// SCENARIO: Only the metadata moved
// =============================================================================

/// The remote was touched (new modification time, same bytes). The write
/// carries the fresh modification time and goes through.
#[tokio::test]
async fn scenario_metadata_drift_is_transparent() {
    let fx = common::setup();
    fx.fs.stat(PLAYER).await.unwrap();
    fx.service.touch_remotely(common::PLAYER_ID, None);

    fx.fs
        .write_file(PLAYER, Bytes::from_static(b"// update\n"), false)
        .await
        .unwrap();

    assert_eq!(
        fx.service.content(common::PLAYER_ID, None).unwrap(),
        b"// update\n"
    );
    let remote = fx.service.record(common::PLAYER_ID, None).unwrap();
    let stat = fx.fs.stat(PLAYER).await.unwrap();
    assert_eq!(stat.modified, remote.modified_at.as_millis());
}

// =============================================================================
// SCENARIO: The remote moves between our check and our upload
// =============================================================================

/// A service whose asset changes right after `get_asset` answers; the
/// upload precondition then fails remotely and surfaces as a conflict.
#[derive(Debug, Clone)]
struct RacingService {
    inner: MemoryAssetService,
}

#[async_trait::async_trait]
impl RemoteAssetService for RacingService {
    async fn fetch_user_id(&self) -> Result<u64, RemoteError> {
        self.inner.fetch_user_id().await
    }

    async fn list_projects(
        &self,
        user_id: u64,
    ) -> Result<Vec<::common::remote::ProjectRecord>, RemoteError> {
        self.inner.list_projects(user_id).await
    }

    async fn list_branches(
        &self,
        project_id: u64,
    ) -> Result<Vec<::common::remote::Branch>, RemoteError> {
        self.inner.list_branches(project_id).await
    }

    async fn list_assets(
        &self,
        project_id: u64,
        branch_id: Option<&str>,
    ) -> Result<Vec<::common::remote::AssetRecord>, RemoteError> {
        self.inner.list_assets(project_id, branch_id).await
    }

    async fn get_asset(
        &self,
        asset_id: u64,
        branch_id: Option<&str>,
    ) -> Result<::common::remote::AssetRecord, RemoteError> {
        let record = self.inner.get_asset(asset_id, branch_id).await?;
        self.inner.touch_remotely(asset_id, branch_id);
        Ok(record)
    }

    async fn get_file_content(
        &self,
        asset_id: u64,
        filename: &str,
        branch_id: Option<&str>,
    ) -> Result<Bytes, RemoteError> {
        self.inner
            .get_file_content(asset_id, filename, branch_id)
            .await
    }

    async fn create_asset(
        &self,
        project_id: u64,
        name: &str,
        options: ::common::remote::CreateOptions,
    ) -> Result<::common::remote::AssetRecord, RemoteError> {
        self.inner.create_asset(project_id, name, options).await
    }

    async fn rename_asset(
        &self,
        asset_id: u64,
        new_name: &str,
        options: ::common::remote::RenameOptions,
    ) -> Result<::common::remote::AssetRecord, RemoteError> {
        self.inner.rename_asset(asset_id, new_name, options).await
    }

    async fn copy_asset(
        &self,
        source_project: u64,
        asset_id: u64,
        target_project: u64,
        folder_id: Option<u64>,
        branches: ::common::remote::CopyBranches,
    ) -> Result<::common::remote::AssetRecord, RemoteError> {
        self.inner
            .copy_asset(source_project, asset_id, target_project, folder_id, branches)
            .await
    }

    async fn delete_asset(&self, asset_id: u64, branch_id: Option<&str>) -> Result<(), RemoteError> {
        self.inner.delete_asset(asset_id, branch_id).await
    }

    async fn upload_file(
        &self,
        asset_id: u64,
        filename: &str,
        last_modified: &::common::remote::RemoteTimestamp,
        data: Bytes,
        branch_id: Option<&str>,
    ) -> Result<::common::remote::AssetRecord, RemoteError> {
        self.inner
            .upload_file(asset_id, filename, last_modified, data, branch_id)
            .await
    }
}

#[tokio::test]
async fn scenario_stale_precondition_is_a_conflict() {
    let (service, _) = common::game_service();
    let fs = AssetFs::new(RacingService {
        inner: service.clone(),
    });
    let before = fs.stat(PLAYER).await.unwrap();

    let err = fs
        .write_file(PLAYER, Bytes::from_static(b"// mine\n"), false)
        .await
        .unwrap_err();

    assert!(err.is_conflict(), "{err:?}");
    assert_eq!(service.calls("upload_file"), 1);
    assert_eq!(
        service.content(common::PLAYER_ID, None).unwrap(),
        common::PLAYER_SRC
    );
    assert_eq!(fs.stat(PLAYER).await.unwrap(), before);
}
