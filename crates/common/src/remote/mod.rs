//! Remote asset service contract
//!
//! The canonical store is only ever reached through [`RemoteAssetService`].
//! Records returned by the service are flat: the hierarchy is rebuilt locally
//! from `parent` ids by the cache (see [`crate::cache::AssetTree`]).
//!
//! - **[`ProjectRecord`]**: a top-level project as listed for a user
//! - **[`Branch`]**: a named line of assets within a project
//! - **[`AssetRecord`]**: one folder or typed file, with content metadata
//!
//! [`MemoryAssetService`] is a complete in-process implementation, used by
//! tests and anywhere a real transport is not wanted.

mod memory;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemoryAssetService;

pub type AssetId = u64;
pub type ProjectId = u64;
pub type UserId = u64;
pub type BranchId = String;

/// Remote type tag that marks an asset as a directory
pub const FOLDER_TYPE: &str = "folder";

/// A timestamp exactly as the remote reported it.
///
/// The raw string is kept because upload preconditions are compared
/// verbatim by the remote store; re-formatting a parsed value could
/// change its representation and trip the precondition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteTimestamp(String);

impl RemoteTimestamp {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as RFC 3339, if the remote used that format
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Milliseconds since the unix epoch, or 0 when unparseable
    pub fn as_millis(&self) -> i64 {
        self.to_datetime()
            .map(|dt| dt.timestamp_millis())
            .unwrap_or_default()
    }
}

impl From<DateTime<Utc>> for RemoteTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl fmt::Display for RemoteTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Principals allowed to act on a project, by role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub admin: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
    #[serde(default)]
    pub read: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub owner_id: UserId,
    #[serde(default)]
    pub access_level: String,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub locked: bool,
    pub created: RemoteTimestamp,
    pub modified: RemoteTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
}

/// Content metadata carried by non-folder assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Hex MD5 of the stored bytes
    pub hash: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub id: AssetId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parent: Option<AssetId>,
    pub created_at: RemoteTimestamp,
    pub modified_at: RemoteTimestamp,
    #[serde(default)]
    pub file: Option<FileInfo>,
}

impl AssetRecord {
    pub fn is_folder(&self) -> bool {
        self.kind == FOLDER_TYPE
    }

    /// The name this asset is addressed by: the stored filename for
    ///  file assets, the asset name otherwise
    pub fn display_name(&self) -> &str {
        match &self.file {
            Some(file) => &file.filename,
            None => &self.name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Parent folder, `None` for the project root
    pub folder_id: Option<AssetId>,
    pub branch_id: Option<BranchId>,
    /// Remote type tag; the service infers one when absent
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameOptions {
    /// New parent folder, `None` for the project root
    pub folder_id: Option<AssetId>,
    pub branch_id: Option<BranchId>,
}

/// Branch scope on each side of a cross-project copy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyBranches {
    pub source: Option<BranchId>,
    pub target: Option<BranchId>,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("remote resource not found: {0}")]
    NotFound(String),
    /// The upload precondition (last known modification time) no
    ///  longer matches the stored asset
    #[error("asset {0} was modified, please pull the latest version")]
    StaleModification(AssetId),
    #[error("remote error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Operations against the canonical asset store.
///
/// A `None` branch always means the project's primary branch.
#[async_trait]
pub trait RemoteAssetService: Send + Sync + fmt::Debug + 'static {
    /// Identify the user the current credentials belong to
    async fn fetch_user_id(&self) -> Result<UserId, RemoteError>;

    async fn list_projects(&self, user_id: UserId) -> Result<Vec<ProjectRecord>, RemoteError>;

    async fn list_branches(&self, project_id: ProjectId) -> Result<Vec<Branch>, RemoteError>;

    /// List every asset of a project on one branch, as a flat list
    async fn list_assets(
        &self,
        project_id: ProjectId,
        branch_id: Option<&str>,
    ) -> Result<Vec<AssetRecord>, RemoteError>;

    /// Fetch the current metadata of a single asset
    async fn get_asset(
        &self,
        asset_id: AssetId,
        branch_id: Option<&str>,
    ) -> Result<AssetRecord, RemoteError>;

    async fn get_file_content(
        &self,
        asset_id: AssetId,
        filename: &str,
        branch_id: Option<&str>,
    ) -> Result<Bytes, RemoteError>;

    async fn create_asset(
        &self,
        project_id: ProjectId,
        name: &str,
        options: CreateOptions,
    ) -> Result<AssetRecord, RemoteError>;

    async fn rename_asset(
        &self,
        asset_id: AssetId,
        new_name: &str,
        options: RenameOptions,
    ) -> Result<AssetRecord, RemoteError>;

    /// Paste an asset (and its subtree) into another project
    async fn copy_asset(
        &self,
        source_project: ProjectId,
        asset_id: AssetId,
        target_project: ProjectId,
        folder_id: Option<AssetId>,
        branches: CopyBranches,
    ) -> Result<AssetRecord, RemoteError>;

    async fn delete_asset(&self, asset_id: AssetId, branch_id: Option<&str>)
        -> Result<(), RemoteError>;

    /// Replace a file's content.
    ///
    /// Should fail with `RemoteError::StaleModification` when
    ///  `last_modified` does not match the stored modification time.
    async fn upload_file(
        &self,
        asset_id: AssetId,
        filename: &str,
        last_modified: &RemoteTimestamp,
        data: Bytes,
        branch_id: Option<&str>,
    ) -> Result<AssetRecord, RemoteError>;
}
