//! Filesystem facade
//!
//! [`AssetFs`] is the operation surface a host mounts: stat, list, read,
//! write, rename, copy, delete and search over `/<project>/...` paths. It is
//! the only component that talks to the [`RemoteAssetService`]; everything
//! it learns goes into the shared [`ProjectCache`].
//!
//! Reads are served from the cache, which is filled lazily: the project
//! list on first use (coalesced across concurrent callers), a project's
//! assets once per branch. Writes re-validate against the remote before
//! uploading (see [`crate::sync`]), and structural changes reload the
//! affected project instead of patching the cached tree.

mod config;
mod error;
mod search;

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::sync::OnceCell;

use crate::cache::{AssetTree, FileType, Node, Project, ProjectCache};
use crate::host::{AutoConfirm, ConfirmationPrompt, MemoryWorkspace, WorkspaceStore, DEFAULT_BRANCH};
use crate::path::{ProjectPath, Resolver};
use crate::remote::{
    AssetId, Branch, CopyBranches, CreateOptions, RemoteAssetService, RemoteError, RenameOptions, UserId,
    FOLDER_TYPE,
};
use crate::sync;

pub use config::{FsConfig, DEFAULT_MAX_SEARCH_RESULTS, DEFAULT_PREVIEW_WIDTH};
pub use error::FsError;
pub use search::SearchHit;

/// Metadata reported for a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub file_type: FileType,
    /// Byte size, 0 for directories
    pub size: u64,
    /// Milliseconds since the unix epoch
    pub created: i64,
    pub modified: i64,
}

impl FileStat {
    fn project(project: &Project) -> Self {
        let record = project.record();
        Self {
            file_type: FileType::Directory,
            size: 0,
            created: record.created.as_millis(),
            modified: record.modified.as_millis(),
        }
    }

    fn node(node: &Node) -> Self {
        Self {
            file_type: node.file_type(),
            size: node.size(),
            created: node.created_at.as_millis(),
            modified: node.modified_at.as_millis(),
        }
    }
}

/// A branch-aware filesystem over a remote asset service.
///
/// Cheap to clone; clones share the cache and the bootstrap state.
#[derive(Debug)]
pub struct AssetFs<S: RemoteAssetService> {
    inner: Arc<AssetFsInner<S>>,
}

impl<S: RemoteAssetService> Clone for AssetFs<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

#[derive(Debug)]
struct AssetFsInner<S> {
    service: S,
    cache: Arc<ProjectCache>,
    workspace: Arc<dyn WorkspaceStore>,
    prompt: Arc<dyn ConfirmationPrompt>,
    config: FsConfig,
    // swapped for a fresh cell on a full refresh
    bootstrap: parking_lot::Mutex<Arc<OnceCell<()>>>,
    user_id: OnceCell<UserId>,
}

pub struct AssetFsBuilder<S> {
    service: S,
    cache: Option<Arc<ProjectCache>>,
    workspace: Option<Arc<dyn WorkspaceStore>>,
    prompt: Option<Arc<dyn ConfirmationPrompt>>,
    config: FsConfig,
}

impl<S: RemoteAssetService> AssetFsBuilder<S> {
    /// Share an existing cache instead of starting with an empty one
    pub fn cache(mut self, cache: Arc<ProjectCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn workspace(mut self, workspace: Arc<dyn WorkspaceStore>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    pub fn prompt(mut self, prompt: Arc<dyn ConfirmationPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn config(mut self, config: FsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> AssetFs<S> {
        AssetFs {
            inner: Arc::new(AssetFsInner {
                service: self.service,
                cache: self.cache.unwrap_or_default(),
                workspace: self
                    .workspace
                    .unwrap_or_else(|| Arc::new(MemoryWorkspace::new()) as Arc<dyn WorkspaceStore>),
                prompt: self
                    .prompt
                    .unwrap_or_else(|| Arc::new(AutoConfirm::default()) as Arc<dyn ConfirmationPrompt>),
                config: self.config,
                bootstrap: parking_lot::Mutex::new(Arc::new(OnceCell::new())),
                user_id: OnceCell::new(),
            }),
        }
    }
}

impl<S: RemoteAssetService> AssetFs<S> {
    pub fn builder(service: S) -> AssetFsBuilder<S> {
        AssetFsBuilder {
            service,
            cache: None,
            workspace: None,
            prompt: None,
            config: FsConfig::default(),
        }
    }

    /// A filesystem with an empty cache, an empty workspace and
    ///  confirmations that always succeed
    pub fn new(service: S) -> Self {
        Self::builder(service).build()
    }

    /* Getters */

    pub fn service(&self) -> &S {
        &self.inner.service
    }

    pub fn cache(&self) -> &Arc<ProjectCache> {
        &self.inner.cache
    }

    pub fn config(&self) -> &FsConfig {
        &self.inner.config
    }

    /// Projects known to the session, syncing the list if needed
    pub async fn projects(&self) -> Result<Vec<Project>, FsError> {
        self.ensure_projects().await?;
        Ok(self.inner.cache.projects())
    }

    /* Reads */

    pub async fn stat(&self, path: &str) -> Result<FileStat, FsError> {
        let path = self.parse_visible(path)?;
        let project = self.project(&path).await?;
        if path.is_project_root() {
            return Ok(FileStat::project(&project));
        }

        self.ensure_assets(&project).await?;
        let node = self.node(&project, &path)?;
        Ok(FileStat::node(&node))
    }

    /// Immediate children of a directory as (name, type) pairs
    pub async fn read_directory(&self, path: &str) -> Result<Vec<(String, FileType)>, FsError> {
        let path = ProjectPath::parse(path)?;
        let project = self.project(&path).await?;
        self.ensure_assets(&project).await?;

        let parent = if path.is_project_root() {
            None
        } else {
            let node = self.node(&project, &path)?;
            if !node.is_dir() {
                return Err(FsError::NotADirectory(path.to_string()));
            }
            Some(node.id)
        };

        project
            .with_tree(|tree| tree.entries(parent))
            .ok_or_else(|| FsError::Structural(format!("assets of {} dropped", project.name())))
    }

    /// File content, fetched once and cached. Directories read as empty.
    pub async fn read_file(&self, path: &str) -> Result<Bytes, FsError> {
        let path = self.parse_visible(path)?;
        let project = self.project(&path).await?;
        if path.is_project_root() {
            return Ok(Bytes::new());
        }

        self.ensure_assets(&project).await?;
        let node = self.node(&project, &path)?;
        let Some(file) = node.as_file() else {
            return Ok(Bytes::new());
        };

        let content = match &file.content {
            Some(content) => {
                tracing::debug!(asset_id = node.id, "content cache hit");
                content.clone()
            }
            None => {
                let branch = project.selected_branch();
                let content = self
                    .inner
                    .service
                    .get_file_content(node.id, &file.filename, branch.as_deref())
                    .await?;
                tracing::debug!(asset_id = node.id, size = content.len(), "fetched content");
                self.inner
                    .cache
                    .cache_content(&project, node.id, &file.hash, content.clone());
                content
            }
        };

        Ok(self.with_preamble(&node.name, content))
    }

    /* Writes */

    /// Write a file's content, creating the asset first when `create` is
    ///  set and it does not exist.
    ///
    /// Fails with [`FsError::Conflict`] when the remote content changed
    ///  since it was cached and differs from `data`; the cache is left as
    ///  it was.
    pub async fn write_file(&self, path: &str, data: Bytes, create: bool) -> Result<(), FsError> {
        let path = ProjectPath::parse(path)?;
        if path.is_project_root() {
            return Err(FsError::IsADirectory(path.to_string()));
        }
        let project = self.project(&path).await?;
        self.ensure_assets(&project).await?;
        let data = self.strip_preamble(&path, data);

        let node = match self.resolver().lookup(&project, &path)? {
            Some(node) => node,
            None if create => {
                self.create_asset(&project, &path, None).await?;
                if data.is_empty() {
                    return Ok(());
                }
                self.node(&project, &path)?
            }
            None => return Err(FsError::NotFound(path.to_string())),
        };
        let Some(file) = node.as_file() else {
            return Err(FsError::IsADirectory(path.to_string()));
        };

        let branch = project.selected_branch();
        let remote = self
            .inner
            .service
            .get_asset(node.id, branch.as_deref())
            .await?;
        let report = sync::check(&file.hash, &node.modified_at, &remote, &data);
        if report.is_conflict() {
            tracing::warn!(path = %path, asset_id = node.id, "rejected write over remote changes");
            return Err(FsError::Conflict(path.to_string()));
        }
        if report.needs_metadata_merge() {
            tracing::debug!(asset_id = node.id, precondition = %report.precondition, "merged drifted metadata");
        }

        let uploaded = match self
            .inner
            .service
            .upload_file(
                node.id,
                &file.filename,
                &report.precondition,
                data.clone(),
                branch.as_deref(),
            )
            .await
        {
            Ok(record) => record,
            Err(RemoteError::StaleModification(_)) => {
                tracing::warn!(path = %path, asset_id = node.id, "upload precondition rejected");
                return Err(FsError::Conflict(path.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(path = %path, asset_id = node.id, size = data.len(), "uploaded file");
        if !self.inner.cache.merge_asset(&project, &uploaded, Some(data)) {
            tracing::debug!(asset_id = node.id, "uploaded asset no longer cached");
        }
        Ok(())
    }

    /// Create a folder. An existing path is left alone.
    pub async fn create_directory(&self, path: &str) -> Result<(), FsError> {
        let path = ProjectPath::parse(path)?;
        let project = self.project(&path).await?;
        if path.is_project_root() {
            return Ok(());
        }
        self.ensure_assets(&project).await?;

        if self.resolver().lookup(&project, &path)?.is_some() {
            tracing::debug!(path = %path, "directory already exists");
            return Ok(());
        }
        self.create_asset(&project, &path, Some(FOLDER_TYPE.to_string()))
            .await
    }

    /// Rename or move an asset within its project
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from = ProjectPath::parse(from)?;
        let to = ProjectPath::parse(to)?;
        let Some(new_name) = to.leaf_name() else {
            return Err(FsError::InvalidOperation(format!("cannot rename onto project {to}")));
        };
        if from.is_project_root() {
            return Err(FsError::InvalidOperation(format!("cannot rename project {from}")));
        }

        let project = self.project(&from).await?;
        let target = self.project(&to).await?;
        if project.id() != target.id() {
            return Err(FsError::InvalidOperation(format!(
                "cannot move {from} into another project"
            )));
        }
        self.ensure_assets(&project).await?;

        let node = self.resolver().resolve_asset(&project, &from)?;
        let folder_id = self.parent_folder(&project, &to)?;
        let branch_id = project.selected_branch();
        self.inner
            .service
            .rename_asset(node.id, new_name, RenameOptions { folder_id, branch_id })
            .await?;

        tracing::info!(from = %from, to = %to, asset_id = node.id, "renamed asset");
        self.reload(&project).await
    }

    /// Copy an asset, with everything below it, into another project.
    ///
    /// `to` names the destination; the copy lands in its parent folder.
    pub async fn copy(&self, from: &str, to: &str) -> Result<(), FsError> {
        let from = ProjectPath::parse(from)?;
        let to = ProjectPath::parse(to)?;
        if from.is_project_root() {
            return Err(FsError::InvalidOperation(format!("cannot copy project {from}")));
        }

        let source = self.project(&from).await?;
        let target = self.project(&to).await?;
        if source.id() == target.id() {
            return Err(FsError::InvalidOperation(format!(
                "cannot copy assets within project {}",
                source.name()
            )));
        }
        self.ensure_assets(&source).await?;
        self.ensure_assets(&target).await?;

        let node = self.resolver().resolve_asset(&source, &from)?;
        let folder_id = if to.is_project_root() {
            None
        } else {
            self.parent_folder(&target, &to)?
        };
        self.inner
            .service
            .copy_asset(
                source.id(),
                node.id,
                target.id(),
                folder_id,
                CopyBranches {
                    source: source.selected_branch(),
                    target: target.selected_branch(),
                },
            )
            .await?;

        tracing::info!(from = %from, to = %to, asset_id = node.id, "copied asset");
        self.reload(&target).await
    }

    /// Delete an asset. Deleting a non-empty folder must be confirmed.
    pub async fn delete(&self, path: &str) -> Result<(), FsError> {
        let path = ProjectPath::parse(path)?;
        if path.is_project_root() {
            return Err(FsError::InvalidOperation(format!("cannot delete project {path}")));
        }
        let project = self.project(&path).await?;
        self.ensure_assets(&project).await?;

        let node = self.resolver().resolve_asset(&project, &path)?;
        let non_empty = node
            .as_dir()
            .map(|dir| !dir.children.is_empty())
            .unwrap_or(false);
        if non_empty {
            let message = format!("{path} is not empty. Delete it and everything in it?");
            if !self.inner.prompt.confirm(&message).await {
                tracing::warn!(path = %path, "delete declined");
                return Err(FsError::Cancelled(format!("delete {path}")));
            }
        }

        let branch = project.selected_branch();
        self.inner
            .service
            .delete_asset(node.id, branch.as_deref())
            .await?;

        tracing::info!(path = %path, asset_id = node.id, "deleted asset");
        self.reload(&project).await
    }

    /* Branches and refresh */

    /// Select a project's branch by name and remember the choice in the
    ///  workspace
    pub async fn switch_branch(&self, project: &str, branch: &str) -> Result<(), FsError> {
        let path = ProjectPath::parse(&format!("/{project}"))?;
        let project = self.project(&path).await?;
        if project.branches().is_none() {
            self.fetch_branches(&project).await?;
        }
        self.inner.cache.switch_branch(&project, branch)?;

        if let Err(err) = self.inner.workspace.set_branch(project.name(), branch) {
            tracing::warn!(project = project.name(), error = %err, "failed to persist branch selection");
        }
        Ok(())
    }

    /// Display name of a project's selected branch
    pub async fn branch_name(&self, project: &str) -> Result<String, FsError> {
        let path = ProjectPath::parse(&format!("/{project}"))?;
        let project = self.project(&path).await?;
        if project.selected_branch().is_none() {
            return Ok(DEFAULT_BRANCH.to_string());
        }
        if project.branches().is_none() {
            self.fetch_branches(&project).await?;
        }
        Ok(project
            .selected_branch_name()
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string()))
    }

    /// Branches of a project, fetching them when needed
    pub async fn branches(&self, project: &str) -> Result<Vec<Branch>, FsError> {
        let path = ProjectPath::parse(&format!("/{project}"))?;
        let project = self.project(&path).await?;
        if let Some(branches) = project.branches() {
            return Ok(branches);
        }
        self.fetch_branches(&project).await
    }

    /// Reload the assets of the project owning `path`
    pub async fn pull_latest(&self, path: &str) -> Result<(), FsError> {
        let path = ProjectPath::parse(path)?;
        let project = self.project(&path).await?;
        self.reload(&project).await
    }

    /// Drop cached state; a full refresh also forgets the project list and
    ///  lets the next access sync the account again
    pub fn refresh(&self, full: bool) {
        if full {
            *self.inner.bootstrap.lock() = Arc::new(OnceCell::new());
        }
        self.inner.cache.refresh(full);
    }

    /* Loading */

    /// Sync the project list once per session, sharing one in-flight sync
    ///  among concurrent callers
    async fn ensure_projects(&self) -> Result<(), FsError> {
        if !self.inner.cache.is_empty() {
            return Ok(());
        }
        let cell = self.inner.bootstrap.lock().clone();
        cell.get_or_try_init(|| self.bootstrap()).await?;
        Ok(())
    }

    async fn bootstrap(&self) -> Result<(), FsError> {
        let service = &self.inner.service;
        let user_id = *self
            .inner
            .user_id
            .get_or_try_init(|| service.fetch_user_id())
            .await?;

        let records = service.list_projects(user_id).await?;
        tracing::info!(user_id, count = records.len(), "synced project list");
        self.inner.cache.replace_projects(records);

        let open = self.inner.workspace.open_projects();
        let results = futures::future::join_all(open.iter().map(|name| self.preload(name))).await;
        for (name, result) in open.iter().zip(results) {
            if let Err(err) = result {
                tracing::warn!(project = %name, error = %err, "failed to preload project");
            }
        }
        Ok(())
    }

    /// Restore an open project's stored branch and list its assets
    async fn preload(&self, name: &str) -> Result<(), FsError> {
        let Some(project) = self.inner.cache.get_by_name(name) else {
            tracing::warn!(project = %name, "open project is not part of the account");
            return Ok(());
        };
        self.restore_branch(&project).await?;
        self.ensure_assets(&project).await
    }

    /// Apply the workspace's stored branch the first time a project is
    ///  touched in this session. A stored branch that no longer exists
    ///  leaves the project on its primary branch.
    async fn restore_branch(&self, project: &Project) -> Result<(), FsError> {
        if project.branch_restored() {
            return Ok(());
        }
        let _loading = project.lock_loading().await;
        if project.branch_restored() {
            return Ok(());
        }

        let branch = self.inner.workspace.branch_or_default(project.name());
        if branch != DEFAULT_BRANCH && project.selected_branch().is_none() {
            if project.branches().is_none() {
                self.fetch_branches(project).await?;
            }
            if let Err(err) = self.inner.cache.switch_branch(project, &branch) {
                tracing::warn!(project = project.name(), error = %err, "stored branch unavailable, using the primary branch");
            }
        }
        self.inner.cache.mark_branch_restored(project);
        Ok(())
    }

    async fn fetch_branches(&self, project: &Project) -> Result<Vec<Branch>, FsError> {
        let branches = self.inner.service.list_branches(project.id()).await?;
        tracing::debug!(project = project.name(), count = branches.len(), "fetched branches");
        self.inner.cache.set_branches(project, branches.clone());
        Ok(branches)
    }

    /// List a project's assets unless they are cached for its current
    ///  branch. Concurrent callers wait for a single listing.
    async fn ensure_assets(&self, project: &Project) -> Result<(), FsError> {
        if project.has_tree() {
            return Ok(());
        }
        let _loading = project.lock_loading().await;
        loop {
            if project.has_tree() {
                return Ok(());
            }
            let generation = project.generation();
            let branch = project.selected_branch();
            let records = self
                .inner
                .service
                .list_assets(project.id(), branch.as_deref())
                .await?;
            let tree = AssetTree::build(&records)?;
            let count = tree.len();

            if self.inner.cache.install_tree(project, generation, tree) {
                tracing::debug!(project = project.name(), branch = ?branch, count, "loaded assets");
                return Ok(());
            }
            tracing::debug!(project = project.name(), "discarded listing of a stale branch");
        }
    }

    async fn reload(&self, project: &Project) -> Result<(), FsError> {
        self.inner.cache.invalidate(project);
        self.ensure_assets(project).await
    }

    /* Helpers */

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.inner.cache)
    }

    async fn project(&self, path: &ProjectPath) -> Result<Project, FsError> {
        self.ensure_projects().await?;
        let project = self.resolver().resolve_project(path)?;
        self.restore_branch(&project).await?;
        Ok(project)
    }

    /// Parse a path, treating ignored segments as absent
    fn parse_visible(&self, path: &str) -> Result<ProjectPath, FsError> {
        let parsed = ProjectPath::parse(path)?;
        if parsed.contains_any(&self.inner.config.ignored_segments) {
            return Err(FsError::NotFound(path.to_string()));
        }
        Ok(parsed)
    }

    fn node(&self, project: &Project, path: &ProjectPath) -> Result<Node, FsError> {
        self.resolver()
            .lookup(project, path)?
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    /// Id of the folder that will hold `path`, `None` for the project root
    fn parent_folder(&self, project: &Project, path: &ProjectPath) -> Result<Option<AssetId>, FsError> {
        let parent = path.parent();
        if parent.is_project_root() {
            return Ok(None);
        }
        match self.resolver().lookup(project, &parent)? {
            Some(node) if node.is_dir() => Ok(Some(node.id)),
            Some(_) => Err(FsError::NotADirectory(parent.to_string())),
            None => Err(FsError::NotFound(parent.to_string())),
        }
    }

    async fn create_asset(
        &self,
        project: &Project,
        path: &ProjectPath,
        kind: Option<String>,
    ) -> Result<(), FsError> {
        let Some(name) = path.leaf_name() else {
            return Err(FsError::InvalidPath(path.to_string()));
        };
        let folder_id = self.parent_folder(project, path)?;
        let record = self
            .inner
            .service
            .create_asset(
                project.id(),
                name,
                CreateOptions {
                    folder_id,
                    branch_id: project.selected_branch(),
                    kind,
                },
            )
            .await?;

        tracing::info!(path = %path, asset_id = record.id, kind = %record.kind, "created asset");
        self.reload(project).await
    }

    fn with_preamble(&self, name: &str, content: Bytes) -> Bytes {
        match &self.inner.config.script_preamble {
            Some(preamble) if FsConfig::is_script(name) => {
                let mut buf = BytesMut::with_capacity(preamble.len() + content.len());
                buf.extend_from_slice(preamble.as_bytes());
                buf.extend_from_slice(&content);
                buf.freeze()
            }
            _ => content,
        }
    }

    fn strip_preamble(&self, path: &ProjectPath, data: Bytes) -> Bytes {
        let is_script = path.leaf_name().map(FsConfig::is_script).unwrap_or(false);
        match &self.inner.config.script_preamble {
            Some(preamble) if is_script && data.starts_with(preamble.as_bytes()) => {
                data.slice(preamble.len()..)
            }
            _ => data,
        }
    }
}
