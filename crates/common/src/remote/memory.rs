use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::RwLock;

use super::{
    AssetId, AssetRecord, Branch, BranchId, CopyBranches, CreateOptions, FileInfo, Permissions,
    ProjectId, ProjectRecord, RemoteAssetService, RemoteError, RemoteTimestamp, RenameOptions,
    UserId, FOLDER_TYPE,
};
use crate::sync::content_hash;

/// In-memory asset service.
///
/// Behaves like the remote store (modification preconditions, per-branch
///  asset sets, subtree copy and delete) and records how often each
///  operation was called, so callers can assert on network traffic.
///  Cloning shares the same underlying store.
#[derive(Debug, Clone)]
pub struct MemoryAssetService {
    inner: Arc<RwLock<MemoryAssetServiceInner>>,
}

#[derive(Debug)]
struct MemoryAssetServiceInner {
    user_id: UserId,
    projects: BTreeMap<ProjectId, StoredProject>,
    /// asset id -> owning project, asset ids are unique across projects
    owners: HashMap<AssetId, ProjectId>,
    next_id: u64,
    /// Logical clock driving every modification timestamp
    epoch: DateTime<Utc>,
    ticks: i64,
    calls: HashMap<&'static str, usize>,
    listings: HashMap<(ProjectId, BranchId), usize>,
    unauthorized: bool,
}

#[derive(Debug)]
struct StoredProject {
    record: ProjectRecord,
    primary: BranchId,
    branches: Vec<Branch>,
    assets: HashMap<BranchId, BTreeMap<AssetId, StoredAsset>>,
}

#[derive(Debug, Clone)]
struct StoredAsset {
    record: AssetRecord,
    content: Vec<u8>,
}

impl MemoryAssetService {
    pub fn new(user_id: UserId) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryAssetServiceInner {
                user_id,
                projects: BTreeMap::new(),
                owners: HashMap::new(),
                next_id: 1000,
                epoch: Utc
                    .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                    .single()
                    .unwrap_or_default(),
                ticks: 0,
                calls: HashMap::new(),
                listings: HashMap::new(),
                unauthorized: false,
            })),
        }
    }

    /* Seeding */

    /// Add a project with a primary branch named `main`
    pub fn add_project(&self, name: &str) -> ProjectId {
        let mut inner = self.inner.write();
        let id = inner.allocate_id();
        let now = inner.tick();
        let primary = format!("{id}-main");
        let record = ProjectRecord {
            id,
            name: name.to_string(),
            description: String::new(),
            owner: "owner".to_string(),
            owner_id: inner.user_id,
            access_level: "admin".to_string(),
            permissions: Permissions {
                admin: vec![inner.user_id.to_string()],
                ..Permissions::default()
            },
            private: false,
            locked: false,
            created: now.clone(),
            modified: now,
        };
        let mut assets = HashMap::new();
        assets.insert(primary.clone(), BTreeMap::new());
        inner.projects.insert(
            id,
            StoredProject {
                record,
                primary: primary.clone(),
                branches: vec![Branch {
                    id: primary,
                    name: "main".to_string(),
                }],
                assets,
            },
        );
        id
    }

    /// Add an empty branch to a project and return its id
    pub fn add_branch(&self, project_id: ProjectId, name: &str) -> BranchId {
        let mut inner = self.inner.write();
        let id = format!("{project_id}-{name}");
        if let Some(project) = inner.projects.get_mut(&project_id) {
            project.branches.push(Branch {
                id: id.clone(),
                name: name.to_string(),
            });
            project.assets.insert(id.clone(), BTreeMap::new());
        }
        id
    }

    pub fn add_folder(
        &self,
        project_id: ProjectId,
        branch_id: Option<&str>,
        name: &str,
        parent: Option<AssetId>,
    ) -> AssetId {
        let mut inner = self.inner.write();
        let id = inner.allocate_id();
        let record = inner.new_record(id, name, FOLDER_TYPE, parent, None);
        inner.store(project_id, branch_id, record, Vec::new());
        id
    }

    pub fn add_file(
        &self,
        project_id: ProjectId,
        branch_id: Option<&str>,
        name: &str,
        parent: Option<AssetId>,
        kind: &str,
        content: &[u8],
    ) -> AssetId {
        let mut inner = self.inner.write();
        let id = inner.allocate_id();
        let record = inner.new_record(id, name, kind, parent, Some(content));
        inner.store(project_id, branch_id, record, content.to_vec());
        id
    }

    /// Store a record verbatim, trusting its id and parent
    pub fn insert_record(
        &self,
        project_id: ProjectId,
        branch_id: Option<&str>,
        record: AssetRecord,
        content: &[u8],
    ) {
        let mut inner = self.inner.write();
        inner.next_id = inner.next_id.max(record.id + 1);
        inner.store(project_id, branch_id, record, content.to_vec());
    }

    /* Simulated foreign writers */

    /// Replace a file's content as another client would
    pub fn edit_remotely(&self, asset_id: AssetId, branch_id: Option<&str>, content: &[u8]) {
        let mut inner = self.inner.write();
        let now = inner.tick();
        if let Some(asset) = inner.asset_mut(asset_id, branch_id) {
            asset.content = content.to_vec();
            asset.record.modified_at = now;
            if let Some(file) = asset.record.file.as_mut() {
                file.hash = content_hash(content);
                file.size = content.len() as u64;
            }
        }
    }

    /// Bump an asset's modification time without touching its content
    pub fn touch_remotely(&self, asset_id: AssetId, branch_id: Option<&str>) {
        let mut inner = self.inner.write();
        let now = inner.tick();
        if let Some(asset) = inner.asset_mut(asset_id, branch_id) {
            asset.record.modified_at = now;
        }
    }

    /// Reject every call as if the credentials were revoked
    pub fn set_unauthorized(&self, unauthorized: bool) {
        self.inner.write().unauthorized = unauthorized;
    }

    /* Inspection */

    pub fn content(&self, asset_id: AssetId, branch_id: Option<&str>) -> Option<Vec<u8>> {
        let inner = self.inner.read();
        inner
            .asset(asset_id, branch_id)
            .map(|asset| asset.content.clone())
    }

    pub fn record(&self, asset_id: AssetId, branch_id: Option<&str>) -> Option<AssetRecord> {
        let inner = self.inner.read();
        inner
            .asset(asset_id, branch_id)
            .map(|asset| asset.record.clone())
    }

    /// Every record stored on a project branch
    pub fn records(&self, project_id: ProjectId, branch_id: Option<&str>) -> Vec<AssetRecord> {
        let inner = self.inner.read();
        inner
            .branch_assets(project_id, branch_id)
            .map(|assets| assets.values().map(|a| a.record.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of calls made to a service operation, by method name
    pub fn calls(&self, method: &str) -> usize {
        self.inner.read().calls.get(method).copied().unwrap_or(0)
    }

    /// Number of `list_assets` calls for one project branch
    pub fn asset_listings(&self, project_id: ProjectId, branch_id: Option<&str>) -> usize {
        let inner = self.inner.read();
        let Some(branch) = inner.branch_key(project_id, branch_id) else {
            return 0;
        };
        inner
            .listings
            .get(&(project_id, branch))
            .copied()
            .unwrap_or(0)
    }

    /// Record a call and fail when credentials are being rejected
    fn enter(&self, method: &'static str) -> Result<(), RemoteError> {
        let mut inner = self.inner.write();
        *inner.calls.entry(method).or_insert(0) += 1;
        if inner.unauthorized {
            return Err(RemoteError::Unauthorized("access token rejected".to_string()));
        }
        Ok(())
    }
}

impl MemoryAssetServiceInner {
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn tick(&mut self) -> RemoteTimestamp {
        self.ticks += 1;
        RemoteTimestamp::from(self.epoch + Duration::seconds(self.ticks))
    }

    fn new_record(
        &mut self,
        id: AssetId,
        name: &str,
        kind: &str,
        parent: Option<AssetId>,
        content: Option<&[u8]>,
    ) -> AssetRecord {
        let now = self.tick();
        AssetRecord {
            id,
            name: name.to_string(),
            kind: kind.to_string(),
            parent,
            created_at: now.clone(),
            modified_at: now,
            file: content.map(|data| FileInfo {
                hash: content_hash(data),
                filename: name.to_string(),
                size: data.len() as u64,
                url: None,
            }),
        }
    }

    fn branch_key(&self, project_id: ProjectId, branch_id: Option<&str>) -> Option<BranchId> {
        let project = self.projects.get(&project_id)?;
        Some(
            branch_id
                .map(str::to_string)
                .unwrap_or_else(|| project.primary.clone()),
        )
    }

    fn branch_assets(
        &self,
        project_id: ProjectId,
        branch_id: Option<&str>,
    ) -> Option<&BTreeMap<AssetId, StoredAsset>> {
        let branch = self.branch_key(project_id, branch_id)?;
        self.projects.get(&project_id)?.assets.get(&branch)
    }

    fn branch_assets_mut(
        &mut self,
        project_id: ProjectId,
        branch_id: Option<&str>,
    ) -> Option<&mut BTreeMap<AssetId, StoredAsset>> {
        let branch = self.branch_key(project_id, branch_id)?;
        self.projects.get_mut(&project_id)?.assets.get_mut(&branch)
    }

    fn asset(&self, asset_id: AssetId, branch_id: Option<&str>) -> Option<&StoredAsset> {
        let project_id = *self.owners.get(&asset_id)?;
        self.branch_assets(project_id, branch_id)?.get(&asset_id)
    }

    fn asset_mut(&mut self, asset_id: AssetId, branch_id: Option<&str>) -> Option<&mut StoredAsset> {
        let project_id = *self.owners.get(&asset_id)?;
        self.branch_assets_mut(project_id, branch_id)?
            .get_mut(&asset_id)
    }

    fn store(
        &mut self,
        project_id: ProjectId,
        branch_id: Option<&str>,
        record: AssetRecord,
        content: Vec<u8>,
    ) {
        let id = record.id;
        if let Some(assets) = self.branch_assets_mut(project_id, branch_id) {
            assets.insert(id, StoredAsset { record, content });
            self.owners.insert(id, project_id);
        }
    }

    /// Ids of an asset and every asset below it
    fn subtree(assets: &BTreeMap<AssetId, StoredAsset>, root: AssetId) -> Vec<AssetId> {
        let mut ids = vec![root];
        let mut cursor = 0;
        while cursor < ids.len() {
            let parent = ids[cursor];
            ids.extend(
                assets
                    .values()
                    .filter(|a| a.record.parent == Some(parent))
                    .map(|a| a.record.id),
            );
            cursor += 1;
        }
        ids
    }

    fn not_found(asset_id: AssetId) -> RemoteError {
        RemoteError::NotFound(format!("asset {asset_id}"))
    }
}

#[async_trait]
impl RemoteAssetService for MemoryAssetService {
    async fn fetch_user_id(&self) -> Result<UserId, RemoteError> {
        self.enter("fetch_user_id")?;
        Ok(self.inner.read().user_id)
    }

    async fn list_projects(&self, user_id: UserId) -> Result<Vec<ProjectRecord>, RemoteError> {
        self.enter("list_projects")?;
        let inner = self.inner.read();
        if user_id != inner.user_id {
            return Err(RemoteError::NotFound(format!("user {user_id}")));
        }
        Ok(inner.projects.values().map(|p| p.record.clone()).collect())
    }

    async fn list_branches(&self, project_id: ProjectId) -> Result<Vec<Branch>, RemoteError> {
        self.enter("list_branches")?;
        let inner = self.inner.read();
        inner
            .projects
            .get(&project_id)
            .map(|p| p.branches.clone())
            .ok_or_else(|| RemoteError::NotFound(format!("project {project_id}")))
    }

    async fn list_assets(
        &self,
        project_id: ProjectId,
        branch_id: Option<&str>,
    ) -> Result<Vec<AssetRecord>, RemoteError> {
        self.enter("list_assets")?;
        let mut inner = self.inner.write();
        let branch = inner
            .branch_key(project_id, branch_id)
            .ok_or_else(|| RemoteError::NotFound(format!("project {project_id}")))?;
        *inner.listings.entry((project_id, branch)).or_insert(0) += 1;
        inner
            .branch_assets(project_id, branch_id)
            .map(|assets| assets.values().map(|a| a.record.clone()).collect())
            .ok_or_else(|| RemoteError::NotFound(format!("branch of project {project_id}")))
    }

    async fn get_asset(
        &self,
        asset_id: AssetId,
        branch_id: Option<&str>,
    ) -> Result<AssetRecord, RemoteError> {
        self.enter("get_asset")?;
        let inner = self.inner.read();
        inner
            .asset(asset_id, branch_id)
            .map(|a| a.record.clone())
            .ok_or_else(|| MemoryAssetServiceInner::not_found(asset_id))
    }

    async fn get_file_content(
        &self,
        asset_id: AssetId,
        _filename: &str,
        branch_id: Option<&str>,
    ) -> Result<Bytes, RemoteError> {
        self.enter("get_file_content")?;
        let inner = self.inner.read();
        inner
            .asset(asset_id, branch_id)
            .map(|a| Bytes::from(a.content.clone()))
            .ok_or_else(|| MemoryAssetServiceInner::not_found(asset_id))
    }

    async fn create_asset(
        &self,
        project_id: ProjectId,
        name: &str,
        options: CreateOptions,
    ) -> Result<AssetRecord, RemoteError> {
        self.enter("create_asset")?;
        let mut inner = self.inner.write();
        let branch_id = options.branch_id.as_deref();
        if inner.branch_assets(project_id, branch_id).is_none() {
            return Err(RemoteError::NotFound(format!("project {project_id}")));
        }
        if let Some(folder_id) = options.folder_id {
            if inner.asset(folder_id, branch_id).is_none() {
                return Err(MemoryAssetServiceInner::not_found(folder_id));
            }
        }

        let id = inner.allocate_id();
        let kind = options.kind.unwrap_or_else(|| "text".to_string());
        let content = (kind != FOLDER_TYPE).then_some(&[][..]);
        let record = inner.new_record(id, name, &kind, options.folder_id, content);
        inner.store(project_id, branch_id, record.clone(), Vec::new());
        Ok(record)
    }

    async fn rename_asset(
        &self,
        asset_id: AssetId,
        new_name: &str,
        options: RenameOptions,
    ) -> Result<AssetRecord, RemoteError> {
        self.enter("rename_asset")?;
        let mut inner = self.inner.write();
        let now = inner.tick();
        let asset = inner
            .asset_mut(asset_id, options.branch_id.as_deref())
            .ok_or_else(|| MemoryAssetServiceInner::not_found(asset_id))?;
        asset.record.name = new_name.to_string();
        asset.record.parent = options.folder_id;
        asset.record.modified_at = now;
        if let Some(file) = asset.record.file.as_mut() {
            file.filename = new_name.to_string();
        }
        Ok(asset.record.clone())
    }

    async fn copy_asset(
        &self,
        source_project: ProjectId,
        asset_id: AssetId,
        target_project: ProjectId,
        folder_id: Option<AssetId>,
        branches: CopyBranches,
    ) -> Result<AssetRecord, RemoteError> {
        self.enter("copy_asset")?;
        let mut inner = self.inner.write();
        let source = inner
            .branch_assets(source_project, branches.source.as_deref())
            .ok_or_else(|| RemoteError::NotFound(format!("project {source_project}")))?;
        if !source.contains_key(&asset_id) {
            return Err(MemoryAssetServiceInner::not_found(asset_id));
        }
        let copied: Vec<StoredAsset> = MemoryAssetServiceInner::subtree(source, asset_id)
            .into_iter()
            .filter_map(|id| source.get(&id).cloned())
            .collect();
        if inner
            .branch_assets(target_project, branches.target.as_deref())
            .is_none()
        {
            return Err(RemoteError::NotFound(format!("project {target_project}")));
        }

        // old id -> new id, so copied children point at copied parents
        let mut remapped: HashMap<AssetId, AssetId> = HashMap::new();
        for asset in &copied {
            let fresh = inner.allocate_id();
            remapped.insert(asset.record.id, fresh);
        }

        let now = inner.tick();
        let mut root = None;
        for asset in copied {
            let mut record = asset.record;
            let is_root = record.id == asset_id;
            record.id = remapped[&record.id];
            record.parent = if is_root {
                folder_id
            } else {
                record.parent.and_then(|p| remapped.get(&p).copied())
            };
            record.created_at = now.clone();
            record.modified_at = now.clone();
            if is_root {
                root = Some(record.clone());
            }
            inner.store(target_project, branches.target.as_deref(), record, asset.content);
        }

        root.ok_or_else(|| MemoryAssetServiceInner::not_found(asset_id))
    }

    async fn delete_asset(
        &self,
        asset_id: AssetId,
        branch_id: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.enter("delete_asset")?;
        let mut inner = self.inner.write();
        let project_id = *inner
            .owners
            .get(&asset_id)
            .ok_or_else(|| MemoryAssetServiceInner::not_found(asset_id))?;
        let assets = inner
            .branch_assets_mut(project_id, branch_id)
            .ok_or_else(|| MemoryAssetServiceInner::not_found(asset_id))?;
        if !assets.contains_key(&asset_id) {
            return Err(MemoryAssetServiceInner::not_found(asset_id));
        }
        for id in MemoryAssetServiceInner::subtree(assets, asset_id) {
            assets.remove(&id);
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        asset_id: AssetId,
        _filename: &str,
        last_modified: &RemoteTimestamp,
        data: Bytes,
        branch_id: Option<&str>,
    ) -> Result<AssetRecord, RemoteError> {
        self.enter("upload_file")?;
        let mut inner = self.inner.write();
        let now = inner.tick();
        let asset = inner
            .asset_mut(asset_id, branch_id)
            .ok_or_else(|| MemoryAssetServiceInner::not_found(asset_id))?;
        if asset.record.modified_at != *last_modified {
            return Err(RemoteError::StaleModification(asset_id));
        }

        asset.content = data.to_vec();
        asset.record.modified_at = now;
        let filename = asset.record.name.clone();
        let file = asset.record.file.get_or_insert_with(|| FileInfo {
            hash: String::new(),
            filename,
            size: 0,
            url: None,
        });
        file.hash = content_hash(&data);
        file.size = data.len() as u64;
        Ok(asset.record.clone())
    }
}
