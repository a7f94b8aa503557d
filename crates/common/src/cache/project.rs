use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::{Mutex, MutexGuard};

use crate::remote::{AssetId, AssetRecord, Branch, BranchId, ProjectId, ProjectRecord};

use super::tree::AssetTree;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("branch '{branch}' not found in project {project}")]
    BranchNotFound { project: String, branch: String },
}

/// A cached project.
///
/// Cheap to clone; every clone shares the same branch selection and
///  tree, so references handed out stay valid across soft refreshes.
#[derive(Debug, Clone)]
pub struct Project(Arc<ProjectInner>);

#[derive(Debug)]
struct ProjectInner {
    record: ProjectRecord,
    state: RwLock<ProjectState>,
    // held while listing assets, so each (project, branch) is listed once
    loading: Mutex<()>,
}

#[derive(Debug, Default)]
struct ProjectState {
    selected_branch: Option<BranchId>,
    branches: Option<Vec<Branch>>,
    tree: Option<AssetTree>,
    // bumped every time the tree is dropped; listings started under an
    //  older generation are discarded
    generation: u64,
    // the workspace's stored branch has been applied; survives soft refreshes
    branch_restored: bool,
}

impl ProjectState {
    fn drop_tree(&mut self) {
        self.tree = None;
        self.generation += 1;
    }
}

impl Project {
    fn new(record: ProjectRecord) -> Self {
        Self(Arc::new(ProjectInner {
            record,
            state: RwLock::new(ProjectState::default()),
            loading: Mutex::new(()),
        }))
    }

    /* Getters */

    pub fn id(&self) -> ProjectId {
        self.0.record.id
    }

    pub fn name(&self) -> &str {
        &self.0.record.name
    }

    pub fn record(&self) -> &ProjectRecord {
        &self.0.record
    }

    /// Selected branch id, `None` meaning the primary branch
    pub fn selected_branch(&self) -> Option<BranchId> {
        self.0.state.read().selected_branch.clone()
    }

    /// Branches, if they have been fetched
    pub fn branches(&self) -> Option<Vec<Branch>> {
        self.0.state.read().branches.clone()
    }

    /// Display name of the selected branch, when it is known
    pub fn selected_branch_name(&self) -> Option<String> {
        let state = self.0.state.read();
        let selected = state.selected_branch.as_ref()?;
        state
            .branches
            .as_ref()?
            .iter()
            .find(|branch| &branch.id == selected)
            .map(|branch| branch.name.clone())
    }

    pub fn has_tree(&self) -> bool {
        self.0.state.read().tree.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.0.state.read().generation
    }

    /// Whether the branch stored for this project has been applied
    pub fn branch_restored(&self) -> bool {
        self.0.state.read().branch_restored
    }

    /// Run `f` against the cached tree, if there is one
    pub fn with_tree<R>(&self, f: impl FnOnce(&AssetTree) -> R) -> Option<R> {
        self.0.state.read().tree.as_ref().map(f)
    }

    pub fn ptr_eq(&self, other: &Project) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Serialise asset listings for this project
    pub(crate) async fn lock_loading(&self) -> MutexGuard<'_, ()> {
        self.0.loading.lock().await
    }

    fn reset(&self) {
        let mut state = self.0.state.write();
        state.selected_branch = None;
        state.branches = None;
        state.drop_tree();
    }
}

/// The known projects of the session and everything cached beneath them.
///
/// Other components read projects freely; all mutation goes through the
///  methods here.
#[derive(Debug, Default)]
pub struct ProjectCache {
    projects: RwLock<Vec<Project>>,
}

impl ProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /* Getters */

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects.read().clone()
    }

    /// Look a project up by display name. A `:branch` suffix is accepted
    ///  and ignored; branch state only changes through `switch_branch`.
    pub fn get_by_name(&self, name: &str) -> Option<Project> {
        let name = name.split_once(':').map_or(name, |(name, _)| name);
        self.projects
            .read()
            .iter()
            .find(|project| project.name() == name)
            .cloned()
    }

    pub fn get_by_id(&self, id: ProjectId) -> Option<Project> {
        self.projects
            .read()
            .iter()
            .find(|project| project.id() == id)
            .cloned()
    }

    /* Lifecycle */

    /// Install a freshly fetched project list.
    ///
    /// A branch already selected for a project id is carried over to the
    ///  new entry; everything else starts cold.
    pub fn replace_projects(&self, records: Vec<ProjectRecord>) {
        let mut projects = self.projects.write();
        let fresh: Vec<Project> = records
            .into_iter()
            .map(|record| {
                let project = Project::new(record);
                if let Some(previous) = projects.iter().find(|p| p.id() == project.id()) {
                    let previous = previous.0.state.read();
                    let mut state = project.0.state.write();
                    state.selected_branch = previous.selected_branch.clone();
                    state.branches = previous.branches.clone();
                    state.branch_restored = previous.branch_restored;
                }
                project
            })
            .collect();
        *projects = fresh;
        tracing::debug!(count = projects.len(), "replaced project list");
    }

    /// Drop cached state.
    ///
    /// `full` forgets the project list itself, forcing an account-wide
    ///  resync. Otherwise every project keeps its identity but loses its
    ///  tree, branches and branch selection.
    pub fn refresh(&self, full: bool) {
        if full {
            self.projects.write().clear();
        } else {
            for project in self.projects.read().iter() {
                project.reset();
            }
        }
        tracing::debug!(full, "refreshed project cache");
    }

    pub fn mark_branch_restored(&self, project: &Project) {
        project.0.state.write().branch_restored = true;
    }

    pub fn set_branches(&self, project: &Project, branches: Vec<Branch>) {
        project.0.state.write().branches = Some(branches);
    }

    /// Select a branch by display name among the fetched branches and
    ///  drop the tree, so the next listing happens under the new branch.
    pub fn switch_branch(&self, project: &Project, branch_name: &str) -> Result<(), CacheError> {
        let mut state = project.0.state.write();
        let branch_id = state
            .branches
            .as_ref()
            .and_then(|branches| branches.iter().find(|b| b.name == branch_name))
            .map(|branch| branch.id.clone())
            .ok_or_else(|| CacheError::BranchNotFound {
                project: project.name().to_string(),
                branch: branch_name.to_string(),
            })?;

        state.selected_branch = Some(branch_id);
        state.drop_tree();
        tracing::info!(project = project.name(), branch = branch_name, "switched branch");
        Ok(())
    }

    /// Install a tree listed while the project was at `generation`.
    ///
    /// Returns false, leaving the cache alone, when the project was
    ///  invalidated or switched branch since.
    pub fn install_tree(&self, project: &Project, generation: u64, tree: AssetTree) -> bool {
        let mut state = project.0.state.write();
        if state.generation != generation {
            return false;
        }
        state.tree = Some(tree);
        true
    }

    /// Drop a project's tree so the next access lists it again
    pub fn invalidate(&self, project: &Project) {
        project.0.state.write().drop_tree();
    }

    /// Merge fresh remote metadata into a cached node, optionally
    ///  replacing its cached content. Returns false if the node is not
    ///  cached.
    pub fn merge_asset(&self, project: &Project, record: &AssetRecord, content: Option<Bytes>) -> bool {
        let mut state = project.0.state.write();
        let Some(tree) = state.tree.as_mut() else {
            return false;
        };
        if !tree.merge_record(record) {
            return false;
        }
        if let Some(content) = content {
            tree.set_content(record.id, content);
        }
        true
    }

    /// Cache fetched content on a file node, provided the node still
    ///  describes the same remote content (`hash`).
    pub fn cache_content(&self, project: &Project, id: AssetId, hash: &str, content: Bytes) -> bool {
        let mut state = project.0.state.write();
        let Some(tree) = state.tree.as_mut() else {
            return false;
        };
        let current = tree
            .get(id)
            .and_then(|node| node.as_file())
            .map(|file| file.hash == hash);
        current == Some(true) && tree.set_content(id, content)
    }
}
