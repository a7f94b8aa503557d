//! Capabilities supplied by whatever hosts the filesystem
//!
//! The library never prompts, persists or authenticates on its own. A
//! host (the CLI, an editor integration, a test) hands in:
//!
//! - **[`WorkspaceStore`]**: which projects are open and the branch last
//!   selected for each
//! - **[`ConfirmationPrompt`]**: a yes/no question for destructive operations
//! - **[`CredentialProvider`]**: the access token used by a transport

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::remote::RemoteError;

/// Branch assumed for a project with no stored selection
pub const DEFAULT_BRANCH: &str = "main";

/// Per-workspace state persisted by the host
pub trait WorkspaceStore: Send + Sync + Debug {
    /// Names of the projects open in the workspace
    fn open_projects(&self) -> Vec<String>;

    /// Last branch selected for a project, if any was stored
    fn branch(&self, project: &str) -> Option<String>;

    fn set_branch(&self, project: &str, branch: &str) -> anyhow::Result<()>;

    fn branch_or_default(&self, project: &str) -> String {
        self.branch(project)
            .unwrap_or_else(|| DEFAULT_BRANCH.to_string())
    }
}

#[derive(Debug, Default)]
pub struct MemoryWorkspace {
    inner: RwLock<MemoryWorkspaceInner>,
}

#[derive(Debug, Default)]
struct MemoryWorkspaceInner {
    open: Vec<String>,
    branches: BTreeMap<String, String>,
}

impl MemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_open_projects<I, S>(projects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let workspace = Self::default();
        workspace.inner.write().open = projects.into_iter().map(Into::into).collect();
        workspace
    }

    pub fn open(&self, project: &str) {
        let mut inner = self.inner.write();
        if !inner.open.iter().any(|open| open == project) {
            inner.open.push(project.to_string());
        }
    }
}

impl WorkspaceStore for MemoryWorkspace {
    fn open_projects(&self) -> Vec<String> {
        self.inner.read().open.clone()
    }

    fn branch(&self, project: &str) -> Option<String> {
        self.inner.read().branches.get(project).cloned()
    }

    fn set_branch(&self, project: &str, branch: &str) -> anyhow::Result<()> {
        self.inner
            .write()
            .branches
            .insert(project.to_string(), branch.to_string());
        Ok(())
    }
}

/// Asks the user to confirm an operation
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync + Debug {
    async fn confirm(&self, message: &str) -> bool;
}

/// Answers every prompt with the same answer
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Default for AutoConfirm {
    fn default() -> Self {
        Self(true)
    }
}

#[async_trait]
impl ConfirmationPrompt for AutoConfirm {
    async fn confirm(&self, message: &str) -> bool {
        tracing::debug!(message, answer = self.0, "auto-answered confirmation");
        self.0
    }
}

/// Supplies the access token for remote calls
#[async_trait]
pub trait CredentialProvider: Send + Sync + Debug {
    async fn token(&self) -> Result<String, RemoteError>;

    /// Forget a token the remote rejected
    fn invalidate(&self);
}

/// A fixed token, rejected for good once invalidated
#[derive(Debug)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn token(&self) -> Result<String, RemoteError> {
        self.token
            .read()
            .clone()
            .ok_or_else(|| RemoteError::Unauthorized("no access token available".to_string()))
    }

    fn invalidate(&self) {
        self.token.write().take();
    }
}
