use std::collections::BTreeMap;
use std::{fs, path::PathBuf};

use common::prelude::{FsConfig, WorkspaceStore};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "assetfs";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const WORKSPACE_FILE_NAME: &str = "workspace.json";

pub const DEFAULT_API_URL: &str = "https://playcanvas.com/api/";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the remote asset API
    #[serde(default = "default_api_url")]
    pub api_url: Url,
    /// Access token; the ASSETFS_TOKEN environment variable takes precedence
    #[serde(default)]
    pub access_token: Option<String>,
    /// Default log directive, overridable through RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Write daily log files here when set
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub fs: FsConfig,
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("hardcoded URL must parse")
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            access_token: None,
            log_level: default_log_level(),
            log_dir: None,
            fs: FsConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the assetfs directory (~/.assetfs)
    pub app_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Path to the persisted workspace state
    pub workspace_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the assetfs directory path (custom or default ~/.assetfs)
    pub fn app_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new assetfs state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if app_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&app_dir)?;

        let config = config.unwrap_or_default();
        let config_path = app_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        let workspace_path = app_dir.join(WORKSPACE_FILE_NAME);
        let workspace = serde_json::to_string_pretty(&WorkspaceFile::default())?;
        fs::write(&workspace_path, workspace)?;

        Ok(Self {
            app_dir,
            config_path,
            workspace_path,
            config,
        })
    }

    /// Load existing state from the assetfs directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let app_dir = Self::app_dir(custom_path)?;

        if !app_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = app_dir.join(CONFIG_FILE_NAME);
        let workspace_path = app_dir.join(WORKSPACE_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            app_dir,
            config_path,
            workspace_path,
            config,
        })
    }

    /// Open the persisted workspace (an absent file is an empty workspace)
    pub fn workspace(&self) -> Result<FileWorkspace, StateError> {
        FileWorkspace::open(self.workspace_path.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct WorkspaceFile {
    #[serde(default)]
    open_projects: Vec<String>,
    #[serde(default)]
    branches: BTreeMap<String, String>,
}

/// Workspace state kept in `workspace.json`, written through on every change
#[derive(Debug)]
pub struct FileWorkspace {
    path: PathBuf,
    state: RwLock<WorkspaceFile>,
}

impl FileWorkspace {
    pub fn open(path: PathBuf) -> Result<Self, StateError> {
        let state = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            WorkspaceFile::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Add a project to the open set; returns false if it was already open
    pub fn open_project(&self, project: &str) -> Result<bool, StateError> {
        self.update(|state| {
            if state.open_projects.iter().any(|open| open == project) {
                return false;
            }
            state.open_projects.push(project.to_string());
            true
        })
    }

    /// Remove a project from the open set; returns false if it was not open
    pub fn close_project(&self, project: &str) -> Result<bool, StateError> {
        self.update(|state| {
            let before = state.open_projects.len();
            state.open_projects.retain(|open| open != project);
            state.open_projects.len() != before
        })
    }

    /// Apply `change` to a copy of the state and write it out; memory only
    ///  takes the new state once the file does. `change` reports whether
    ///  anything changed.
    fn update(&self, change: impl FnOnce(&mut WorkspaceFile) -> bool) -> Result<bool, StateError> {
        let mut state = self.state.write();
        let mut next = state.clone();
        if !change(&mut next) {
            return Ok(false);
        }
        fs::write(&self.path, serde_json::to_string_pretty(&next)?)?;
        *state = next;
        Ok(true)
    }
}

impl WorkspaceStore for FileWorkspace {
    fn open_projects(&self) -> Vec<String> {
        self.state.read().open_projects.clone()
    }

    fn branch(&self, project: &str) -> Option<String> {
        self.state.read().branches.get(project).cloned()
    }

    fn set_branch(&self, project: &str, branch: &str) -> anyhow::Result<()> {
        self.update(|state| {
            state
                .branches
                .insert(project.to_string(), branch.to_string())
                .as_deref()
                != Some(branch)
        })?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("assetfs directory not initialized. Run 'assetfs init' first")]
    NotInitialized,

    #[error("assetfs directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("workspace file error: {0}")]
    Json(#[from] serde_json::Error),
}
