use clap::Args;
use url::Url;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Asset API base URL
    #[arg(long)]
    pub api_url: Option<Url>,

    /// Access token to store in the config (ASSETFS_TOKEN overrides it)
    #[arg(long)]
    pub access_token: Option<String>,

    /// Default log level (RUST_LOG overrides it)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Projects to open in the workspace
    #[arg(long = "open", value_name = "PROJECT")]
    pub open: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig {
            access_token: self.access_token.clone(),
            log_level: self.log_level.clone(),
            ..AppConfig::default()
        };
        if let Some(api_url) = self.api_url.clone().or_else(|| ctx.remote.clone()) {
            config.api_url = api_url;
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let workspace = state.workspace()?;
        for project in &self.open {
            workspace.open_project(project)?;
        }

        let open = if self.open.is_empty() {
            "none".to_string()
        } else {
            self.open.join(", ")
        };

        let output = format!(
            "Initialized assetfs directory at: {}\n\
             - Config: {}\n\
             - Workspace: {}\n\
             - API URL: {}\n\
             - Access token: {}\n\
             - Open projects: {}",
            state.app_dir.display(),
            state.config_path.display(),
            state.workspace_path.display(),
            state.config.api_url,
            if state.config.access_token.is_some() {
                "stored"
            } else {
                "not set"
            },
            open
        );

        Ok(output)
    }
}
