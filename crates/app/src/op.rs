use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use url::Url;

use common::prelude::{AssetFs, AutoConfirm, ConfirmationPrompt, WorkspaceStore};

use crate::client::{ApiError, ConfiguredCredentials, HttpAssetService};
use crate::state::{AppState, FileWorkspace, StateError};

/// Everything an op needs against the remote: loaded on first use
#[derive(Debug)]
pub struct Session {
    pub workspace: Arc<FileWorkspace>,
    pub fs: AssetFs<HttpAssetService>,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to create API client: {0}")]
    Api(#[from] ApiError),
}

#[derive(Debug)]
pub struct OpContext {
    /// Optional custom config path (defaults to ~/.assetfs)
    pub config_path: Option<PathBuf>,
    /// Overrides the configured API URL
    pub remote: Option<Url>,
    /// Answer every confirmation with yes
    pub assume_yes: bool,
    session: OnceCell<Session>,
}

impl OpContext {
    pub fn new(remote: Option<Url>, config_path: Option<PathBuf>, assume_yes: bool) -> Self {
        Self {
            config_path,
            remote,
            assume_yes,
            session: OnceCell::new(),
        }
    }

    /// Load state and build the filesystem, once per invocation
    pub async fn session(&self) -> Result<&Session, SessionError> {
        self.session
            .get_or_try_init(|| async { self.open_session() })
            .await
    }

    fn open_session(&self) -> Result<Session, SessionError> {
        let state = AppState::load(self.config_path.clone())?;
        let workspace = Arc::new(state.workspace()?);

        let remote = self
            .remote
            .clone()
            .unwrap_or_else(|| state.config.api_url.clone());
        let credentials = Arc::new(ConfiguredCredentials::from_env_or(
            state.config.access_token.clone(),
        ));
        let service = HttpAssetService::new(&remote, credentials)?;
        tracing::debug!(remote = %service.base_url(), "opened session");

        let prompt: Arc<dyn ConfirmationPrompt> = if self.assume_yes {
            Arc::new(AutoConfirm(true))
        } else {
            Arc::new(TerminalPrompt)
        };

        let fs = AssetFs::builder(service)
            .workspace(workspace.clone() as Arc<dyn WorkspaceStore>)
            .prompt(prompt)
            .config(state.config.fs.clone())
            .build();

        Ok(Session {
            workspace,
            fs,
        })
    }
}

/// Asks on the terminal; anything but an explicit yes declines
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait]
impl ConfirmationPrompt for TerminalPrompt {
    async fn confirm(&self, message: &str) -> bool {
        let message = message.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            dialoguer::Confirm::new()
                .with_prompt(message)
                .default(false)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(confirmed)) => confirmed,
            Ok(Err(e)) => {
                tracing::warn!("failed to get user input: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("confirmation prompt failed: {}", e);
                false
            }
        }
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::state::AppConfig;

    #[tokio::test]
    async fn test_session_requires_init() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = OpContext::new(None, Some(dir.path().join("none")), true);

        let result = ctx.session().await;
        assert!(matches!(
            result,
            Err(SessionError::State(StateError::NotInitialized))
        ));
    }

    #[tokio::test]
    async fn test_session_prefers_remote_flag() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("state");
        AppState::init(Some(app_dir.clone()), Some(AppConfig::default())).unwrap();

        let remote = Url::parse("http://localhost:9999/api").unwrap();
        let ctx = OpContext::new(Some(remote), Some(app_dir), true);

        let session = ctx.session().await.unwrap();
        assert_eq!(
            session.fs.service().base_url().as_str(),
            "http://localhost:9999/api/"
        );
        // built once
        let again = ctx.session().await.unwrap();
        assert!(std::ptr::eq(session, again));
    }
}
