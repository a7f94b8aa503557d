use clap::Args;

use common::prelude::FsError;

use super::absolute;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Pull {
    /// Any path inside the project to reload
    #[arg(required_unless_present = "all")]
    pub path: Option<String>,

    /// Forget everything cached and sync the whole account again
    #[arg(long, conflicts_with = "path")]
    pub all: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PullError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("pull failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Pull {
    type Error = PullError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = &ctx.session().await?.fs;

        match &self.path {
            Some(path) => {
                let path = absolute(path);
                fs.pull_latest(&path).await?;
                Ok(format!("pulled latest assets for {}", path))
            }
            None => {
                fs.refresh(true);
                let projects = fs.projects().await?;
                Ok(format!("synced {} project(s)", projects.len()))
            }
        }
    }
}
