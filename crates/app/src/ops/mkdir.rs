use clap::Args;

use common::prelude::FsError;

use super::absolute;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Mkdir {
    /// Folder to create; its parent must exist
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MkdirError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("mkdir failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Mkdir {
    type Error = MkdirError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let path = absolute(&self.path);
        session.fs.create_directory(&path).await?;
        Ok(format!("created {}", path))
    }
}
