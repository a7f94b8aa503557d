use clap::Args;

use common::prelude::FsError;

use super::absolute;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Mv {
    /// Asset to move or rename
    pub from: String,

    /// New path, in the same project
    pub to: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MvError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("mv failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Mv {
    type Error = MvError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let (from, to) = (absolute(&self.from), absolute(&self.to));
        session.fs.rename(&from, &to).await?;
        Ok(format!("moved {} -> {}", from, to))
    }
}
