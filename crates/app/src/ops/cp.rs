use clap::Args;

use common::prelude::FsError;

use super::absolute;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Cp {
    /// Asset (file or folder) to copy
    pub from: String,

    /// Destination path in another project
    pub to: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CpError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("cp failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Cp {
    type Error = CpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let (from, to) = (absolute(&self.from), absolute(&self.to));
        session.fs.copy(&from, &to).await?;
        Ok(format!("copied {} -> {}", from, to))
    }
}
