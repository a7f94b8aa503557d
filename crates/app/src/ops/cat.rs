use clap::Args;

use common::prelude::FsError;

use super::absolute;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Cat {
    /// File to print
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("cat failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Cat {
    type Error = CatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let data = session.fs.read_file(&absolute(&self.path)).await?;

        // the output is printed with its own trailing newline
        let text = String::from_utf8_lossy(&data);
        Ok(text.strip_suffix('\n').unwrap_or(&text).to_string())
    }
}
