use clap::Args;

use common::prelude::{FileType, FsError};

use super::{absolute, format_millis};
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Stat {
    /// Path to inspect
    pub path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StatError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("stat failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Stat {
    type Error = StatError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let path = absolute(&self.path);
        let stat = session.fs.stat(&path).await?;

        let kind = match stat.file_type {
            FileType::Directory => "directory",
            FileType::File => "file",
        };

        Ok(format!(
            "path: {}\ntype: {}\nsize: {}\ncreated: {}\nmodified: {}",
            path,
            kind,
            stat.size,
            format_millis(stat.created),
            format_millis(stat.modified)
        ))
    }
}
