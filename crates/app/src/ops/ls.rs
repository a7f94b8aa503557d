use clap::Args;

use common::prelude::{FileType, FsError};

use super::{absolute, format_millis};
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Directory to list, e.g. /Game/scripts
    pub path: String,

    /// Show size and modification time
    #[arg(short, long)]
    pub long: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("ls failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = &ctx.session().await?.fs;
        let path = absolute(&self.path);
        let entries = fs.read_directory(&path).await?;

        let mut lines = Vec::with_capacity(entries.len());
        for (name, file_type) in entries {
            let display = match file_type {
                FileType::Directory => format!("{name}/"),
                FileType::File => name.clone(),
            };
            if !self.long {
                lines.push(display);
                continue;
            }

            let stat = fs.stat(&format!("{}/{}", path.trim_end_matches('/'), name)).await?;
            lines.push(format!(
                "{:>10}  {}  {}",
                stat.size,
                format_millis(stat.modified),
                display
            ));
        }

        Ok(lines.join("\n"))
    }
}
