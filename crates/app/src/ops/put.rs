use std::path::PathBuf;

use bytes::Bytes;
use clap::Args;
use tokio::io::AsyncReadExt;

use common::prelude::FsError;

use super::absolute;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Put {
    /// Remote file to write
    pub path: String,

    /// Local file to upload (reads stdin when omitted)
    #[arg(long, short)]
    pub from: Option<PathBuf>,

    /// Fail instead of creating a missing file
    #[arg(long)]
    pub no_create: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum PutError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("put failed: {0}")]
    Fs(#[from] FsError),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Put {
    type Error = PutError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let data = match &self.from {
            Some(local) => tokio::fs::read(local).await?,
            None => {
                let mut buf = Vec::new();
                tokio::io::stdin().read_to_end(&mut buf).await?;
                buf
            }
        };
        let size = data.len();

        let session = ctx.session().await?;
        let path = absolute(&self.path);
        session
            .fs
            .write_file(&path, Bytes::from(data), !self.no_create)
            .await?;

        Ok(format!("wrote {} bytes to {}", size, path))
    }
}
