use clap::Args;

use common::prelude::{FsError, SearchHit};

use super::absolute;
use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Search {
    /// Regular expression, matched case-insensitively per line
    pub pattern: String,

    /// File or folder to search (defaults to every open project)
    pub scope: Option<String>,

    /// Print one JSON object per hit
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("search failed: {0}")]
    Fs(#[from] FsError),
    #[error("failed to encode hit: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Search {
    type Error = SearchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let scope = self.scope.as_deref().map(absolute);
        let hits = session.fs.search(&self.pattern, scope.as_deref()).await?;

        if self.json {
            let lines = hits
                .iter()
                .map(serde_json::to_string)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(lines.join("\n"));
        }

        if hits.is_empty() {
            return Ok("no matches".to_string());
        }
        Ok(hits.iter().map(render).collect::<Vec<_>>().join("\n"))
    }
}

fn render(hit: &SearchHit) -> String {
    format!("{}:{}: {}", hit.path, hit.line, hit.preview)
}
