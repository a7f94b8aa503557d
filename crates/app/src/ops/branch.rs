use clap::Args;

use common::prelude::FsError;

use crate::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Branch {
    /// Project name
    pub project: String,

    /// Branch to switch to; prints the selected branch when omitted
    pub name: Option<String>,

    /// List the project's branches
    #[arg(short, long, conflicts_with = "name")]
    pub list: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BranchError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("branch failed: {0}")]
    Fs(#[from] FsError),
}

#[async_trait::async_trait]
impl crate::op::Op for Branch {
    type Error = BranchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let fs = &ctx.session().await?.fs;

        if let Some(name) = &self.name {
            fs.switch_branch(&self.project, name).await?;
            return Ok(format!("switched {} to branch {}", self.project, name));
        }

        let current = fs.branch_name(&self.project).await?;
        if !self.list {
            return Ok(current);
        }

        let lines: Vec<String> = fs
            .branches(&self.project)
            .await?
            .into_iter()
            .map(|branch| {
                let marker = if branch.name == current { "*" } else { " " };
                format!("{} {}", marker, branch.name)
            })
            .collect();
        Ok(lines.join("\n"))
    }
}
