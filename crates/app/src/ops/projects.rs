use clap::Args;

use common::prelude::{FsError, WorkspaceStore, DEFAULT_BRANCH};

use crate::op::SessionError;
use crate::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Projects {
    /// Add a project to the workspace, so it is preloaded and searched
    #[arg(long, value_name = "PROJECT")]
    pub open: Option<String>,

    /// Remove a project from the workspace
    #[arg(long, value_name = "PROJECT", conflicts_with = "open")]
    pub close: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProjectsError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("projects failed: {0}")]
    Fs(#[from] FsError),
    #[error("failed to update workspace: {0}")]
    Workspace(#[from] StateError),
    #[error("no project named {0}")]
    UnknownProject(String),
}

#[async_trait::async_trait]
impl crate::op::Op for Projects {
    type Error = ProjectsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;

        if let Some(name) = &self.close {
            return Ok(if session.workspace.close_project(name)? {
                format!("closed {}", name)
            } else {
                format!("{} was not open", name)
            });
        }

        let projects = session.fs.projects().await?;

        if let Some(name) = &self.open {
            let known = session.fs.cache().get_by_name(name).is_some();
            if !known {
                return Err(ProjectsError::UnknownProject(name.clone()));
            }
            return Ok(if session.workspace.open_project(name)? {
                format!("opened {}", name)
            } else {
                format!("{} is already open", name)
            });
        }

        let open = session.workspace.open_projects();
        let lines: Vec<String> = projects
            .iter()
            .map(|project| {
                let is_open = open
                    .iter()
                    .any(|entry| entry.split(':').next() == Some(project.name()));
                let marker = if is_open { "*" } else { " " };
                let branch = project
                    .selected_branch_name()
                    .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
                format!("{} {} (id {}) [{}]", marker, project.name(), project.id(), branch)
            })
            .collect();

        if lines.is_empty() {
            return Ok("no projects".to_string());
        }
        Ok(lines.join("\n"))
    }
}
