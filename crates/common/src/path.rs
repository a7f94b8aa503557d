//! Path addressing
//!
//! Every path has the form `/<project>[:<branch>]/<segment>/.../<leaf>`.
//! The first segment names a project (the branch qualifier is display
//! only); the rest walk cached directory nodes by name.
//!
//! Resolution is purely local: the [`Resolver`] never calls the remote and
//! expects the owning project's tree to be loaded already.

use std::fmt;

use crate::cache::{Node, Project, ProjectCache};
use crate::remote::AssetId;

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("asset not found: {0}")]
    AssetNotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    /// The project was resolved before its tree was loaded
    #[error("assets of project {0} are not loaded")]
    NotLoaded(String),
    /// An intermediate folder is missing from a loaded tree
    #[error("missing segment '{segment}' while resolving {path}")]
    MissingSegment { segment: String, path: String },
}

impl PathError {
    /// Errors that point at cache ordering bugs rather than at absent
    ///  remote state
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::NotLoaded(_) | Self::MissingSegment { .. })
    }
}

/// A parsed project path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectPath {
    project: String,
    branch: Option<String>,
    segments: Vec<String>,
}

impl ProjectPath {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| PathError::InvalidPath(path.to_string()))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        let mut parts = rest.split('/');
        let head = parts.next().unwrap_or_default();
        let segments: Vec<String> = parts.map(str::to_string).collect();
        if head.is_empty() || segments.iter().any(String::is_empty) {
            return Err(PathError::InvalidPath(path.to_string()));
        }

        let (project, branch) = match head.split_once(':') {
            Some((project, branch)) if !project.is_empty() && !branch.is_empty() => {
                (project.to_string(), Some(branch.to_string()))
            }
            Some(_) => return Err(PathError::InvalidPath(path.to_string())),
            None => (head.to_string(), None),
        };

        Ok(Self {
            project,
            branch,
            segments,
        })
    }

    /* Getters */

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Branch qualifier, if the path carried one
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Asset names below the project, outermost first
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the path denotes the project itself
    pub fn is_project_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn leaf_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The containing path; the project root is its own parent
    pub fn parent(&self) -> Self {
        let mut parent = self.clone();
        parent.segments.pop();
        parent
    }

    pub fn join(&self, name: &str) -> Self {
        let mut child = self.clone();
        child.segments.push(name.to_string());
        child
    }

    /// Whether any segment is one of `names`
    pub fn contains_any(&self, names: &[String]) -> bool {
        self.segments.iter().any(|segment| names.contains(segment))
    }
}

impl fmt::Display for ProjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.project)?;
        if let Some(branch) = &self.branch {
            write!(f, ":{branch}")?;
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Resolves parsed paths against the project cache
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    cache: &'a ProjectCache,
}

impl<'a> Resolver<'a> {
    pub fn new(cache: &'a ProjectCache) -> Self {
        Self { cache }
    }

    pub fn resolve_project(&self, path: &ProjectPath) -> Result<Project, PathError> {
        self.cache
            .get_by_name(path.project())
            .ok_or_else(|| PathError::ProjectNotFound(path.project().to_string()))
    }

    /// Look a path up, treating any missing segment as plain absence.
    ///
    /// The project root resolves to `None` as well; callers check for
    ///  it first.
    pub fn lookup(&self, project: &Project, path: &ProjectPath) -> Result<Option<Node>, PathError> {
        project
            .with_tree(|tree| {
                let mut parent: Option<AssetId> = None;
                let mut node = None;
                for segment in path.segments() {
                    let Some(child) = tree.child(parent, segment) else {
                        return None;
                    };
                    parent = Some(child.id);
                    node = Some(child);
                }
                node.cloned()
            })
            .ok_or_else(|| PathError::NotLoaded(project.name().to_string()))
    }

    /// Resolve an asset path, requiring every intermediate folder to be
    ///  cached.
    pub fn resolve_asset(&self, project: &Project, path: &ProjectPath) -> Result<Node, PathError> {
        let Some((leaf, intermediate)) = path.segments().split_last() else {
            return Err(PathError::InvalidPath(format!(
                "{path} is a project, not an asset"
            )));
        };

        project
            .with_tree(|tree| {
                let mut parent: Option<AssetId> = None;
                for segment in intermediate {
                    let child = tree.child(parent, segment).ok_or_else(|| {
                        PathError::MissingSegment {
                            segment: segment.clone(),
                            path: path.to_string(),
                        }
                    })?;
                    if !child.is_dir() {
                        return Err(PathError::NotADirectory(path.to_string()));
                    }
                    parent = Some(child.id);
                }
                tree.child(parent, leaf)
                    .cloned()
                    .ok_or_else(|| PathError::AssetNotFound(path.to_string()))
            })
            .ok_or_else(|| PathError::NotLoaded(project.name().to_string()))?
    }

    /// The folder a path denotes: the asset itself when it is a folder,
    ///  otherwise its parent. `None` is the project root.
    pub fn resolve_folder(
        &self,
        project: &Project,
        path: &ProjectPath,
    ) -> Result<Option<AssetId>, PathError> {
        if path.is_project_root() {
            return Ok(None);
        }
        let node = self.resolve_asset(project, path)?;
        Ok(if node.is_dir() { Some(node.id) } else { node.parent })
    }

    /// The folder that contains a path. `None` is the project root.
    pub fn resolve_parent(
        &self,
        project: &Project,
        path: &ProjectPath,
    ) -> Result<Option<AssetId>, PathError> {
        let parent = path.parent();
        if parent.is_project_root() {
            return Ok(None);
        }
        let node = self.resolve_asset(project, &parent)?;
        if !node.is_dir() {
            return Err(PathError::NotADirectory(parent.to_string()));
        }
        Ok(Some(node.id))
    }
}
