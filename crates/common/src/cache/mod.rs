//! Local cache of the remote hierarchy
//!
//! - **[`ProjectCache`]**: the session's project list, the single owner of
//!   every cached tree
//! - **[`Project`]**: a shared handle to one project, its branch selection
//!   and its lazily listed [`AssetTree`]
//! - **[`AssetTree`]**: an id-indexed arena of [`Node`]s rebuilt from a flat
//!   asset listing

mod node;
mod project;
mod tree;

pub use node::{Directory, FileAsset, FileType, Node, NodeKind};
pub use project::{CacheError, Project, ProjectCache};
pub use tree::{AssetTree, TreeError};
