/**
 * Local cache of the remote hierarchy:
 *  projects, their branches and lazily
 *  listed asset trees.
 */
pub mod cache;
/**
 * The filesystem facade hosts mount.
 *  Composes the cache, the resolver and
 *  the conflict detector.
 */
pub mod fs;
/**
 * Capabilities a host hands in: workspace
 *  state, confirmations and credentials.
 */
pub mod host;
/**
 * Parsing of `/<project>[:<branch>]/...`
 *  paths and local resolution against
 *  the cache.
 */
pub mod path;
/**
 * Contract of the remote asset service,
 *  plus an in-memory implementation.
 */
pub mod remote;
/**
 * Content hashing and optimistic
 *  concurrency checks for uploads.
 */
pub mod sync;

pub mod prelude {
    pub use crate::cache::{FileType, Project, ProjectCache};
    pub use crate::fs::{AssetFs, FileStat, FsConfig, FsError, SearchHit};
    pub use crate::host::{
        AutoConfirm, ConfirmationPrompt, CredentialProvider, MemoryWorkspace, StaticCredentials,
        WorkspaceStore, DEFAULT_BRANCH,
    };
    pub use crate::path::ProjectPath;
    pub use crate::remote::{MemoryAssetService, RemoteAssetService, RemoteError};
}
