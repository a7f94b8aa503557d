use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 1000;
pub const DEFAULT_PREVIEW_WIDTH: usize = 80;

/// Tunables of the filesystem facade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    /// Search stops once this many matches were collected
    pub max_search_results: usize,
    /// Matched lines longer than this are cut and marked with `...`
    pub preview_width: usize,
    /// Path segments that never exist remotely (editor and VCS probes)
    pub ignored_segments: Vec<String>,
    /// Prepended to script assets on read, stripped again on write
    pub script_preamble: Option<String>,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            ignored_segments: [
                ".vscode",
                ".git",
                ".devcontainer",
                "node_modules",
                "pom.xml",
                "AndroidManifest.xml",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            script_preamble: None,
        }
    }
}

impl FsConfig {
    /// Whether `name` gets the script preamble
    pub fn is_script(name: &str) -> bool {
        name.ends_with(".js") || name.ends_with(".mjs")
    }
}
