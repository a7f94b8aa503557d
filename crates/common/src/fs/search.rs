use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::cache::FileType;
use crate::path::ProjectPath;
use crate::remote::RemoteAssetService;

use super::{AssetFs, FsError};

/// One matching line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub path: String,
    /// 1-based
    pub line: usize,
    /// The matching line, cut to the preview width
    pub preview: String,
}

impl<S: RemoteAssetService> AssetFs<S> {
    /// Case-insensitive regex search over file contents.
    ///
    /// `scope` is a folder (or file) path; without one every open project
    ///  of the workspace is searched. Results come in depth-first,
    ///  name-ordered traversal order and stop at the configured maximum.
    pub async fn search(&self, pattern: &str, scope: Option<&str>) -> Result<Vec<SearchHit>, FsError> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;

        let roots = match scope {
            Some(scope) => vec![ProjectPath::parse(scope)?],
            None => {
                self.projects().await?;
                self.inner
                    .workspace
                    .open_projects()
                    .iter()
                    .map(|name| ProjectPath::parse(&format!("/{name}")))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let mut hits = Vec::new();
        for root in roots {
            if hits.len() >= self.inner.config.max_search_results {
                break;
            }
            let file_type = self.stat(&root.to_string()).await?.file_type;
            self.search_from(&regex, root, file_type, &mut hits).await?;
        }

        tracing::debug!(pattern, hits = hits.len(), "search finished");
        Ok(hits)
    }

    async fn search_from(
        &self,
        regex: &Regex,
        root: ProjectPath,
        file_type: FileType,
        hits: &mut Vec<SearchHit>,
    ) -> Result<(), FsError> {
        let max = self.inner.config.max_search_results;
        let ignored = &self.inner.config.ignored_segments;

        let mut stack = vec![(root, file_type)];
        while let Some((path, file_type)) = stack.pop() {
            if hits.len() >= max {
                break;
            }
            let path_str = path.to_string();
            match file_type {
                FileType::Directory => {
                    let entries = self.read_directory(&path_str).await?;
                    // reversed so the stack pops children in name order
                    stack.extend(
                        entries
                            .into_iter()
                            .rev()
                            .filter(|(name, _)| !ignored.contains(name))
                            .map(|(name, file_type)| (path.join(&name), file_type)),
                    );
                }
                FileType::File => {
                    let content = self.read_file(&path_str).await?;
                    let text = String::from_utf8_lossy(&content);
                    for (index, line) in text.split('\n').enumerate() {
                        let line = line.strip_suffix('\r').unwrap_or(line);
                        if regex.is_match(line) {
                            hits.push(SearchHit {
                                path: path_str.clone(),
                                line: index + 1,
                                preview: preview(line, self.inner.config.preview_width),
                            });
                            if hits.len() >= max {
                                break;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// Cut a line to `width` characters, marking the cut with `...`
fn preview(line: &str, width: usize) -> String {
    match line.char_indices().nth(width) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_keeps_short_lines() {
        assert_eq!(preview("let x = 1;", 80), "let x = 1;");
        let exact = "a".repeat(80);
        assert_eq!(preview(&exact, 80), exact);
    }

    #[test]
    fn test_preview_cuts_long_lines() {
        let long = "b".repeat(100);
        let cut = preview(&long, 80);
        assert_eq!(cut.len(), 83);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_preview_counts_characters() {
        let wide = "é".repeat(10);
        assert_eq!(preview(&wide, 4), "éééé...");
    }
}
