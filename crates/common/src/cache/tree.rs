use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;

use crate::remote::{AssetId, AssetRecord};

use super::node::{FileType, Node, NodeKind};

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("asset {0} is listed more than once")]
    DuplicateId(AssetId),
    #[error("asset {0} is its own ancestor")]
    Cycle(AssetId),
}

/// The hierarchy of one project branch, rebuilt from a flat listing.
///
/// Nodes live in an arena indexed by remote id; directories only hold
///  child ids, so a node is stored exactly once however it is reached.
#[derive(Debug, Clone, Default)]
pub struct AssetTree {
    nodes: HashMap<AssetId, Node>,
    root: BTreeMap<String, AssetId>,
}

impl AssetTree {
    /// Link a flat record list into a tree.
    ///
    /// Records whose parent is missing from the listing, or is a file,
    ///  are skipped along with the assets below them. A parent chain that
    ///  loops back on itself fails the whole build.
    pub fn build(records: &[AssetRecord]) -> Result<Self, TreeError> {
        let mut nodes = HashMap::with_capacity(records.len());
        for record in records {
            if nodes.insert(record.id, Node::from_record(record)).is_some() {
                return Err(TreeError::DuplicateId(record.id));
            }
        }

        detect_cycles(&nodes)?;

        // link in id order so name collisions resolve the same way every time
        let mut ids: Vec<AssetId> = nodes.keys().copied().collect();
        ids.sort_unstable();

        let mut root = BTreeMap::new();
        for id in ids {
            let Some(node) = nodes.get(&id) else {
                continue;
            };
            let name = node.name.clone();
            let slot = match node.parent {
                None => &mut root,
                Some(parent_id) => match nodes.get_mut(&parent_id) {
                    Some(Node {
                        kind: NodeKind::Directory(dir),
                        ..
                    }) => &mut dir.children,
                    Some(_) => {
                        tracing::warn!(asset_id = id, parent_id, "skipping asset whose parent is a file");
                        continue;
                    }
                    None => {
                        tracing::warn!(asset_id = id, parent_id, "skipping orphaned asset");
                        continue;
                    }
                },
            };
            if let Some(shadowed) = slot.insert(name.clone(), id) {
                tracing::warn!(asset_id = id, shadowed, name = %name, "asset name collision");
            }
        }

        Ok(Self { nodes, root })
    }

    /* Getters */

    pub fn get(&self, id: AssetId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Children of a directory, or of the project root when `parent` is `None`
    pub fn children(&self, parent: Option<AssetId>) -> Option<&BTreeMap<String, AssetId>> {
        match parent {
            None => Some(&self.root),
            Some(id) => self.get(id)?.as_dir().map(|dir| &dir.children),
        }
    }

    pub fn child(&self, parent: Option<AssetId>, name: &str) -> Option<&Node> {
        let id = self.children(parent)?.get(name)?;
        self.get(*id)
    }

    /// Immediate children as (name, type) pairs, ordered by name
    pub fn entries(&self, parent: Option<AssetId>) -> Vec<(String, FileType)> {
        self.children(parent)
            .map(|children| {
                children
                    .iter()
                    .filter_map(|(name, id)| Some((name.clone(), self.get(*id)?.file_type())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /* Mutations */

    /// Overwrite a node's top-level fields with fresh remote metadata,
    ///  re-keying it under its (possibly new) name and parent.
    ///
    /// Returns false when the asset is not part of this tree.
    pub(crate) fn merge_record(&mut self, record: &AssetRecord) -> bool {
        let Some(node) = self.nodes.get_mut(&record.id) else {
            return false;
        };
        let (old_name, old_parent) = (node.name.clone(), node.parent);
        node.merge_record(record);
        let (new_name, new_parent) = (node.name.clone(), node.parent);

        if old_name != new_name || old_parent != new_parent {
            if let Some(children) = self.children_mut(old_parent) {
                if children.get(&old_name) == Some(&record.id) {
                    children.remove(&old_name);
                }
            }
            if let Some(children) = self.children_mut(new_parent) {
                children.insert(new_name, record.id);
            }
        }
        true
    }

    /// Cache file content on a node. Returns false for missing or
    ///  directory nodes.
    pub(crate) fn set_content(&mut self, id: AssetId, content: Bytes) -> bool {
        match self.nodes.get_mut(&id) {
            Some(Node {
                kind: NodeKind::File(file),
                ..
            }) => {
                file.content = Some(content);
                true
            }
            _ => false,
        }
    }

    fn children_mut(&mut self, parent: Option<AssetId>) -> Option<&mut BTreeMap<String, AssetId>> {
        match parent {
            None => Some(&mut self.root),
            Some(id) => match &mut self.nodes.get_mut(&id)?.kind {
                NodeKind::Directory(dir) => Some(&mut dir.children),
                NodeKind::File(_) => None,
            },
        }
    }
}

/// Walk every parent chain once, failing on the first one that revisits
///  a node of the same walk.
fn detect_cycles(nodes: &HashMap<AssetId, Node>) -> Result<(), TreeError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        OnPath,
        Done,
    }

    let mut marks: HashMap<AssetId, Mark> = HashMap::with_capacity(nodes.len());
    for &start in nodes.keys() {
        let mut path = Vec::new();
        let mut cursor = Some(start);
        while let Some(id) = cursor {
            match marks.get(&id) {
                Some(Mark::Done) => break,
                Some(Mark::OnPath) => return Err(TreeError::Cycle(id)),
                None => {}
            }
            let Some(node) = nodes.get(&id) else {
                break;
            };
            marks.insert(id, Mark::OnPath);
            path.push(id);
            cursor = node.parent;
        }
        for id in path {
            marks.insert(id, Mark::Done);
        }
    }
    Ok(())
}
