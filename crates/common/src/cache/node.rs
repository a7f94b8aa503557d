use std::collections::BTreeMap;

use bytes::Bytes;

use crate::remote::{AssetId, AssetRecord, RemoteTimestamp};

/**
 * Nodes
 * =====
 * A node is the cached view of one remote asset. The remote hands us a
 *  flat list of records; each record becomes exactly one node, and the
 *  hierarchy lives in the `children` maps of directory nodes, keyed by
 *  the name the remote assigned at listing time.
 * Nodes are discriminated structurally on the remote `folder` type tag:
 *  - Directory: a map of child names to child ids
 *  - File: content metadata plus optionally cached bytes
 */

/// What a path points at, as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Directory,
    File,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    pub children: BTreeMap<String, AssetId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAsset {
    /// Name the content is stored under on the remote
    pub filename: String,
    /// Hex MD5 of the remote content, as last reported
    pub hash: String,
    pub size: u64,
    /// Remote type tag, e.g. `script` or `text`
    pub remote_type: String,
    /// Content fetched on first read, dropped when the node is replaced
    pub content: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory(Directory),
    File(FileAsset),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Remote id, stable for the lifetime of the asset
    pub id: AssetId,
    pub name: String,
    pub parent: Option<AssetId>,
    pub created_at: RemoteTimestamp,
    pub modified_at: RemoteTimestamp,
    pub kind: NodeKind,
}

impl Node {
    pub fn from_record(record: &AssetRecord) -> Self {
        let kind = if record.is_folder() {
            NodeKind::Directory(Directory::default())
        } else {
            // NOTE: some asset types carry no file payload at all; they
            //  still read as (empty) files
            let (filename, hash, size) = match &record.file {
                Some(file) => (file.filename.clone(), file.hash.clone(), file.size),
                None => (record.name.clone(), String::new(), 0),
            };
            NodeKind::File(FileAsset {
                filename,
                hash,
                size,
                remote_type: record.kind.clone(),
                content: None,
            })
        };

        Self {
            id: record.id,
            name: record.display_name().to_string(),
            parent: record.parent,
            created_at: record.created_at.clone(),
            modified_at: record.modified_at.clone(),
            kind,
        }
    }

    /// Shallow merge of fresh remote metadata.
    ///
    /// Top-level fields are overwritten by the record. Directory children
    ///  are kept as they are, and so is a file's cached content unless
    ///  the remote hash no longer matches it.
    pub fn merge_record(&mut self, record: &AssetRecord) {
        let fresh = Node::from_record(record);
        self.name = fresh.name;
        self.parent = fresh.parent;
        self.created_at = fresh.created_at;
        self.modified_at = fresh.modified_at;

        let old = std::mem::replace(&mut self.kind, NodeKind::Directory(Directory::default()));
        self.kind = match (old, fresh.kind) {
            (NodeKind::Directory(dir), NodeKind::Directory(_)) => NodeKind::Directory(dir),
            (NodeKind::File(old), NodeKind::File(mut new)) => {
                if old.hash == new.hash {
                    new.content = old.content;
                }
                NodeKind::File(new)
            }
            (_, fresh) => fresh,
        };
    }

    /* Getters */

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    pub fn file_type(&self) -> FileType {
        match self.kind {
            NodeKind::Directory(_) => FileType::Directory,
            NodeKind::File(_) => FileType::File,
        }
    }

    pub fn as_dir(&self) -> Option<&Directory> {
        match &self.kind {
            NodeKind::Directory(dir) => Some(dir),
            NodeKind::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileAsset> {
        match &self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Directory(_) => None,
        }
    }

    /// Byte size, 0 for directories
    pub fn size(&self) -> u64 {
        self.as_file().map(|file| file.size).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::FileInfo;

    fn script(hash: &str) -> AssetRecord {
        AssetRecord {
            id: 2,
            name: "player".to_string(),
            kind: "script".to_string(),
            parent: Some(1),
            created_at: RemoteTimestamp::new("2024-01-01T00:00:00.000Z"),
            modified_at: RemoteTimestamp::new("2024-01-01T00:00:01.000Z"),
            file: Some(FileInfo {
                hash: hash.to_string(),
                filename: "player.js".to_string(),
                size: 4,
                url: None,
            }),
        }
    }

    #[test]
    fn test_file_node_uses_stored_filename() {
        let node = Node::from_record(&script("h"));
        assert_eq!(node.name, "player.js");
        assert!(node.is_file());
        assert_eq!(node.size(), 4);
        assert_eq!(node.as_file().unwrap().remote_type, "script");
    }

    #[test]
    fn test_record_without_file_is_empty_file() {
        let mut record = script("h");
        record.file = None;
        let node = Node::from_record(&record);
        assert_eq!(node.name, "player");
        assert_eq!(node.size(), 0);
        assert!(node.as_file().unwrap().hash.is_empty());
    }

    #[test]
    fn test_merge_keeps_content_only_while_hash_matches() {
        let mut node = Node::from_record(&script("h1"));
        if let NodeKind::File(file) = &mut node.kind {
            file.content = Some(Bytes::from_static(b"data"));
        }

        let mut touched = script("h1");
        touched.modified_at = RemoteTimestamp::new("2024-01-01T00:00:09.000Z");
        node.merge_record(&touched);
        assert_eq!(node.modified_at, touched.modified_at);
        assert!(node.as_file().unwrap().content.is_some());

        node.merge_record(&script("h2"));
        assert!(node.as_file().unwrap().content.is_none());
    }
}
