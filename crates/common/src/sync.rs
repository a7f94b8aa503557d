//! Optimistic concurrency checks for uploads
//!
//! Uploads are conditioned on the last modification time the client
//! knows about, and the remote rejects any mismatch. Before uploading we
//! compare three content hashes to tell apart a harmless metadata drift
//! (somebody touched the asset without changing its bytes) from a real
//! concurrent edit:
//!
//! | remote = cached | local = remote | outcome                  |
//! |-----------------|----------------|--------------------------|
//! | yes             | -              | [`ContentState::Synced`] |
//! | no              | yes            | [`ContentState::MatchesRemote`] |
//! | no              | no             | [`ContentState::Diverged`] (conflict) |

use md5::{Digest, Md5};

use crate::remote::{AssetRecord, RemoteTimestamp};

/// Hex MD5 digest, the same digest the remote reports for stored files
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentState {
    /// The remote still holds what we last synced
    Synced,
    /// The remote changed, but already holds exactly what we are writing
    MatchesRemote,
    /// The remote changed to something else since our last sync
    Diverged,
}

/// Outcome of comparing a cached file against fresh remote metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub content: ContentState,
    /// Whether the cached modification time still matches the remote
    pub metadata_synced: bool,
    /// Hash of the bytes about to be written
    pub local_hash: String,
    /// Modification time the upload must be conditioned on
    pub precondition: RemoteTimestamp,
}

impl SyncReport {
    pub fn is_conflict(&self) -> bool {
        self.content == ContentState::Diverged
    }

    /// Metadata drifted while content did not: fresh top-level fields
    ///  must be merged before the upload can succeed
    pub fn needs_metadata_merge(&self) -> bool {
        !self.is_conflict() && !self.metadata_synced
    }
}

/// Compare the cached view of a file with the remote's current record
///  and the bytes about to be written.
pub fn check(
    cached_hash: &str,
    cached_modified: &RemoteTimestamp,
    remote: &AssetRecord,
    data: &[u8],
) -> SyncReport {
    let remote_hash = remote
        .file
        .as_ref()
        .map(|file| file.hash.as_str())
        .unwrap_or_default();
    let local_hash = content_hash(data);

    let content = if remote_hash == cached_hash {
        ContentState::Synced
    } else if local_hash == remote_hash {
        ContentState::MatchesRemote
    } else {
        ContentState::Diverged
    };

    let metadata_synced = remote.modified_at == *cached_modified;
    let precondition = if metadata_synced {
        cached_modified.clone()
    } else {
        remote.modified_at.clone()
    };

    tracing::debug!(
        asset_id = remote.id,
        cached_hash,
        remote_hash,
        local_hash = %local_hash,
        ?content,
        metadata_synced,
        "checked asset sync state"
    );

    SyncReport {
        content,
        metadata_synced,
        local_hash,
        precondition,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::FileInfo;

    fn remote(hash: &str, modified: &str) -> AssetRecord {
        AssetRecord {
            id: 7,
            name: "main.js".to_string(),
            kind: "script".to_string(),
            parent: None,
            created_at: RemoteTimestamp::new("2024-01-01T00:00:00.000Z"),
            modified_at: RemoteTimestamp::new(modified),
            file: Some(FileInfo {
                hash: hash.to_string(),
                filename: "main.js".to_string(),
                size: 0,
                url: None,
            }),
        }
    }

    #[test]
    fn test_content_hash_is_hex_md5() {
        assert_eq!(content_hash(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(content_hash(b"hello"), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn test_in_sync_when_remote_matches_cache() {
        let cached = content_hash(b"old");
        let ts = RemoteTimestamp::new("2024-01-01T00:00:01.000Z");
        let report = check(&cached, &ts, &remote(&cached, ts.as_str()), b"new");

        assert_eq!(report.content, ContentState::Synced);
        assert!(report.metadata_synced);
        assert!(!report.is_conflict());
        assert!(!report.needs_metadata_merge());
        assert_eq!(report.precondition, ts);
    }

    #[test]
    fn test_write_matching_remote_is_tolerated() {
        let cached = content_hash(b"old");
        let theirs = content_hash(b"theirs");
        let ts = RemoteTimestamp::new("2024-01-01T00:00:01.000Z");
        let report = check(
            &cached,
            &ts,
            &remote(&theirs, "2024-01-01T00:00:09.000Z"),
            b"theirs",
        );

        assert_eq!(report.content, ContentState::MatchesRemote);
        assert!(!report.is_conflict());
        assert!(report.needs_metadata_merge());
        assert_eq!(report.precondition.as_str(), "2024-01-01T00:00:09.000Z");
    }

    #[test]
    fn test_diverged_remote_is_a_conflict() {
        let cached = content_hash(b"old");
        let theirs = content_hash(b"theirs");
        let ts = RemoteTimestamp::new("2024-01-01T00:00:01.000Z");
        let report = check(
            &cached,
            &ts,
            &remote(&theirs, "2024-01-01T00:00:09.000Z"),
            b"mine",
        );

        assert_eq!(report.content, ContentState::Diverged);
        assert!(report.is_conflict());
        assert!(!report.needs_metadata_merge());
    }

    #[test]
    fn test_metadata_only_drift_uses_remote_precondition() {
        let cached = content_hash(b"same");
        let ts = RemoteTimestamp::new("2024-01-01T00:00:01.000Z");
        let report = check(
            &cached,
            &ts,
            &remote(&cached, "2024-01-01T00:00:05.000Z"),
            b"edited",
        );

        assert_eq!(report.content, ContentState::Synced);
        assert!(report.needs_metadata_merge());
        assert_eq!(report.precondition.as_str(), "2024-01-01T00:00:05.000Z");
    }
}
