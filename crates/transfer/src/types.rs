use std::fmt;
use std::path::PathBuf;

use crate::DigestAlgorithm;

/// Which way a transfer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferDirection {
    /// Remote to local.
    Download,
    /// Local to remote.
    Upload,
}

impl TransferDirection {
    /// Verb used in per-file diagnostics.
    pub fn verb(self) -> &'static str {
        match self {
            TransferDirection::Download => "downloaded",
            TransferDirection::Upload => "uploaded",
        }
    }
}

impl fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferDirection::Download => f.write_str("download"),
            TransferDirection::Upload => f.write_str("upload"),
        }
    }
}

/// Immutable settings for one orchestrated transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Base directory on the remote side.
    pub remote_base_path: String,
    /// Base directory on the local side.
    pub local_base_path: PathBuf,
    /// Digest used for integrity checks.
    pub algorithm: DigestAlgorithm,
    /// Delete the source tree after a fully verified transfer.
    pub delete_source: bool,
}

/// Why a single entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The destination directory could not be created.
    DirectoryCreate,
    /// The source directory could not be listed.
    Listing,
    /// Reading or writing a file failed.
    Io,
    /// The bytes were copied but the digests differ.
    IntegrityMismatch,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::DirectoryCreate => "directory create",
            FailureKind::Listing => "listing",
            FailureKind::Io => "I/O",
            FailureKind::IntegrityMismatch => "integrity mismatch",
        };
        f.write_str(s)
    }
}

/// A failed entry in a tree transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    /// Source-side path of the failed entry.
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Result of transferring a file or a tree.
///
/// A tree transfer succeeds only if no entry failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Source-side paths of files whose digests matched.
    pub verified: Vec<String>,
    pub failures: Vec<TransferFailure>,
    /// Bytes copied across all files, including failed ones.
    pub bytes: u64,
}

impl TransferReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Builds a report holding a single failure.
    pub fn failed(path: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        let mut report = Self::default();
        report.push_failure(path, kind, message);
        report
    }

    pub fn push_failure(
        &mut self,
        path: impl Into<String>,
        kind: FailureKind,
        message: impl Into<String>,
    ) {
        self.failures.push(TransferFailure {
            path: path.into(),
            kind,
            message: message.into(),
        });
    }

    /// Folds another report into this one.
    pub fn merge(&mut self, other: TransferReport) {
        self.verified.extend(other.verified);
        self.failures.extend(other.failures);
        self.bytes += other.bytes;
    }

    pub fn failed_paths(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.path.as_str())
    }
}

/// What happened to the source tree after a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    /// Deletion disabled, or the transfer did not fully succeed.
    Skipped,
    Deleted,
    Failed(String),
}

/// Full result of one orchestrated transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub direction: TransferDirection,
    pub source: String,
    pub destination: String,
    pub report: TransferReport,
    pub cleanup: CleanupStatus,
}

impl TransferOutcome {
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_success() {
        assert!(TransferReport::default().is_success());
    }

    #[test]
    fn merge_accumulates() {
        let mut total = TransferReport {
            verified: vec!["/a".into()],
            failures: Vec::new(),
            bytes: 5,
        };
        total.merge(TransferReport::failed("/b", FailureKind::Io, "reset"));
        total.merge(TransferReport {
            verified: vec!["/c".into()],
            failures: Vec::new(),
            bytes: 7,
        });

        assert!(!total.is_success());
        assert_eq!(total.verified, vec!["/a", "/c"]);
        assert_eq!(total.bytes, 12);
        assert_eq!(total.failed_paths().collect::<Vec<_>>(), vec!["/b"]);
    }

    #[test]
    fn direction_display() {
        assert_eq!(TransferDirection::Download.to_string(), "download");
        assert_eq!(TransferDirection::Upload.verb(), "uploaded");
    }
}
