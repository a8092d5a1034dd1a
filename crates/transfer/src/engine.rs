//! Recursive tree transfer.
//!
//! The walk is depth-first and sequential. Every entry of a directory is
//! attempted even after a sibling failed; the directory's report is the
//! merge of its entries' reports, so it succeeds only if all of them did.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::digest::DigestAlgorithm;
use crate::error::TransferError;
use crate::file::{download_file, upload_file};
use crate::path::join_remote;
use crate::remote::{DirectoryEntry, RemoteFs, ensure_remote_dir, list_remote};
use crate::types::{FailureKind, TransferDirection, TransferReport};

/// Walks a directory tree and mirrors it in one direction.
pub struct TransferEngine<'a> {
    remote: &'a dyn RemoteFs,
    algorithm: DigestAlgorithm,
    chunk_size: usize,
}

impl<'a> TransferEngine<'a> {
    pub fn new(remote: &'a dyn RemoteFs, algorithm: DigestAlgorithm) -> Self {
        Self {
            remote,
            algorithm,
            chunk_size: 0,
        }
    }

    /// Sets the copy buffer size. 0 selects [`COPY_BUFFER_SIZE`](crate::COPY_BUFFER_SIZE).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Mirrors `remote_dir` to `local_dir` (download) or `local_dir` to
    /// `remote_dir` (upload).
    pub fn transfer_directory(
        &self,
        direction: TransferDirection,
        remote_dir: &str,
        local_dir: &Path,
    ) -> TransferReport {
        match direction {
            TransferDirection::Download => self.download_directory(remote_dir, local_dir),
            TransferDirection::Upload => self.upload_directory(local_dir, remote_dir, false),
        }
    }

    /// Transfers one file and records the verdict.
    ///
    /// Failures never propagate: they are logged and returned in the report
    /// so sibling transfers carry on.
    pub fn transfer_file(
        &self,
        direction: TransferDirection,
        remote_path: &str,
        local_path: &Path,
    ) -> TransferReport {
        let source = match direction {
            TransferDirection::Download => remote_path.to_string(),
            TransferDirection::Upload => local_path.display().to_string(),
        };
        let result = match direction {
            TransferDirection::Download => download_file(
                self.remote,
                remote_path,
                local_path,
                self.algorithm,
                self.chunk_size,
            ),
            TransferDirection::Upload => upload_file(
                self.remote,
                local_path,
                remote_path,
                self.algorithm,
                self.chunk_size,
            ),
        };

        let receipt = match result {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(%direction, path = %source, error = %e, "file transfer failed");
                return TransferReport::failed(source, FailureKind::Io, e.to_string());
            }
        };

        let checksum = receipt.transferred.to_hex();
        if receipt.is_verified() {
            info!(
                path = %source,
                algorithm = %self.algorithm,
                checksum = %checksum,
                integrity = "PASS",
                "{}",
                direction.verb()
            );
            TransferReport {
                verified: vec![source],
                failures: Vec::new(),
                bytes: receipt.bytes,
            }
        } else {
            let err = TransferError::IntegrityMismatch {
                path: source.clone(),
                transferred: checksum.clone(),
                stored: receipt.stored.to_hex(),
            };
            warn!(
                path = %source,
                algorithm = %self.algorithm,
                checksum = %checksum,
                stored = %receipt.stored,
                integrity = "FAIL",
                "{}",
                direction.verb()
            );
            let mut report =
                TransferReport::failed(source, FailureKind::IntegrityMismatch, err.to_string());
            report.bytes = receipt.bytes;
            report
        }
    }

    fn download_directory(&self, remote_dir: &str, local_dir: &Path) -> TransferReport {
        if let Err(e) = std::fs::create_dir_all(local_dir) {
            warn!(path = %local_dir.display(), error = %e, "cannot create local directory");
            return TransferReport::failed(remote_dir, FailureKind::DirectoryCreate, e.to_string());
        }

        let entries = match list_remote(self.remote, remote_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %remote_dir, error = %e, "cannot list remote directory");
                return TransferReport::failed(remote_dir, FailureKind::Listing, e.to_string());
            }
        };
        debug!(path = %remote_dir, entries = entries.len(), "listed remote directory");

        let mut report = TransferReport::default();
        for entry in entries {
            let remote_path = join_remote(remote_dir, &entry.name);
            let local_path = local_dir.join(&entry.name);
            let entry_report = if entry.is_dir {
                self.download_directory(&remote_path, &local_path)
            } else {
                self.transfer_file(TransferDirection::Download, &remote_path, &local_path)
            };
            report.merge(entry_report);
        }
        report
    }

    fn upload_directory(&self, local_dir: &Path, remote_dir: &str, nested: bool) -> TransferReport {
        let source = local_dir.display().to_string();

        // A nested directory's parent was created by the enclosing call.
        let created = if nested {
            match self.remote.mkdir(remote_dir) {
                Err(e) if !e.is_already_exists() => Err(e),
                _ => Ok(()),
            }
        } else {
            ensure_remote_dir(self.remote, remote_dir)
        };
        if let Err(e) = created {
            warn!(path = %remote_dir, error = %e, "cannot create remote directory");
            return TransferReport::failed(source, FailureKind::DirectoryCreate, e.to_string());
        }

        let (entries, mut report) = match list_local(local_dir) {
            Ok(listing) => listing,
            Err(e) => {
                warn!(path = %source, error = %e, "cannot list local directory");
                return TransferReport::failed(source, FailureKind::Listing, e.to_string());
            }
        };
        debug!(path = %source, entries = entries.len(), "listed local directory");

        for entry in entries {
            let remote_path = join_remote(remote_dir, &entry.name);
            let local_path = local_dir.join(&entry.name);
            let entry_report = if entry.is_dir {
                self.upload_directory(&local_path, &remote_path, true)
            } else {
                self.transfer_file(TransferDirection::Upload, &remote_path, &local_path)
            };
            report.merge(entry_report);
        }
        report
    }
}

/// Reads a local directory, sorted by name.
///
/// Entries that cannot be inspected are returned as failures in the report
/// instead of aborting the listing.
fn list_local(dir: &Path) -> Result<(Vec<DirectoryEntry>, TransferReport), TransferError> {
    let read_dir = std::fs::read_dir(dir).map_err(|e| TransferError::Listing {
        path: dir.display().to_string(),
        reason: e.to_string(),
    })?;

    let mut entries = Vec::new();
    let mut report = TransferReport::default();
    for entry in read_dir {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.push_failure(dir.display().to_string(), FailureKind::Listing, e.to_string());
                continue;
            }
        };
        let path: PathBuf = entry.path();
        // Follow symlinks, like a plain directory read would.
        match std::fs::metadata(&path) {
            Ok(meta) => entries.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
            }),
            Err(e) => {
                report.push_failure(path.display().to_string(), FailureKind::Io, e.to_string());
            }
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok((entries, report))
}
