//! Recursive directory mirroring between a local disk and a remote
//! filesystem, with per-file digest verification.
//!
//! # Pipeline
//!
//! 1. **Resolve**: validate the identifier and join it onto both base paths
//! 2. **Connect**: open a session through a [`Connector`]
//! 3. **Walk**: mirror the source tree, digesting every file in flight
//! 4. **Verify**: re-digest each stored file and compare
//! 5. **Clean up**: delete the source tree if everything verified and the
//!    configuration asks for it
//!
//! The remote side is abstracted behind [`RemoteFs`]; [`MemoryFs`] is an
//! in-memory implementation for tests.

mod cleanup;
mod digest;
mod engine;
mod error;
mod file;
mod memory;
mod orchestrator;
mod path;
mod remote;
mod types;
mod validation;

pub use cleanup::{delete_local_tree, delete_remote_tree, delete_source};
pub use digest::{
    Digest, DigestAlgorithm, DigestReader, DigestWriter, Digester, copy_with_digest,
    digest_bytes, digest_file, digest_reader,
};
pub use engine::TransferEngine;
pub use error::{RemoteError, TransferError};
pub use file::{FileReceipt, download_file, upload_file};
pub use memory::{MemoryConnector, MemoryFs};
pub use orchestrator::TransferOrchestrator;
pub use path::{REMOTE_SEPARATOR, join_local, join_remote, remote_components};
pub use remote::{
    Connector, DirectoryEntry, RemoteFs, RemoteSession, SessionGuard, ensure_remote_dir,
    list_remote,
};
pub use types::{
    CleanupStatus, FailureKind, TransferConfig, TransferDirection, TransferFailure,
    TransferOutcome, TransferReport,
};
pub use validation::validate_relative_path;

/// Default copy buffer size: 8 KiB.
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;
