//! Source tree removal after a verified transfer.

use std::path::Path;

use tracing::{debug, info};

use crate::error::TransferError;
use crate::path::join_remote;
use crate::remote::{RemoteFs, list_remote};
use crate::types::TransferDirection;

/// Deletes the source side of a transfer.
///
/// For a download the source is `remote_path`, for an upload it is
/// `local_path`. The first failure aborts; nothing is retried.
pub fn delete_source(
    direction: TransferDirection,
    remote: &dyn RemoteFs,
    remote_path: &str,
    local_path: &Path,
) -> Result<(), TransferError> {
    match direction {
        TransferDirection::Download => delete_remote_tree(remote, remote_path),
        TransferDirection::Upload => delete_local_tree(local_path),
    }
}

/// Deletes a remote directory tree: files first, then subdirectories
/// depth-first, then the directory itself.
pub fn delete_remote_tree(remote: &dyn RemoteFs, path: &str) -> Result<(), TransferError> {
    let deletion = |reason: String| TransferError::Deletion {
        path: path.to_string(),
        reason,
    };

    let entries = list_remote(remote, path).map_err(|e| deletion(e.to_string()))?;
    let (dirs, files): (Vec<_>, Vec<_>) = entries.into_iter().partition(|e| e.is_dir);

    for file in files {
        let file_path = join_remote(path, &file.name);
        remote.remove(&file_path).map_err(|e| TransferError::Deletion {
            path: file_path.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %file_path, "removed remote file");
    }

    for dir in dirs {
        delete_remote_tree(remote, &join_remote(path, &dir.name))?;
    }

    remote.rmdir(path).map_err(|e| deletion(e.to_string()))?;
    info!(path = %path, "deleted remote directory");
    Ok(())
}

/// Deletes a local directory tree. Fails if nothing exists at `path`.
pub fn delete_local_tree(path: &Path) -> Result<(), TransferError> {
    if !path.exists() {
        return Err(TransferError::Deletion {
            path: path.display().to_string(),
            reason: "does not exist".into(),
        });
    }

    std::fs::remove_dir_all(path).map_err(|e| TransferError::Deletion {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    info!(path = %path.display(), "deleted local directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryFs;
    use tempfile::TempDir;

    #[test]
    fn remote_tree_removed_completely() {
        let fs = MemoryFs::new();
        fs.put_file("/out/batch/a.txt", b"a");
        fs.put_file("/out/batch/sub/deeper/b.txt", b"b");
        fs.put_dir("/out/batch/empty");

        delete_remote_tree(&fs, "/out/batch").unwrap();
        assert_eq!(fs.paths(), vec!["/out"]);
    }

    #[test]
    fn remote_failure_aborts() {
        let fs = MemoryFs::new();
        fs.put_file("/out/batch/a.txt", b"a");
        fs.put_file("/out/batch/b.txt", b"b");
        fs.fail_removal_of("/out/batch/a.txt");

        let err = delete_remote_tree(&fs, "/out/batch").unwrap_err();
        assert!(matches!(err, TransferError::Deletion { path, .. } if path == "/out/batch/a.txt"));
        assert!(fs.is_dir("/out/batch"));
    }

    #[test]
    fn remote_missing_directory() {
        let fs = MemoryFs::new();
        assert!(delete_remote_tree(&fs, "/nothing").is_err());
    }

    #[test]
    fn local_tree_removed() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("sub")).unwrap();
        std::fs::write(src.join("sub").join("f"), b"x").unwrap();

        delete_local_tree(&src).unwrap();
        assert!(!src.exists());
    }

    #[test]
    fn local_missing_directory() {
        let dir = TempDir::new().unwrap();
        let result = delete_local_tree(&dir.path().join("gone"));
        assert!(matches!(result, Err(TransferError::Deletion { .. })));
    }

    #[test]
    fn delete_source_picks_side() {
        let fs = MemoryFs::new();
        fs.put_file("/remote/a.txt", b"a");
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("local");
        std::fs::create_dir_all(&local).unwrap();

        delete_source(TransferDirection::Upload, &fs, "/remote", &local).unwrap();
        assert!(!local.exists());
        assert!(fs.is_dir("/remote"));

        delete_source(TransferDirection::Download, &fs, "/remote", &local).unwrap();
        assert!(!fs.exists("/remote"));
    }
}
