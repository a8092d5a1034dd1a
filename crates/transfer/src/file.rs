//! Single-file transfer with integrity verification.

use std::fs::File;
use std::path::Path;

use crate::digest::{Digest, DigestAlgorithm, copy_with_digest, digest_file, digest_reader};
use crate::error::TransferError;
use crate::remote::RemoteFs;

/// Digests recorded for one copied file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReceipt {
    /// Digest of the bytes read from the source during the copy.
    pub transferred: Digest,
    /// Digest of the destination file, re-read after the copy completed.
    pub stored: Digest,
    pub bytes: u64,
}

impl FileReceipt {
    pub fn is_verified(&self) -> bool {
        self.transferred == self.stored
    }
}

/// Copies a remote file to local disk and re-digests the local copy.
///
/// Both streams are closed before the stored digest is computed, on every
/// path out of this function.
pub fn download_file(
    remote: &dyn RemoteFs,
    remote_path: &str,
    local_path: &Path,
    algorithm: DigestAlgorithm,
    chunk_size: usize,
) -> Result<FileReceipt, TransferError> {
    let (transferred, bytes) = {
        let reader = remote.open_read(remote_path)?;
        let mut file =
            File::create(local_path).map_err(|e| TransferError::io(local_path.display(), e))?;
        let copied = copy_with_digest(reader, &mut file, algorithm, chunk_size)
            .map_err(|e| TransferError::io(remote_path, e))?;
        file.sync_all()
            .map_err(|e| TransferError::io(local_path.display(), e))?;
        copied
    };

    let stored = digest_file(local_path, algorithm)?;
    Ok(FileReceipt {
        transferred,
        stored,
        bytes,
    })
}

/// Copies a local file to the remote and re-digests the remote copy.
///
/// The stored digest is read back through the remote session so it covers
/// what actually landed on the far side.
pub fn upload_file(
    remote: &dyn RemoteFs,
    local_path: &Path,
    remote_path: &str,
    algorithm: DigestAlgorithm,
    chunk_size: usize,
) -> Result<FileReceipt, TransferError> {
    let (transferred, bytes) = {
        let file = File::open(local_path).map_err(|e| TransferError::io(local_path.display(), e))?;
        let mut writer = remote.open_write(remote_path)?;
        copy_with_digest(file, &mut *writer, algorithm, chunk_size)
            .map_err(|e| TransferError::io(remote_path, e))?
    };

    let reader = remote.open_read(remote_path)?;
    let stored = digest_reader(reader, algorithm).map_err(|e| TransferError::io(remote_path, e))?;
    Ok(FileReceipt {
        transferred,
        stored,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::digest_bytes;
    use crate::memory::MemoryFs;
    use tempfile::TempDir;

    #[test]
    fn download_verifies_local_copy() {
        let fs = MemoryFs::new();
        let content: Vec<u8> = (0..=255u8).cycle().take(20_000).collect();
        fs.put_file("/in/data.bin", &content);
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("data.bin");

        for alg in [DigestAlgorithm::Sha256, DigestAlgorithm::Md5] {
            let receipt = download_file(&fs, "/in/data.bin", &local, alg, 1000).unwrap();
            assert!(receipt.is_verified());
            assert_eq!(receipt.bytes, content.len() as u64);
            assert_eq!(receipt.stored, digest_bytes(&content, alg));
            assert_eq!(std::fs::read(&local).unwrap(), content);
        }
    }

    #[test]
    fn upload_verifies_remote_copy() {
        let fs = MemoryFs::new();
        fs.put_dir("/out");
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, b"hello").unwrap();

        let receipt = upload_file(&fs, &local, "/out/a.txt", DigestAlgorithm::Sha256, 0).unwrap();
        assert!(receipt.is_verified());
        assert_eq!(fs.read_file("/out/a.txt").unwrap(), b"hello");
    }

    #[test]
    fn upload_detects_truncated_remote_write() {
        let fs = MemoryFs::new();
        fs.put_dir("/out");
        fs.truncate_writes_to("/out/b.txt");
        let dir = TempDir::new().unwrap();
        let local = dir.path().join("b.txt");
        std::fs::write(&local, b"world").unwrap();

        let receipt = upload_file(&fs, &local, "/out/b.txt", DigestAlgorithm::Md5, 0).unwrap();
        assert!(!receipt.is_verified());
        assert_eq!(receipt.transferred, digest_bytes(b"world", DigestAlgorithm::Md5));
        assert_eq!(receipt.stored, digest_bytes(b"worl", DigestAlgorithm::Md5));
    }

    #[test]
    fn download_read_failure_is_io_error() {
        let fs = MemoryFs::new();
        fs.put_file("/in/f.bin", b"0123456789");
        fs.fail_reads_of("/in/f.bin");
        let dir = TempDir::new().unwrap();

        let result = download_file(
            &fs,
            "/in/f.bin",
            &dir.path().join("f.bin"),
            DigestAlgorithm::Sha256,
            0,
        );
        assert!(matches!(result, Err(TransferError::Io { path, .. }) if path == "/in/f.bin"));
    }

    #[test]
    fn download_missing_remote_file() {
        let fs = MemoryFs::new();
        let dir = TempDir::new().unwrap();
        let result = download_file(
            &fs,
            "/nope",
            &dir.path().join("nope"),
            DigestAlgorithm::Sha256,
            0,
        );
        assert!(matches!(result, Err(TransferError::Remote(_))));
    }

    #[test]
    fn upload_missing_local_file() {
        let fs = MemoryFs::new();
        let result = upload_file(
            &fs,
            Path::new("/nonexistent/file"),
            "/f",
            DigestAlgorithm::Sha256,
            0,
        );
        assert!(matches!(result, Err(TransferError::Io { .. })));
        assert!(!fs.exists("/f"));
    }
}
