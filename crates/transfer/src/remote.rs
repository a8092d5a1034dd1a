//! Remote filesystem seam.
//!
//! The engine never talks to a transport directly. A session is handed in
//! as a `&dyn RemoteFs` so tests can substitute [`MemoryFs`](crate::MemoryFs)
//! for a live SFTP session.

use std::io::{Read, Write};
use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::path::remote_components;
use crate::{REMOTE_SEPARATOR, TransferError};

/// A directory listing record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub is_dir: bool,
}

impl DirectoryEntry {
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
        }
    }

    /// `true` for the `.` and `..` pseudo-entries.
    pub fn is_pseudo(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Operations the transfer engine needs from a remote filesystem.
pub trait RemoteFs {
    /// Lists the entries of a directory.
    fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError>;

    /// Opens a file for reading.
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError>;

    /// Creates or truncates a file for writing.
    fn open_write(&self, path: &str) -> Result<Box<dyn Write + '_>, RemoteError>;

    /// Creates a single directory. Fails with [`RemoteError::AlreadyExists`]
    /// when something already exists at `path`.
    fn mkdir(&self, path: &str) -> Result<(), RemoteError>;

    /// Removes a file.
    fn remove(&self, path: &str) -> Result<(), RemoteError>;

    /// Removes an empty directory.
    fn rmdir(&self, path: &str) -> Result<(), RemoteError>;
}

/// An open session to a remote filesystem.
pub trait RemoteSession: RemoteFs {
    /// Tears down the session.
    fn close(&mut self) -> Result<(), RemoteError>;
}

/// Opens sessions to a remote filesystem.
pub trait Connector {
    type Session: RemoteSession;

    fn connect(&self) -> Result<Self::Session, TransferError>;
}

/// Holds a session and closes it when dropped.
pub struct SessionGuard<S: RemoteSession> {
    session: S,
}

impl<S: RemoteSession> SessionGuard<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: RemoteSession> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: RemoteSession> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: RemoteSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        match self.session.close() {
            Ok(()) => debug!("remote session closed"),
            Err(e) => warn!(error = %e, "failed to close remote session"),
        }
    }
}

/// Lists a remote directory without the `.` and `..` pseudo-entries, sorted by name.
pub fn list_remote(remote: &dyn RemoteFs, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
    let mut entries: Vec<DirectoryEntry> = remote
        .list(path)?
        .into_iter()
        .filter(|e| !e.is_pseudo())
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Creates `path` on the remote one component at a time.
///
/// Each accumulated prefix is created in turn; "already exists" is treated
/// as success, any other failure aborts. Safe to call repeatedly.
pub fn ensure_remote_dir(remote: &dyn RemoteFs, path: &str) -> Result<(), RemoteError> {
    let mut current = String::with_capacity(path.len());
    if !path.starts_with(REMOTE_SEPARATOR) {
        // Relative paths stay relative to the session's working directory.
        current.push('.');
    }

    for component in remote_components(path) {
        current.push(REMOTE_SEPARATOR);
        current.push_str(component);

        match remote.mkdir(&current) {
            Ok(()) => debug!(path = %current, "created remote directory"),
            Err(e) if e.is_already_exists() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryFs;

    #[test]
    fn ensure_creates_every_prefix() {
        let fs = MemoryFs::new();
        ensure_remote_dir(&fs, "/upload/batch/day1").unwrap();
        assert!(fs.is_dir("/upload"));
        assert!(fs.is_dir("/upload/batch"));
        assert!(fs.is_dir("/upload/batch/day1"));
    }

    #[test]
    fn ensure_is_idempotent() {
        let fs = MemoryFs::new();
        ensure_remote_dir(&fs, "/upload//batch/").unwrap();
        let before = fs.paths();
        ensure_remote_dir(&fs, "/upload/batch").unwrap();
        assert_eq!(fs.paths(), before);
    }

    #[test]
    fn ensure_propagates_other_failures() {
        let fs = MemoryFs::new();
        fs.put_file("/upload", b"not a directory");
        // mkdir under a file fails with something other than AlreadyExists.
        let result = ensure_remote_dir(&fs, "/upload/batch");
        assert!(matches!(result, Err(RemoteError::NotFound(_))));
    }

    #[test]
    fn ensure_relative_path() {
        let fs = MemoryFs::new();
        ensure_remote_dir(&fs, "remote/sub").unwrap();
        assert!(fs.is_dir("/remote/sub"));
    }

    #[test]
    fn list_skips_pseudo_entries() {
        let fs = MemoryFs::new();
        fs.put_file("/d/b.txt", b"b");
        fs.put_file("/d/a.txt", b"a");
        fs.set_list_pseudo_entries(true);

        let names: Vec<String> = list_remote(&fs, "/d")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    struct Flaky {
        inner: MemoryFs,
        closed: bool,
    }

    impl RemoteFs for Flaky {
        fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
            self.inner.list(path)
        }
        fn open_read(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError> {
            self.inner.open_read(path)
        }
        fn open_write(&self, path: &str) -> Result<Box<dyn Write + '_>, RemoteError> {
            self.inner.open_write(path)
        }
        fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
            self.inner.mkdir(path)
        }
        fn remove(&self, path: &str) -> Result<(), RemoteError> {
            self.inner.remove(path)
        }
        fn rmdir(&self, path: &str) -> Result<(), RemoteError> {
            self.inner.rmdir(path)
        }
    }

    impl RemoteSession for Flaky {
        fn close(&mut self) -> Result<(), RemoteError> {
            self.closed = true;
            Err(RemoteError::Protocol("already gone".into()))
        }
    }

    #[test]
    fn guard_swallows_close_errors() {
        let fs = MemoryFs::new();
        let guard = SessionGuard::new(Flaky {
            inner: fs.clone(),
            closed: false,
        });
        assert!(!guard.closed);
        drop(guard);
    }

    #[test]
    fn guard_closes_on_drop() {
        let fs = MemoryFs::new();
        {
            let _guard = SessionGuard::new(fs.clone());
        }
        assert_eq!(fs.close_count(), 1);
    }
}
