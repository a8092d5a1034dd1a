//! In-memory remote filesystem.
//!
//! Backs the engine's tests and can stand in for a remote when embedding the
//! engine without a network. Clones share the same tree. Faults can be
//! injected per path to exercise the failure handling of the engine.

use std::collections::{BTreeMap, HashSet};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::RemoteError;
use crate::remote::{Connector, DirectoryEntry, RemoteFs, RemoteSession};
use crate::{REMOTE_SEPARATOR, TransferError};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
}

#[derive(Default)]
struct Tree {
    nodes: BTreeMap<String, Node>,
    truncate_writes: HashSet<String>,
    fail_reads: HashSet<String>,
    fail_lists: HashSet<String>,
    fail_removes: HashSet<String>,
    list_pseudo: bool,
    closes: usize,
}

/// Thread-safe in-memory filesystem with `/`-separated absolute paths.
#[derive(Clone, Default)]
pub struct MemoryFs {
    tree: Arc<Mutex<Tree>>,
}

/// Normalizes a path to `/a/b` form. `.` components and empty segments are dropped.
fn normalize(path: &str) -> String {
    let mut out = String::new();
    for part in path.split(REMOTE_SEPARATOR) {
        if part.is_empty() || part == "." {
            continue;
        }
        out.push(REMOTE_SEPARATOR);
        out.push_str(part);
    }
    if out.is_empty() {
        out.push(REMOTE_SEPARATOR);
    }
    out
}

fn parent_of(path: &str) -> &str {
    match path.rfind(REMOTE_SEPARATOR) {
        Some(0) | None => "/",
        Some(i) => &path[..i],
    }
}

impl Tree {
    fn is_dir(&self, path: &str) -> bool {
        path == "/" || matches!(self.nodes.get(path), Some(Node::Dir))
    }

    fn exists(&self, path: &str) -> bool {
        path == "/" || self.nodes.contains_key(path)
    }

    fn children(&self, path: &str) -> impl Iterator<Item = (&String, &Node)> {
        let path = path.to_string();
        self.nodes
            .iter()
            .filter(move |(k, _)| k.as_str() != "/" && parent_of(k) == path)
    }

    fn mkdir_all(&mut self, path: &str) {
        let mut current = String::new();
        for part in path.split(REMOTE_SEPARATOR).filter(|p| !p.is_empty()) {
            current.push(REMOTE_SEPARATOR);
            current.push_str(part);
            self.nodes.entry(current.clone()).or_insert(Node::Dir);
        }
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores a file, creating missing parent directories.
    pub fn put_file(&self, path: &str, data: &[u8]) {
        let path = normalize(path);
        let mut tree = self.tree();
        tree.mkdir_all(parent_of(&path));
        tree.nodes.insert(path, Node::File(data.to_vec()));
    }

    /// Creates a directory and its missing parents.
    pub fn put_dir(&self, path: &str) {
        self.tree().mkdir_all(&normalize(path));
    }

    /// Returns the contents of a file, if one exists at `path`.
    pub fn read_file(&self, path: &str) -> Option<Vec<u8>> {
        match self.tree().nodes.get(&normalize(path)) {
            Some(Node::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.tree().is_dir(&normalize(path))
    }

    pub fn is_file(&self, path: &str) -> bool {
        matches!(self.tree().nodes.get(&normalize(path)), Some(Node::File(_)))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.tree().exists(&normalize(path))
    }

    /// All stored paths in sorted order.
    pub fn paths(&self) -> Vec<String> {
        self.tree().nodes.keys().cloned().collect()
    }

    /// Drops the last byte of every file subsequently written to `path`.
    pub fn truncate_writes_to(&self, path: &str) {
        self.tree().truncate_writes.insert(normalize(path));
    }

    /// Makes reads of `path` fail after the first half of the content.
    pub fn fail_reads_of(&self, path: &str) {
        self.tree().fail_reads.insert(normalize(path));
    }

    /// Makes listing `path` fail.
    pub fn fail_listing_of(&self, path: &str) {
        self.tree().fail_lists.insert(normalize(path));
    }

    /// Makes removing `path` fail.
    pub fn fail_removal_of(&self, path: &str) {
        self.tree().fail_removes.insert(normalize(path));
    }

    /// Includes `.` and `..` in listings, as some servers do.
    pub fn set_list_pseudo_entries(&self, enabled: bool) {
        self.tree().list_pseudo = enabled;
    }

    /// Number of times a session over this tree was closed.
    pub fn close_count(&self) -> usize {
        self.tree().closes
    }
}

impl RemoteFs for MemoryFs {
    fn list(&self, path: &str) -> Result<Vec<DirectoryEntry>, RemoteError> {
        let path = normalize(path);
        let tree = self.tree();
        if tree.fail_lists.contains(&path) {
            return Err(RemoteError::PermissionDenied(path));
        }
        if !tree.is_dir(&path) {
            return Err(RemoteError::NotFound(path));
        }

        let mut entries = Vec::new();
        if tree.list_pseudo {
            entries.push(DirectoryEntry::dir("."));
            entries.push(DirectoryEntry::dir(".."));
        }
        for (child, node) in tree.children(&path) {
            let name = &child[child.rfind(REMOTE_SEPARATOR).map_or(0, |i| i + 1)..];
            entries.push(DirectoryEntry {
                name: name.to_string(),
                is_dir: matches!(node, Node::Dir),
            });
        }
        Ok(entries)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + '_>, RemoteError> {
        let path = normalize(path);
        let tree = self.tree();
        let data = match tree.nodes.get(&path) {
            Some(Node::File(data)) => data.clone(),
            Some(Node::Dir) => return Err(RemoteError::Protocol(format!("is a directory: {path}"))),
            None => return Err(RemoteError::NotFound(path)),
        };
        let fail_after = tree.fail_reads.contains(&path).then_some(data.len() / 2);
        Ok(Box::new(MemoryReader {
            data,
            pos: 0,
            fail_after,
        }))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + '_>, RemoteError> {
        let path = normalize(path);
        let truncate = {
            let mut tree = self.tree();
            if !tree.is_dir(parent_of(&path)) {
                return Err(RemoteError::NotFound(parent_of(&path).to_string()));
            }
            if tree.is_dir(&path) {
                return Err(RemoteError::Protocol(format!("is a directory: {path}")));
            }
            tree.nodes.insert(path.clone(), Node::File(Vec::new()));
            tree.truncate_writes.contains(&path)
        };
        Ok(Box::new(MemoryWriter {
            fs: self,
            path,
            buf: Vec::new(),
            truncate,
        }))
    }

    fn mkdir(&self, path: &str) -> Result<(), RemoteError> {
        let path = normalize(path);
        let mut tree = self.tree();
        if tree.exists(&path) {
            return Err(RemoteError::AlreadyExists(path));
        }
        if !tree.is_dir(parent_of(&path)) {
            return Err(RemoteError::NotFound(parent_of(&path).to_string()));
        }
        tree.nodes.insert(path, Node::Dir);
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), RemoteError> {
        let path = normalize(path);
        let mut tree = self.tree();
        if tree.fail_removes.contains(&path) {
            return Err(RemoteError::PermissionDenied(path));
        }
        match tree.nodes.get(&path) {
            Some(Node::File(_)) => {
                tree.nodes.remove(&path);
                Ok(())
            }
            Some(Node::Dir) => Err(RemoteError::Protocol(format!("is a directory: {path}"))),
            None => Err(RemoteError::NotFound(path)),
        }
    }

    fn rmdir(&self, path: &str) -> Result<(), RemoteError> {
        let path = normalize(path);
        let mut tree = self.tree();
        if tree.fail_removes.contains(&path) {
            return Err(RemoteError::PermissionDenied(path));
        }
        if !matches!(tree.nodes.get(&path), Some(Node::Dir)) {
            return Err(RemoteError::NotFound(path));
        }
        if tree.children(&path).next().is_some() {
            return Err(RemoteError::Protocol(format!("directory not empty: {path}")));
        }
        tree.nodes.remove(&path);
        Ok(())
    }
}

impl RemoteSession for MemoryFs {
    fn close(&mut self) -> Result<(), RemoteError> {
        self.tree().closes += 1;
        Ok(())
    }
}

struct MemoryReader {
    data: Vec<u8>,
    pos: usize,
    fail_after: Option<usize>,
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let end = match self.fail_after {
            Some(limit) if self.pos >= limit => {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "injected read failure"));
            }
            Some(limit) => limit.max(1).min(self.data.len()),
            None => self.data.len(),
        };
        let n = buf.len().min(end - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct MemoryWriter<'a> {
    fs: &'a MemoryFs,
    path: String,
    buf: Vec<u8>,
    truncate: bool,
}

impl MemoryWriter<'_> {
    fn commit(&self) {
        let mut data = self.buf.clone();
        if self.truncate {
            data.pop();
        }
        self.fs.tree().nodes.insert(self.path.clone(), Node::File(data));
    }
}

impl Write for MemoryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for MemoryWriter<'_> {
    fn drop(&mut self) {
        self.commit();
    }
}

/// [`Connector`] over a shared [`MemoryFs`].
#[derive(Clone)]
pub struct MemoryConnector {
    fs: MemoryFs,
    refuse: bool,
}

impl MemoryConnector {
    pub fn new(fs: MemoryFs) -> Self {
        Self { fs, refuse: false }
    }

    /// A connector whose every connection attempt fails.
    pub fn refusing(fs: MemoryFs) -> Self {
        Self { fs, refuse: true }
    }
}

impl Connector for MemoryConnector {
    type Session = MemoryFs;

    fn connect(&self) -> Result<MemoryFs, TransferError> {
        if self.refuse {
            return Err(TransferError::Connection("connection refused".into()));
        }
        Ok(self.fs.clone())
    }
}
