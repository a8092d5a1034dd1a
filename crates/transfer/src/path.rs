//! Path joining for the remote namespace and local path resolution.

use std::path::{Path, PathBuf};

/// Separator used by remote paths.
pub const REMOTE_SEPARATOR: char = '/';

/// Joins two remote path segments.
///
/// Trailing separators are stripped from `base`, leading separators from
/// `addition`, the two are joined with one separator and any run of
/// separators in the result collapses to one. An empty `addition` yields
/// `base` itself, so `join_remote(&join_remote(a, b), "")` equals
/// `join_remote(a, b)`.
///
/// ```
/// use filebridge_transfer::join_remote;
///
/// assert_eq!(join_remote("/a/b//", "//c"), "/a/b/c");
/// ```
pub fn join_remote(base: &str, addition: &str) -> String {
    let base = base.trim_end_matches(REMOTE_SEPARATOR);
    let addition = addition.trim_start_matches(REMOTE_SEPARATOR);
    if addition.is_empty() && !base.is_empty() {
        return collapse_separators(base.chars());
    }

    collapse_separators(
        base.chars()
            .chain(std::iter::once(REMOTE_SEPARATOR))
            .chain(addition.chars()),
    )
}

fn collapse_separators(chars: impl Iterator<Item = char>) -> String {
    let mut joined = String::new();
    let mut last_was_sep = false;
    for c in chars {
        if c == REMOTE_SEPARATOR {
            if last_was_sep {
                continue;
            }
            last_was_sep = true;
        } else {
            last_was_sep = false;
        }
        joined.push(c);
    }
    joined
}

/// Joins a slash-separated relative identifier onto a local base directory.
///
/// Leading separators are stripped first so an identifier like `/batch-7`
/// stays under `base` instead of replacing it.
pub fn join_local(base: &Path, relative: &str) -> PathBuf {
    let relative = relative.trim_start_matches(['/', '\\']);
    if relative.is_empty() {
        return base.to_path_buf();
    }
    relative
        .split(REMOTE_SEPARATOR)
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

/// Splits a remote path into its non-empty components.
pub fn remote_components(path: &str) -> impl Iterator<Item = &str> {
    path.split(REMOTE_SEPARATOR).filter(|c| !c.is_empty())
}
