use std::path::{Component, Path};

use crate::TransferError;

/// Normalizes and validates a transfer identifier supplied by a trigger.
///
/// Leading `/` separators are stripped (callers conventionally prefix the
/// identifier with one). The remainder must not:
/// - be empty
/// - contain parent directory traversal (`..`)
/// - carry a Windows prefix (`C:`, `\\server`)
///
/// Returns the identifier with leading separators removed.
pub fn validate_relative_path(identifier: &str) -> Result<&str, TransferError> {
    let trimmed = identifier.trim_start_matches('/');
    if trimmed.trim_matches('/').is_empty() {
        return Err(TransferError::InvalidPath("empty path".into()));
    }

    if trimmed.starts_with('\\') || has_drive_prefix(trimmed) {
        return Err(TransferError::InvalidPath(format!(
            "path prefix not allowed: {identifier}"
        )));
    }

    for component in Path::new(trimmed).components() {
        match component {
            Component::ParentDir => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {identifier}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(TransferError::InvalidPath(format!(
                    "path prefix not allowed: {identifier}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(trimmed)
}
/// `C:`, `C:\` or `C:/` at the start of `path`. A colon inside a plain name
/// `C:`, `C:\\` or `C:/` at the start of `path`. A colon inside a plain name
/// such as `x:batch` is not a drive.
fn has_drive_prefix(path: &str) -> bool {
    match path.as_bytes() {
        [letter, b':'] => letter.is_ascii_alphabetic(),
        [letter, b':', b'\\' | b'/', ..] => letter.is_ascii_alphabetic(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_path() {
        assert!(validate_relative_path("").is_err());
        assert!(validate_relative_path("/").is_err());
        assert!(validate_relative_path("///").is_err());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(validate_relative_path("../../../etc/passwd").is_err());
        assert!(validate_relative_path("/../outside").is_err());
    }

    #[test]
    fn rejects_nested_parent_dir_traversal() {
        assert!(validate_relative_path("sub/../../../escape").is_err());
    }

    #[test]
    fn rejects_windows_prefixes() {
        assert!(validate_relative_path("C:\\Windows").is_err());
        assert!(validate_relative_path("\\\\server\\share").is_err());
        assert!(validate_relative_path("d:/data").is_err());
        assert!(validate_relative_path("e:").is_err());
    }

    #[test]
    fn colon_inside_name_is_allowed() {
        assert_eq!(validate_relative_path("x:batch").unwrap(), "x:batch");
        assert_eq!(validate_relative_path("x1:batch").unwrap(), "x1:batch");
        assert_eq!(validate_relative_path("7:batch").unwrap(), "7:batch");
        assert_eq!(validate_relative_path("/batch:2024").unwrap(), "batch:2024");
    }

    #[test]
    fn strips_leading_separators() {
        assert_eq!(validate_relative_path("/batch-7").unwrap(), "batch-7");
        assert_eq!(validate_relative_path("//batch-7/day1").unwrap(), "batch-7/day1");
    }

    #[test]
    fn accepts_plain_identifiers() {
        assert_eq!(validate_relative_path("batch-7").unwrap(), "batch-7");
        assert_eq!(validate_relative_path(".hidden/dir").unwrap(), ".hidden/dir");
        assert_eq!(validate_relative_path("./batch").unwrap(), "./batch");
    }
}
