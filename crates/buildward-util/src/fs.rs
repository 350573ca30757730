//! Filesystem utilities for buildward.

use std::path::{Path, PathBuf};

use crate::error::UtilError;

/// Create a directory and all parent directories if they do not exist.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> Result<(), UtilError> {
    std::fs::create_dir_all(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Copy `src` to `dest`, creating parent directories and replacing any existing file.
///
/// Returns the number of bytes copied.
///
/// # Errors
/// Returns an error if `src` cannot be read or `dest` cannot be written.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64, UtilError> {
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    remove_file_if_exists(dest)?;
    std::fs::copy(src, dest).map_err(|source| UtilError::Io {
        path: dest.display().to_string(),
        source,
    })
}

/// Remove a file. No error if the file is absent.
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn remove_file_if_exists(path: &Path) -> Result<(), UtilError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(UtilError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Return the final component of `path` as UTF-8, if it has one.
pub fn file_name_str(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// A single entry found below a directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    /// Path relative to the walked root.
    pub relative: PathBuf,
    /// Absolute (or root-joined) path on disk.
    pub path: PathBuf,
    /// Whether the entry is a directory.
    pub is_dir: bool,
}

/// Collect every file and directory under `dir`, recursively, sorted by relative path.
///
/// The root itself is not included. Symlinks are followed the same way
/// `Path::is_dir` follows them.
///
/// # Errors
/// Returns an error if `dir` or any directory below it cannot be read.
pub fn collect_entries(dir: &Path) -> Result<Vec<DirEntry>, UtilError> {
    let mut entries = Vec::new();
    collect_entries_recursive(dir, Path::new(""), &mut entries)?;
    entries.sort();
    Ok(entries)
}

fn collect_entries_recursive(
    dir: &Path,
    relative: &Path,
    out: &mut Vec<DirEntry>,
) -> Result<(), UtilError> {
    let read = std::fs::read_dir(dir).map_err(|source| UtilError::Io {
        path: dir.display().to_string(),
        source,
    })?;

    for entry in read {
        let entry = entry.map_err(|source| UtilError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        let rel = relative.join(entry.file_name());

        if path.is_dir() {
            out.push(DirEntry {
                relative: rel.clone(),
                path: path.clone(),
                is_dir: true,
            });
            collect_entries_recursive(&path, &rel, out)?;
        } else {
            out.push(DirEntry {
                relative: rel,
                path,
                is_dir: false,
            });
        }
    }

    Ok(())
}

/// Return all regular files under `dir` matching the glob `pattern`, sorted by path.
///
/// Only `pattern` is interpreted as a glob; `dir` is matched literally, so
/// directory names containing `[`, `]`, `*` or `?` still work. A missing `dir`
/// matches nothing.
///
/// # Errors
/// Returns an error if the pattern is invalid.
pub fn glob_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, UtilError> {
    let escaped_dir = glob::Pattern::escape(&dir.display().to_string());
    let full_pattern = Path::new(&escaped_dir).join(pattern);
    let full_pattern_str = full_pattern.display().to_string();

    let mut paths: Vec<PathBuf> = glob::glob(&full_pattern_str)
        .map_err(|e| UtilError::GlobPattern {
            pattern: full_pattern_str.clone(),
            message: e.to_string(),
        })?
        .filter_map(Result::ok)
        .filter(|p| p.is_file())
        .collect();

    paths.sort();
    Ok(paths)
}
