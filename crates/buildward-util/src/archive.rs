//! Zip archiving of report directories.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Component, Path};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::UtilError;
use crate::fs::{collect_entries, ensure_dir, remove_file_if_exists};

/// Summary of a written archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Number of file entries written.
    pub files: usize,
    /// Number of directory entries written.
    pub directories: usize,
}

/// Archive the full contents of `src` into the zip file `dest`.
///
/// Entry names are relative to `src`, joined with `/`; directories get a
/// trailing `/`. Entries are written in sorted order with a fixed timestamp
/// so identical trees produce identical archives.
///
/// The archive is written to a temporary file beside `dest` and renamed into
/// place, so `dest` either holds a complete archive or is left untouched.
///
/// # Errors
/// Returns an error if `src` cannot be walked, a file cannot be read, or the
/// archive cannot be written or renamed into place.
pub fn zip_dir(src: &Path, dest: &Path) -> Result<ArchiveStats, UtilError> {
    let entries = collect_entries(src)?;

    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }

    let file_name = dest
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("archive.zip");
    let tmp_name = format!(".tmp-{file_name}-{}", std::process::id());
    let tmp_path = dest.with_file_name(tmp_name);

    let result = write_archive(src, &entries, &tmp_path);
    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            let _ = remove_file_if_exists(&tmp_path);
            return Err(e);
        }
    };

    if let Err(source) = std::fs::rename(&tmp_path, dest) {
        let _ = remove_file_if_exists(&tmp_path);
        return Err(UtilError::Io {
            path: dest.display().to_string(),
            source,
        });
    }

    tracing::debug!(
        src = %src.display(),
        dest = %dest.display(),
        files = stats.files,
        directories = stats.directories,
        "wrote zip archive"
    );
    Ok(stats)
}

fn write_archive(
    src: &Path,
    entries: &[crate::fs::DirEntry],
    tmp_path: &Path,
) -> Result<ArchiveStats, UtilError> {
    let archive_err = |message: String| UtilError::Archive {
        path: tmp_path.display().to_string(),
        message,
    };

    let file = File::create(tmp_path).map_err(|source| UtilError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    let mut stats = ArchiveStats {
        files: 0,
        directories: 0,
    };

    for entry in entries {
        let name = entry_name(&entry.relative).ok_or_else(|| {
            archive_err(format!(
                "entry {} under {} is not valid UTF-8",
                entry.relative.display(),
                src.display()
            ))
        })?;

        if entry.is_dir {
            zip.add_directory(format!("{name}/"), options)
                .map_err(|e| archive_err(e.to_string()))?;
            stats.directories = stats.directories.saturating_add(1);
        } else {
            zip.start_file(name, options)
                .map_err(|e| archive_err(e.to_string()))?;
            let mut input = File::open(&entry.path).map_err(|source| UtilError::Io {
                path: entry.path.display().to_string(),
                source,
            })?;
            std::io::copy(&mut input, &mut zip).map_err(|source| UtilError::Io {
                path: entry.path.display().to_string(),
                source,
            })?;
            stats.files = stats.files.saturating_add(1);
        }
    }

    let mut writer = zip.finish().map_err(|e| archive_err(e.to_string()))?;
    writer.flush().map_err(|source| UtilError::Io {
        path: tmp_path.display().to_string(),
        source,
    })?;

    Ok(stats)
}

/// Join the normal components of `relative` with `/`.
fn entry_name(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// List the entry names of a zip archive in archive order.
///
/// # Errors
/// Returns an error if the file cannot be opened or is not a valid zip archive.
pub fn list_zip(path: &Path) -> Result<Vec<String>, UtilError> {
    let file = File::open(path).map_err(|source| UtilError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let archive_err = |e: zip::result::ZipError| UtilError::Archive {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    let mut archive = ZipArchive::new(file).map_err(archive_err)?;
    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index).map_err(archive_err)?;
        names.push(entry.name().to_owned());
    }
    Ok(names)
}
