use crate::error::Error;
use chrono::{DateTime, Utc};
use glob::Pattern;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

const WORKBOOK_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];
const LOCK_FILE_PREFIX: &str = "~$";

/// Identity of a spreadsheet on disk, used for change detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    pub relative_path: String,
    pub file_name: String,
    /// blake3 hex digest, empty when the file could not be read.
    pub checksum: String,
    pub last_modified: DateTime<Utc>,
}

/// Recursively lists spreadsheet files below `root`, as sorted `/`-separated
/// paths relative to it. Office lock files (`~$...`) and anything matching an
/// ignore glob (tested against the relative path and the bare name) are left
/// out.
pub fn discover_workbooks(root: &Path, ignore_globs: &[String]) -> Result<Vec<String>, Error> {
    if !root.is_dir() {
        return Err(Error::NotFound {
            path: root.to_path_buf(),
        });
    }

    let ignore_patterns: Vec<Pattern> = ignore_globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    let is_ignored = |path: &Path| -> bool {
        let Some(relative) = relative_key(root, path) else {
            return false;
        };
        if relative.is_empty() {
            return false;
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        ignore_patterns
            .iter()
            .any(|pattern| pattern.matches(&relative) || pattern.matches(&name))
    };

    let mut workbooks = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry.path()))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error walking {}: {}", root.display(), err);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy();
        if !is_workbook_candidate(&file_name) {
            continue;
        }

        if let Some(relative) = relative_key(root, entry.path()) {
            workbooks.push(relative);
        }
    }

    workbooks.sort();
    debug!("Discovered {} workbooks under {}", workbooks.len(), root.display());
    Ok(workbooks)
}

pub fn is_workbook_candidate(file_name: &str) -> bool {
    if file_name.starts_with(LOCK_FILE_PREFIX) {
        return false;
    }
    Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| WORKBOOK_EXTENSIONS.contains(&ext.as_str()))
}

fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

/// Reads metadata and content hash for one file below `root`.
pub fn fingerprint(root: &Path, relative_path: &str) -> Result<FileFingerprint, Error> {
    let full_path = root.join(relative_path);
    let metadata = fs::metadata(&full_path)?;
    let last_modified: DateTime<Utc> = metadata.modified()?.into();

    let checksum = match hash_file(&full_path) {
        Ok(hash) => hash,
        Err(err) => {
            warn!("Failed to calculate checksum for {}: {}", full_path.display(), err);
            String::new()
        }
    };

    let file_name = full_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(FileFingerprint {
        relative_path: relative_path.to_string(),
        file_name,
        checksum,
        last_modified,
    })
}

/// Fingerprints files in parallel. Only raw bytes are read here; results come
/// back in input order.
pub fn fingerprint_all(
    root: &Path,
    relative_paths: &[String],
) -> Vec<(String, Result<FileFingerprint, Error>)> {
    relative_paths
        .par_iter()
        .map(|relative| (relative.clone(), fingerprint(root, relative)))
        .collect()
}

pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
