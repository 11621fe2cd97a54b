//! Image-builder discovery below the toolchain data directory.
//!
//! Board packages install tools as `tools/<tool>/<version>/<binary>`, with a
//! version directory that changes on every update. The locator walks down
//! through single-child directories until it finds a file whose name contains
//! the requested pattern, so no version string is ever hardcoded.
//!
//! Directory access goes through [`DirectoryListing`] so the descent logic can
//! be exercised against an in-memory tree.

use crate::error::DeployError;
use crate::models::ToolBinaryPath;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Guard against symlink cycles in a corrupted toolchain install.
const MAX_DESCENT_DEPTH: usize = 32;

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
}

impl DirEntryInfo {
    pub fn file(name: &str) -> Self {
        DirEntryInfo {
            name: name.to_string(),
            is_dir: false,
        }
    }

    pub fn dir(name: &str) -> Self {
        DirEntryInfo {
            name: name.to_string(),
            is_dir: true,
        }
    }
}

/// Read access to a directory tree.
pub trait DirectoryListing {
    fn is_dir(&self, path: &Path) -> bool;

    /// Entries of `path`, in any order.
    fn list(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
}

/// Listing backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsListing;

impl DirectoryListing for FsListing {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let entry_path = entry.path();
            // Follow symlinks; skip sockets, fifos and dangling links
            let is_dir = entry_path.is_dir();
            if !is_dir && !entry_path.is_file() {
                continue;
            }
            entries.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }
        Ok(entries)
    }
}

/// Finds the image-builder executable inside a toolchain data directory.
pub struct ToolLocator<L: DirectoryListing = FsListing> {
    search_subdir: PathBuf,
    listing: L,
}

impl ToolLocator<FsListing> {
    /// Locator over the real filesystem, starting at `<root>/<search_subdir>`.
    pub fn new(search_subdir: impl Into<PathBuf>) -> Self {
        ToolLocator {
            search_subdir: search_subdir.into(),
            listing: FsListing,
        }
    }
}

impl<L: DirectoryListing> ToolLocator<L> {
    pub fn with_listing(search_subdir: impl Into<PathBuf>, listing: L) -> Self {
        ToolLocator {
            search_subdir: search_subdir.into(),
            listing,
        }
    }

    /// Return the absolute path of the first file containing `pattern`.
    ///
    /// # Errors
    /// `ToolNotFound` when the start directory is missing, or when a level has
    /// no matching file and does not have exactly one subdirectory.
    pub fn locate(&self, root_dir: &Path, pattern: &str) -> Result<ToolBinaryPath, DeployError> {
        let start = std::path::absolute(root_dir.join(&self.search_subdir)).map_err(|e| {
            DeployError::ToolNotFound(format!(
                "cannot resolve {}: {}",
                root_dir.join(&self.search_subdir).display(),
                e
            ))
        })?;

        if !self.listing.is_dir(&start) {
            return Err(DeployError::ToolNotFound(format!(
                "{} not installed ({} does not exist)",
                pattern,
                start.display()
            )));
        }

        let found = descend(&self.listing, start, pattern)?;
        log::debug!("[Locator] Found {} at {}", pattern, found.display());
        Ok(ToolBinaryPath::new(found))
    }
}

/// Walk down from `start` until a file containing `pattern` turns up.
///
/// A level with exactly one subdirectory is always descended into, even when
/// it also holds files. Otherwise every entry of the level is examined: a
/// non-matching file listed before the match does not end the search.
pub fn descend(
    listing: &dyn DirectoryListing,
    start: PathBuf,
    pattern: &str,
) -> Result<PathBuf, DeployError> {
    let mut current = start;

    for _ in 0..MAX_DESCENT_DEPTH {
        let mut entries = listing.list(&current).map_err(|e| {
            DeployError::ToolNotFound(format!("cannot read {}: {}", current.display(), e))
        })?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let mut subdirs = entries.iter().filter(|entry| entry.is_dir);
        if let (Some(only), None) = (subdirs.next(), subdirs.next()) {
            current = current.join(&only.name);
            continue;
        }

        return match entries
            .iter()
            .find(|entry| !entry.is_dir && entry.name.contains(pattern))
        {
            Some(file) => Ok(current.join(&file.name)),
            None => Err(DeployError::ToolNotFound(format!(
                "no {} binary in {}",
                pattern,
                current.display()
            ))),
        };
    }

    Err(DeployError::ToolNotFound(format!(
        "{} search exceeded {} directory levels",
        pattern, MAX_DESCENT_DEPTH
    )))
}
