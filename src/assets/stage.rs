//! Build-directory housekeeping and staging into the sketch data directory.

use super::compress::{is_compressed, is_license_file};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// All regular files below `dir`, sorted. A missing `dir` yields nothing.
pub fn collect_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if dir.is_dir() {
        walk_dir(dir, &mut files)?;
    }
    files.sort();
    Ok(files)
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// Delete every `*.LICENSE.txt` below `dir`. Returns how many were removed.
pub fn remove_license_files(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for file in collect_files(dir)? {
        if is_license_file(&file) {
            fs::remove_file(&file)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Files and directories written by one staging pass, in creation order.
///
/// Anything that was already in the staging directory is not listed, so
/// removing what is listed never touches files the operator put there.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StagedPaths {
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl StagedPaths {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    /// Fold another pass into this one.
    pub fn extend(&mut self, other: StagedPaths) {
        self.files.extend(other.files);
        self.dirs.extend(other.dirs);
    }

    /// Delete the staged files, then the directories staging created, deepest
    /// first. A directory that still holds foreign files is left in place.
    ///
    /// Never fails; returns how many paths were removed and forgets them.
    pub fn remove(&mut self) -> usize {
        let mut removed = 0;
        for file in self.files.drain(..) {
            match fs::remove_file(&file) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("[Cleanup] Could not remove {}: {}", file.display(), e),
            }
        }
        for dir in self.dirs.drain(..).rev() {
            match fs::remove_dir(&dir) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::debug!("[Cleanup] Keeping {}: {}", dir.display(), e),
            }
        }
        removed
    }
}

/// Copy the `.gz` files of `src` into `dest`, mirroring the directory tree.
///
/// `dest` may already exist; files in it are overwritten, never removed.
/// On failure whatever this pass already wrote is removed again.
pub fn stage_compressed(src: &Path, dest: &Path) -> io::Result<StagedPaths> {
    let mut staged = StagedPaths::default();
    let result =
        create_dir_tracked(dest, &mut staged).and_then(|()| copy_filtered(src, dest, &mut staged));
    match result {
        Ok(()) => Ok(staged),
        Err(e) => {
            staged.remove();
            Err(e)
        }
    }
}

/// `create_dir_all` that records every directory it actually creates.
fn create_dir_tracked(dir: &Path, staged: &mut StagedPaths) -> io::Result<()> {
    let missing: Vec<&Path> = dir
        .ancestors()
        .take_while(|path| !path.as_os_str().is_empty() && !path.exists())
        .collect();
    for path in missing.into_iter().rev() {
        fs::create_dir(path)?;
        staged.dirs.push(path.to_path_buf());
    }
    Ok(())
}

fn copy_filtered(src: &Path, dest: &Path, staged: &mut StagedPaths) -> io::Result<()> {
    for entry in fs::read_dir(src)? {
        let path = entry?.path();
        let target = dest.join(path.file_name().unwrap_or_default());

        if path.is_dir() {
            create_dir_tracked(&target, staged)?;
            copy_filtered(&path, &target, staged)?;
        } else if path.is_file() && is_compressed(&path) {
            fs::copy(&path, &target)?;
            staged.files.push(target);
        }
    }
    Ok(())
}

/// Number of regular files below `dir` (0 when it does not exist).
pub fn count_regular_files(dir: &Path) -> io::Result<usize> {
    Ok(collect_files(dir)?.len())
}
