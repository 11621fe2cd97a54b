//! Workspace cleanup.
//!
//! Every artifact a run creates is regenerable and run-scoped. Leaving one
//! behind breaks the next run (a stale `fs.out` would be flashed as if it had
//! just been built), so the cleaner runs on every exit path.
//!
//! The staging directory is shared with the operator, so only the paths
//! staging reported as its own are removed there.

use crate::assets::StagedPaths;
use crate::config::DeployConfig;
use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Removes the transient artifacts of a run.
#[derive(Debug)]
pub struct WorkspaceCleaner {
    targets: Vec<PathBuf>,
    staged: RefCell<StagedPaths>,
}

impl WorkspaceCleaner {
    /// Cleaner for a run in the workspace of `config`.
    ///
    /// Fixed targets: the build directory, the generated header and the
    /// image. Staged assets are added with [`WorkspaceCleaner::track_staged`].
    pub fn new(config: &DeployConfig) -> Self {
        WorkspaceCleaner {
            targets: vec![config.build_dir(), config.header_path(), config.image_path()],
            staged: RefCell::new(StagedPaths::default()),
        }
    }

    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }

    /// Remember files and directories staging created so cleanup removes them.
    pub fn track_staged(&self, staged: StagedPaths) {
        self.staged.borrow_mut().extend(staged);
    }

    /// Remove staged paths and every fixed target that exists. Never fails;
    /// safe to call repeatedly.
    ///
    /// Returns how many paths were actually removed.
    pub fn cleanup(&self) -> usize {
        let mut removed = self.staged.borrow_mut().remove();
        for target in &self.targets {
            match remove_path(target) {
                Ok(true) => {
                    log::debug!("[Cleanup] Removed {}", target.display());
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    log::warn!("[Cleanup] Could not remove {}: {}", target.display(), e);
                }
            }
        }
        removed
    }
}

/// Remove a file or directory tree without following symlinks.
///
/// `Ok(false)` when there was nothing to remove.
fn remove_path(path: &Path) -> io::Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    Ok(true)
}

/// Runs the cleaner exactly once: explicitly through [`CleanupGuard::finish`],
/// or on drop if the pipeline unwinds before reaching it.
pub struct CleanupGuard<'a> {
    cleaner: &'a WorkspaceCleaner,
    done: bool,
}

impl<'a> CleanupGuard<'a> {
    pub fn new(cleaner: &'a WorkspaceCleaner) -> Self {
        CleanupGuard {
            cleaner,
            done: false,
        }
    }

    pub fn finish(mut self) -> usize {
        self.done = true;
        self.cleaner.cleanup()
    }
}

impl Drop for CleanupGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.done = true;
            self.cleaner.cleanup();
        }
    }
}
