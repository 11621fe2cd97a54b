//! Web asset preparation: bundle, strip, compress, stage.
//!
//! Steps run strictly in order:
//! 1. `npm run build` writes the bundle into `build/`
//! 2. `*.LICENSE.txt` notices are removed
//! 3. `public/index.htm` replaces the bundler's index
//! 4. PROGMEM mode: the gzip/C-array generator turns `build/` into a header
//! 5. SPIFFS mode: files are gzipped in place and the `.gz` copies are staged
//!    into `<sketch>/data`

pub mod compress;
pub mod stage;

use crate::config::DeployConfig;
use crate::error::{DeployError, ToolError};
use crate::models::PackagingMode;
use crate::system::{CommandTemplate, ToolRunner};
use std::fs;
use std::path::Path;

pub use stage::StagedPaths;

/// Outcome of asset preparation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreparedAssets {
    /// Regular files in the staging directory after staging
    pub staged_count: usize,

    /// What this run wrote into the staging directory
    pub staged: StagedPaths,
}

impl PreparedAssets {
    /// Whether a filesystem image has to be built.
    pub fn assets_present(&self) -> bool {
        self.staged_count > 0
    }
}

/// Produces the staged asset directory (or embedded header) for a run.
pub struct AssetPreparer<'a> {
    config: &'a DeployConfig,
    runner: &'a dyn ToolRunner,
}

impl<'a> AssetPreparer<'a> {
    pub fn new(config: &'a DeployConfig, runner: &'a dyn ToolRunner) -> Self {
        AssetPreparer { config, runner }
    }

    /// Prepare assets for `mode`.
    ///
    /// [`PreparedAssets::assets_present`] is true when the staging directory
    /// holds at least one file and a filesystem image therefore has to be
    /// built. Paths staged by this call are reported so that only they get
    /// cleaned up later.
    pub fn prepare(&self, mode: PackagingMode) -> Result<PreparedAssets, DeployError> {
        let workspace = &self.config.workspace_dir;
        let build_dir = self.config.build_dir();

        crate::log_parsed!("[Assets] Building web bundle...");
        self.run_template(&self.config.commands.bundler, &[], "web bundler")?;

        if !build_dir.is_dir() {
            return Err(DeployError::AssetPipeline(format!(
                "bundler did not produce {}",
                build_dir.display()
            )));
        }

        let removed = stage::remove_license_files(&build_dir)
            .map_err(|e| asset_io_error("removing license files", &build_dir, e))?;
        log::debug!("[Assets] Removed {} license file(s)", removed);

        let index_src = self.config.workspace_path(&self.config.paths.public_index);
        let index_name = index_src.file_name().ok_or_else(|| {
            DeployError::AssetPipeline(format!("{} is not a file path", index_src.display()))
        })?;
        fs::copy(&index_src, build_dir.join(index_name))
            .map_err(|e| asset_io_error("copying entry point", &index_src, e))?;

        match mode {
            PackagingMode::EmbeddedHeader => {
                crate::log_parsed!("[Assets] Generating PROGMEM header...");
                let vars = [
                    ("build_dir", path_arg(&self.config.paths.build_dir)),
                    ("header", path_arg(&self.config.paths.header_file)),
                ];
                self.run_template(
                    &self.config.commands.header_generator,
                    &vars,
                    "header generator",
                )?;
                log::info!(
                    "[Assets] Header written to {}",
                    self.config.header_path().display()
                );
                Ok(PreparedAssets::default())
            }
            PackagingMode::FilesystemImage => {
                let compressed = compress::compress_tree(&build_dir)
                    .map_err(|e| asset_io_error("compressing", &build_dir, e))?;
                log::debug!("[Assets] Compressed {} file(s)", compressed);

                let staging = workspace.join(self.config.staging_dir(mode));
                let mut staged = stage::stage_compressed(&build_dir, &staging)
                    .map_err(|e| asset_io_error("staging into", &staging, e))?;

                let count = match stage::count_regular_files(&staging) {
                    Ok(count) => count,
                    Err(e) => {
                        staged.remove();
                        return Err(asset_io_error("counting", &staging, e));
                    }
                };
                crate::log_parsed!(
                    "[Assets] {} file(s) staged in {}",
                    count,
                    staging.display()
                );
                Ok(PreparedAssets {
                    staged_count: count,
                    staged,
                })
            }
        }
    }

    fn run_template(
        &self,
        template: &str,
        vars: &[(&str, String)],
        what: &str,
    ) -> Result<(), DeployError> {
        let command = CommandTemplate::new(template)
            .render(vars)
            .map_err(|e| DeployError::AssetPipeline(format!("{}: {}", what, e)))?;

        self.runner
            .run(&command, &self.config.workspace_dir)
            .map(|_| ())
            .map_err(|e| match e {
                ToolError::Interrupted(_) => DeployError::Interrupted,
                other => DeployError::AssetPipeline(format!("{} failed: {}", what, other)),
            })
    }
}

fn asset_io_error(action: &str, path: &Path, e: std::io::Error) -> DeployError {
    DeployError::AssetPipeline(format!("{} {}: {}", action, path.display(), e))
}

/// Render a path for command-line interpolation.
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
