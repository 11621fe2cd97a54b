//! Deployment Orchestration: assets -> toolchain -> image -> compile -> flash.
//!
//! ```text
//! Start -> BuildAssets -> ProbeConfig -> LocateTool
//!       -> [assets staged?] -> BuildImage -> CompileFirmware
//!       -> [image available?] -> FlashImage -> FlashFirmware -> Done
//! ```
//!
//! Any failure jumps to `Failed`. Cleanup runs on every exit path, including
//! interrupts and panics.

pub mod cleanup;
pub mod state;

pub use cleanup::{CleanupGuard, WorkspaceCleaner};
pub use state::{PipelinePhase, PipelineResult, PipelineRun, PipelineState};

use crate::assets::{path_arg, AssetPreparer};
use crate::config::DeployConfig;
use crate::error::{DeployError, ToolError};
use crate::models::{FilesystemImage, PackagingMode, ToolBinaryPath};
use crate::system::{signals, CommandTemplate, ToolRunner};
use crate::toolchain::{get_toolchain_config, ToolLocator};

/// Drives one deployment run.
pub struct PipelineOrchestrator<'a> {
    config: &'a DeployConfig,
    runner: &'a dyn ToolRunner,
    mode: PackagingMode,
    port: String,
    state: PipelineState,
}

impl<'a> PipelineOrchestrator<'a> {
    /// # Arguments
    /// * `config` - Resolved settings, rooted at the workspace
    /// * `runner` - Executes every external tool
    /// * `mode` - Packaging mode selected on the command line
    /// * `port` - Serial port of the board
    pub fn new(
        config: &'a DeployConfig,
        runner: &'a dyn ToolRunner,
        mode: PackagingMode,
        port: impl Into<String>,
    ) -> Self {
        PipelineOrchestrator {
            config,
            runner,
            mode,
            port: port.into(),
            state: PipelineState::new(),
        }
    }

    /// Run the whole pipeline and clean the workspace afterwards.
    ///
    /// Never returns early: the outcome, including the failure, is carried in
    /// the returned [`PipelineRun`].
    pub fn run(mut self) -> PipelineRun {
        let cleaner = WorkspaceCleaner::new(self.config);
        let guard = CleanupGuard::new(&cleaner);

        crate::log_parsed!(
            "[Pipeline] [START] Deploying to {} ({} mode)",
            self.port,
            self.mode
        );

        let outcome = self.execute(&cleaner);

        let (result, flashed_image) = match outcome {
            Ok(image) => {
                self.enter_terminal(PipelinePhase::Done);
                crate::log_parsed!(
                    "[Pipeline] [DONE] Deployment finished in {:.1}s",
                    self.state.elapsed().as_secs_f64()
                );
                (PipelineResult::Success, image)
            }
            Err(e) => {
                log::error!(
                    "[Pipeline] [{}] {}",
                    self.state.phase.as_str().to_uppercase(),
                    e
                );
                self.state.record_failure();
                (PipelineResult::Failed(e), None)
            }
        };

        let cleaned = guard.finish();
        log::debug!("[Pipeline] [CLEANUP] Removed {} artifact(s)", cleaned);

        PipelineRun {
            result,
            phases: self.state.visited.clone(),
            flashed_image,
            cleaned,
            elapsed: self.state.elapsed(),
        }
    }

    fn execute(
        &mut self,
        cleaner: &WorkspaceCleaner,
    ) -> Result<Option<FilesystemImage>, DeployError> {
        let config = self.config;

        // PHASE 1: web assets
        self.enter(PipelinePhase::BuildAssets)?;
        let prepared = AssetPreparer::new(config, self.runner).prepare(self.mode)?;
        let assets_present = prepared.assets_present();
        cleaner.track_staged(prepared.staged);

        // PHASE 2: toolchain configuration
        self.enter(PipelinePhase::ProbeConfig)?;
        let dump = CommandTemplate::new(&config.commands.config_dump)
            .render(&[])
            .map_err(DeployError::ToolchainUnavailable)?;
        let toolchain = get_toolchain_config(self.runner, &dump, &config.workspace_dir)?;
        let data_dir = toolchain.data_dir()?;
        log::debug!("[Pipeline] Toolchain data directory: {}", data_dir.display());

        // PHASE 3: image builder discovery
        self.enter(PipelinePhase::LocateTool)?;
        let tool = ToolLocator::new(&config.paths.tool_search_subdir)
            .locate(&data_dir, &config.paths.tool_pattern)?;
        crate::log_parsed!("[Pipeline] [LOCATE] Using {}", tool);

        // PHASE 4: filesystem image, only when something was staged
        let built = if assets_present {
            self.enter(PipelinePhase::BuildImage)?;
            Some(self.build_image(tool)?)
        } else {
            log::info!("[Pipeline] No staged assets, skipping image build");
            None
        };

        // PHASE 5: firmware
        self.enter(PipelinePhase::CompileFirmware)?;
        self.compile_firmware()?;

        // An image left in place by the operator is flashed when none was built
        let image = built.or_else(|| FilesystemImage::pre_placed(&config.image_path()));

        // PHASE 6: flashing
        if let Some(ref image) = image {
            self.enter(PipelinePhase::FlashImage)?;
            self.flash_image(image)?;
        }

        self.enter(PipelinePhase::FlashFirmware)?;
        self.flash_firmware()?;

        Ok(image)
    }

    fn build_image(&self, tool: ToolBinaryPath) -> Result<FilesystemImage, DeployError> {
        let config = self.config;
        crate::log_parsed!("[Pipeline] [IMAGE] Building SPIFFS image...");

        let vars = [
            ("tool", path_arg(tool.as_path())),
            ("data_dir", path_arg(&config.staging_dir(self.mode))),
            ("page_size", config.image.page_size.to_string()),
            ("block_size", config.image.block_size.to_string()),
            ("image_size", config.image.image_size.to_string()),
            ("image", path_arg(&config.paths.image_file)),
        ];
        self.run_stage(&config.commands.image_builder, &vars, DeployError::ImageBuild)?;

        let image_path = config.image_path();
        if !image_path.is_file() {
            return Err(DeployError::ImageBuild(ToolError::MissingOutput {
                program: tool
                    .into_path_buf()
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: image_path.display().to_string(),
            }));
        }

        Ok(FilesystemImage::built(image_path))
    }

    fn compile_firmware(&self) -> Result<(), DeployError> {
        crate::log_parsed!("[Pipeline] [COMPILE] Compiling sketch...");
        let vars = [
            ("fqbn_compile", self.config.flash.fqbn_compile.clone()),
            ("sketch", path_arg(self.config.sketch_dir(self.mode))),
        ];
        self.run_stage(&self.config.commands.compile, &vars, DeployError::Compile)
    }

    fn flash_image(&self, image: &FilesystemImage) -> Result<(), DeployError> {
        crate::log_parsed!(
            "[Pipeline] [FLASH] Writing filesystem image ({:?}) at {}...",
            image.origin,
            self.config.flash.address
        );
        let vars = [
            ("port", self.port.clone()),
            ("baud", self.config.flash.baud.to_string()),
            ("address", self.config.flash.address.clone()),
            ("image", path_arg(&image.path)),
        ];
        self.run_stage(&self.config.commands.flash_image, &vars, DeployError::Flash)
    }

    fn flash_firmware(&self) -> Result<(), DeployError> {
        crate::log_parsed!("[Pipeline] [FLASH] Uploading firmware...");
        let vars = [
            ("port", self.port.clone()),
            ("fqbn_upload", self.config.flash.fqbn_upload.clone()),
            ("sketch", path_arg(self.config.sketch_dir(self.mode))),
        ];
        self.run_stage(&self.config.commands.flash_firmware, &vars, DeployError::Flash)
    }

    /// Render `template` and run it in the workspace, classifying failures
    /// with `classify` (interrupts excepted).
    fn run_stage(
        &self,
        template: &str,
        vars: &[(&str, String)],
        classify: fn(ToolError) -> DeployError,
    ) -> Result<(), DeployError> {
        let command = CommandTemplate::new(template).render(vars).map_err(classify)?;
        self.runner
            .run(&command, &self.config.workspace_dir)
            .map(|_| ())
            .map_err(|e| match e {
                ToolError::Interrupted(_) => DeployError::Interrupted,
                other => classify(other),
            })
    }

    /// Move to `phase`, bailing out if an interrupt arrived in between.
    fn enter(&mut self, phase: PipelinePhase) -> Result<(), DeployError> {
        if signals::interrupted() {
            log::warn!(
                "[Pipeline] Interrupt received before {}",
                phase.as_str()
            );
            return Err(DeployError::Interrupted);
        }

        if let Err(e) = self.state.transition_to(phase) {
            log::error!("[Pipeline] {}", e);
        }
        log::debug!("[Pipeline] Entering {}", phase.as_str());
        Ok(())
    }

    fn enter_terminal(&mut self, phase: PipelinePhase) {
        if let Err(e) = self.state.transition_to(phase) {
            log::error!("[Pipeline] {}", e);
        }
    }
}
