//! Pipeline State Management and Phase Tracking
//!
//! **Architecture**:
//! - `PipelinePhase`: discrete stages of a deployment run
//! - `PipelineState`: current phase plus the ordered list of visited phases
//! - `PipelineResult`: terminal outcome reported to the operator
//!
//! The orchestrator moves through the phases linearly; the only branches are
//! the optional image build and the optional image flash.

use crate::error::DeployError;
use crate::models::FilesystemImage;
use std::time::{Duration, Instant};

/// Deployment phase enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePhase {
    Start,

    /// Bundle, strip, compress and stage web assets
    BuildAssets,

    /// Ask arduino-cli for its data directory
    ProbeConfig,

    /// Find mkspiffs below the data directory
    LocateTool,

    /// Pack the staged directory into a SPIFFS image (only with assets)
    BuildImage,

    CompileFirmware,

    /// Write the SPIFFS image (only when an image is available)
    FlashImage,

    FlashFirmware,

    Done,

    Failed,
}

impl PipelinePhase {
    /// Get the human-readable name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelinePhase::Start => "start",
            PipelinePhase::BuildAssets => "build-assets",
            PipelinePhase::ProbeConfig => "probe-config",
            PipelinePhase::LocateTool => "locate-tool",
            PipelinePhase::BuildImage => "build-image",
            PipelinePhase::CompileFirmware => "compile-firmware",
            PipelinePhase::FlashImage => "flash-image",
            PipelinePhase::FlashFirmware => "flash-firmware",
            PipelinePhase::Done => "done",
            PipelinePhase::Failed => "failed",
        }
    }

    /// Get all valid phase transitions FROM this phase.
    pub fn valid_next_phases(&self) -> &'static [PipelinePhase] {
        use PipelinePhase::*;
        match self {
            Start => &[BuildAssets, Failed],
            BuildAssets => &[ProbeConfig, Failed],
            ProbeConfig => &[LocateTool, Failed],
            LocateTool => &[BuildImage, CompileFirmware, Failed],
            BuildImage => &[CompileFirmware, Failed],
            CompileFirmware => &[FlashImage, FlashFirmware, Failed],
            FlashImage => &[FlashFirmware, Failed],
            FlashFirmware => &[Done, Failed],
            Done | Failed => &[],
        }
    }

    /// Check if a transition to the given phase is valid.
    pub fn can_transition_to(&self, next: PipelinePhase) -> bool {
        self.valid_next_phases().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::Done | PipelinePhase::Failed)
    }
}

/// Progress of a single run.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub phase: PipelinePhase,

    /// Every phase entered, in order, excluding `Start`
    pub visited: Vec<PipelinePhase>,

    pub start_time: Instant,
}

impl PipelineState {
    pub fn new() -> Self {
        PipelineState {
            phase: PipelinePhase::Start,
            visited: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Attempt to transition to the next phase.
    pub fn transition_to(&mut self, next_phase: PipelinePhase) -> Result<(), String> {
        if !self.phase.can_transition_to(next_phase) {
            return Err(format!(
                "Invalid phase transition: {} -> {}",
                self.phase.as_str(),
                next_phase.as_str()
            ));
        }
        self.phase = next_phase;
        self.visited.push(next_phase);
        Ok(())
    }

    /// Mark the run as failed from whatever phase it is in.
    pub fn record_failure(&mut self) {
        if !self.phase.is_terminal() {
            self.phase = PipelinePhase::Failed;
            self.visited.push(PipelinePhase::Failed);
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal state of a run.
#[derive(Debug)]
pub enum PipelineResult {
    Success,
    Failed(DeployError),
}

impl PipelineResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success)
    }

    pub fn error(&self) -> Option<&DeployError> {
        match self {
            PipelineResult::Success => None,
            PipelineResult::Failed(e) => Some(e),
        }
    }

    /// Process exit status for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineResult::Success => 0,
            PipelineResult::Failed(e) => e.exit_code(),
        }
    }
}

/// Everything a caller needs to know about a finished run.
#[derive(Debug)]
pub struct PipelineRun {
    pub result: PipelineResult,

    /// Phases entered, in order, ending in `Done` or `Failed`
    pub phases: Vec<PipelinePhase>,

    /// Image written to the device, if any
    pub flashed_image: Option<FilesystemImage>,

    /// Artifacts the cleaner removed on exit
    pub cleaned: usize,

    pub elapsed: Duration,
}

impl PipelineRun {
    pub fn ran(&self, phase: PipelinePhase) -> bool {
        self.phases.contains(&phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert!(PipelinePhase::Start.can_transition_to(PipelinePhase::BuildAssets));
        assert!(PipelinePhase::LocateTool.can_transition_to(PipelinePhase::CompileFirmware));
        assert!(PipelinePhase::CompileFirmware.can_transition_to(PipelinePhase::FlashFirmware));
        assert!(!PipelinePhase::Start.can_transition_to(PipelinePhase::CompileFirmware));
        assert!(!PipelinePhase::ProbeConfig.can_transition_to(PipelinePhase::BuildImage));
    }

    #[test]
    fn test_terminal_phases_have_no_successors() {
        assert!(PipelinePhase::Done.valid_next_phases().is_empty());
        assert!(PipelinePhase::Failed.valid_next_phases().is_empty());
    }

    #[test]
    fn test_transition_records_visited() {
        let mut state = PipelineState::new();
        assert!(state.transition_to(PipelinePhase::BuildAssets).is_ok());
        assert!(state.transition_to(PipelinePhase::ProbeConfig).is_ok());
        assert_eq!(state.phase, PipelinePhase::ProbeConfig);
        assert_eq!(
            state.visited,
            vec![PipelinePhase::BuildAssets, PipelinePhase::ProbeConfig]
        );
    }

    #[test]
    fn test_invalid_phase_transition() {
        let mut state = PipelineState::new();
        assert!(state.transition_to(PipelinePhase::FlashImage).is_err());
        assert_eq!(state.phase, PipelinePhase::Start);
        assert!(state.visited.is_empty());
    }

    #[test]
    fn test_record_failure_once() {
        let mut state = PipelineState::new();
        state.transition_to(PipelinePhase::BuildAssets).expect("valid");
        state.record_failure();
        state.record_failure();
        assert_eq!(
            state.visited,
            vec![PipelinePhase::BuildAssets, PipelinePhase::Failed]
        );
    }

    #[test]
    fn test_result_exit_codes() {
        assert_eq!(PipelineResult::Success.exit_code(), 0);
        assert!(PipelineResult::Success.error().is_none());
        let failed = PipelineResult::Failed(DeployError::Interrupted);
        assert_eq!(failed.exit_code(), 130);
        assert!(!failed.is_success());
    }
}
