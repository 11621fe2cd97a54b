//! Interrupt flag handling. Lives in its own test binary because the flag is
//! process-global.

mod common;

use common::Fixture;
use sketch_deploy::system::signals;
use sketch_deploy::{DeployError, PackagingMode, PipelineOrchestrator, PipelinePhase};
use std::fs;

#[test]
fn test_interrupt_before_first_stage() {
    let fixture = Fixture::new();
    let config = fixture.config();
    fs::create_dir_all(fixture.root().join("build")).expect("mkdir build");
    fs::write(fixture.root().join("fs.out"), b"stale").expect("write image");
    let runner = fixture.runner(&[]);

    signals::request_interrupt();
    let run =
        PipelineOrchestrator::new(&config, &runner, PackagingMode::FilesystemImage, "COM3").run();
    signals::clear_interrupt();

    assert!(matches!(run.result.error(), Some(DeployError::Interrupted)));
    assert_eq!(run.result.exit_code(), 130);
    assert_eq!(run.phases, vec![PipelinePhase::Failed]);
    assert!(runner.calls.borrow().is_empty());

    // Leftovers from an earlier run are swept too
    assert!(!fixture.root().join("build").exists());
    assert!(!fixture.root().join("fs.out").exists());
}
