//! Interrupt handling.
//!
//! SIGINT, SIGTERM and SIGHUP only raise a flag. The foreground tool receives
//! the terminal's SIGINT itself and exits, the runner reports the interruption,
//! and the pipeline unwinds through its cleanup guard instead of dying with
//! artifacts left on disk.

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_interrupt(_signal: nix::libc::c_int) {
    // Only async-signal-safe work here
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the flag-setting handler for SIGINT, SIGTERM and SIGHUP.
pub fn install_interrupt_handlers() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(handle_interrupt),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );

    for signal in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP] {
        // SAFETY: the handler only stores to an atomic.
        unsafe {
            sigaction(signal, &action)?;
        }
    }

    Ok(())
}

/// Whether an interrupt arrived since start (or the last `clear_interrupt`).
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Raise the interrupt flag without a signal.
pub fn request_interrupt() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

pub fn clear_interrupt() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}
