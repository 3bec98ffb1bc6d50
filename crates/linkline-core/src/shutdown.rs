//! Cooperative cancellation on SIGINT/SIGTERM

use std::sync::atomic::{AtomicBool, Ordering};

use signal_hook::consts::{SIGINT, SIGTERM};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Flag raised by the first SIGINT/SIGTERM.
///
/// Long-running loops take it as a plain `&AtomicBool` so tests can hand in
/// their own.
pub fn shutdown_flag() -> &'static AtomicBool {
    &SHUTDOWN
}

pub fn is_shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// First signal raises the flag: downloads in flight finish, nothing new
/// starts. A second signal exits with status 130.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [SIGINT, SIGTERM] {
        // SAFETY: the handler only touches an atomic and calls _exit
        unsafe {
            signal_hook::low_level::register(signal, on_signal)?;
        }
    }
    Ok(())
}

fn on_signal() {
    if raise_shutdown() {
        signal_hook::low_level::exit(130);
    }
}

/// Raise the flag, returning whether it was already raised.
fn raise_shutdown() -> bool {
    SHUTDOWN.swap(true, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_raise_reports_pending_shutdown() {
        // the only test in this crate touching the process-wide flag
        raise_shutdown();
        assert!(is_shutdown_requested());
        assert!(raise_shutdown());
        SHUTDOWN.store(false, Ordering::Relaxed);
    }
}
