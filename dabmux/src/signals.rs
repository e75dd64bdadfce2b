//! Signal handling: SIGINT/SIGTERM/SIGHUP cleanly end the main loop (via
//! `ctrlc`); SIGPIPE is ignored via `signal-hook` (a dropped output
//! connection must not kill the process).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::SIGPIPE;

/// Installs the signal handlers and returns a flag the main loop should
/// poll once per tick; `true` means "stop".
pub fn install() -> anyhow::Result<Arc<AtomicBool>> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst))?;

    // SAFETY: registering a no-op action for SIGPIPE only installs a
    // signal handler; it performs no non-async-signal-safe work.
    unsafe {
        signal_hook::low_level::register(SIGPIPE, || {})?;
    }
    Ok(shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_returns_a_clear_flag() {
        let shutdown = install().unwrap();
        assert!(!shutdown.load(Ordering::Relaxed));
    }
}
