//! SIGINT → process-wide latch → polled-by-main-loop cancellation. The only
//! signal-safe action available to us is flipping an atomic; the debugger
//! itself never runs inside the handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static LATCH: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Installs a SIGINT handler that sets the process-wide stop latch.
/// Idempotent: a second call is a no-op beyond the first registration.
pub fn install() -> std::io::Result<()> {
    if LATCH.get().is_some() {
        return Ok(());
    }
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))?;
    let _ = LATCH.set(flag);
    Ok(())
}

/// Polled at most once per instruction from the main loop. `false` until
/// [`install`] has run and SIGINT has actually arrived.
pub fn take_stop_request() -> bool {
    match LATCH.get() {
        Some(flag) => flag.swap(false, Ordering::Relaxed),
        None => false,
    }
}
