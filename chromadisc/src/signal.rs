//! Global abort handler (spec §5 "Cancellation", §9 "Global mutable state"): SIGINT/SIGTERM/
//! SIGHUP flip one process-wide flag that [`crate::commands::burn`] polls into the per-drive
//! `cancel` `AtomicBool` the Drive Lifecycle Engine's write loop already checks. Installation is
//! explicit and only happens around `burn`, which is the only subcommand holding a drive open
//! for a write long enough for a signal to matter.

use std::sync::atomic::{AtomicBool, Ordering};

static ABORT_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_sig: libc::c_int) {
    ABORT_REQUESTED.store(true, Ordering::SeqCst);
}

/// Install handlers for SIGINT/SIGTERM/SIGHUP. Safe to call more than once; later calls just
/// re-install the same handler.
pub fn install() {
    unsafe {
        libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGHUP, on_signal as libc::sighandler_t);
    }
}

/// True once a signal has been observed; `burn` polls this into the write loop's own cancel
/// flag rather than letting it drive cancellation directly, so a future caller using the
/// library without a CLI sees no hidden global state.
pub fn abort_requested() -> bool {
    ABORT_REQUESTED.load(Ordering::SeqCst)
}
