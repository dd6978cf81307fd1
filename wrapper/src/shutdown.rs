//! Cooperative shutdown signalling.
//!
//! A [`ShutdownToken`] is a cheap clonable flag set exactly once. The process
//! signal handlers set it from SIGINT/SIGTERM; the supervisor observes it
//! while racing the child's natural exit. Setting an atomic flag is
//! async-signal-safe, which is the whole reason the token is not built on a
//! channel or mutex.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// A one-way cancellation flag shared between the signal handler and the
/// supervisor.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    /// Create a token in the not-cancelled state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether shutdown has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Token the installed signal handlers cancel.
static SIGNAL_TOKEN: OnceLock<ShutdownToken> = OnceLock::new();

/// Install SIGINT and SIGTERM handlers that cancel `token`.
///
/// Only the first installed token is wired up; later calls are ignored, so
/// this is intended for the process entrypoint.
///
/// # Errors
///
/// Returns the OS error when a handler cannot be registered.
#[cfg(unix)]
pub fn install_signal_handlers(token: &ShutdownToken) -> std::io::Result<()> {
    let _ = SIGNAL_TOKEN.set(token.clone());

    for signal in [libc::SIGINT, libc::SIGTERM] {
        // SAFETY: handle_shutdown_signal only performs async-signal-safe
        // operations (an atomic store through an already-initialized
        // OnceLock).
        let previous = unsafe { libc::signal(signal, handle_shutdown_signal as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            return Err(std::io::Error::last_os_error());
        }
    }

    Ok(())
}

/// Non-unix builds run without a graceful-interrupt path; shutdown is
/// delivered by the console host terminating the process.
#[cfg(not(unix))]
pub fn install_signal_handlers(_token: &ShutdownToken) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
extern "C" fn handle_shutdown_signal(_signal: libc::c_int) {
    if let Some(token) = SIGNAL_TOKEN.get() {
        token.cancel();
    }
}
