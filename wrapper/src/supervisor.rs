//! Lifecycle supervision for the extracted server process.
//!
//! The child is started with the single `stdio` argument and the caller's
//! standard streams. A dedicated waiter thread owns the reaping `wait` call
//! and reports through a single-slot channel, decoupling "process exited"
//! from "caller wants to stop" so neither blocks the other. On cancellation
//! the supervisor sends an interrupt, waits out a bounded grace window, then
//! force-kills and blocks until the waiter confirms reaping; a child that
//! dies because the caller asked for shutdown is never reported as a
//! failure.

use crate::error::{Result, WrapperError};
use crate::shutdown::ShutdownToken;
use camino::Utf8Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

/// How long to wait after a graceful interrupt before force-killing.
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Poll interval for observing cancellation while racing the child's exit.
/// The only true timer in the supervisor is the grace window above;
/// cancellation is cooperative and this bound is its delivery latency.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Spawn the extracted server executable in stdio mode.
///
/// The child's environment is exactly the provided ordered list; nothing
/// else is inherited. Standard streams are attached directly with no
/// buffering or transformation in this layer.
///
/// # Errors
///
/// Returns [`WrapperError::ProcessStart`] when the OS cannot start the
/// process.
pub fn spawn_server(executable: &Utf8Path, env: &[(String, String)]) -> Result<Child> {
    let mut command = Command::new(executable.as_std_path());
    command
        .arg("stdio")
        .env_clear()
        .envs(env.iter().map(|(key, value)| (key, value)))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    command.spawn().map_err(|err| WrapperError::ProcessStart {
        reason: err.to_string(),
    })
}

/// Supervise `child` until it exits or `token` requests shutdown.
///
/// A zero exit or a cancelled shutdown both normalize to success; the
/// caller asked for the shutdown, so the child's incidental exit status is
/// not a failure. The child is never left running or unreaped when this
/// returns.
///
/// # Errors
///
/// Returns [`WrapperError::NonZeroExit`] for a non-cancelled non-zero exit
/// and [`WrapperError::WaitFailed`] when the wait machinery itself fails.
#[cfg(unix)]
pub fn supervise(child: Child, token: &ShutdownToken) -> Result<()> {
    use std::sync::mpsc;

    let pid = child.id();
    let (exit_tx, exit_rx) = mpsc::sync_channel::<std::io::Result<ExitStatus>>(1);

    // Exactly one thread owns the wait; everything else only reads the
    // one-shot channel or sends signals by pid.
    let waiter = std::thread::spawn(move || {
        let mut child = child;
        let _ = exit_tx.send(child.wait());
    });

    let outcome = race_exit_against_cancellation(pid, token, &exit_rx);
    let _ = waiter.join();
    outcome
}

#[cfg(unix)]
fn race_exit_against_cancellation(
    pid: u32,
    token: &ShutdownToken,
    exit_rx: &std::sync::mpsc::Receiver<std::io::Result<ExitStatus>>,
) -> Result<()> {
    use std::sync::mpsc::RecvTimeoutError;

    loop {
        match exit_rx.recv_timeout(EXIT_POLL_INTERVAL) {
            Ok(wait_result) => {
                // Prefer clean-shutdown semantics when cancellation had
                // already fired.
                if token.is_cancelled() {
                    return Ok(());
                }
                return normalize_exit(wait_result);
            }
            Err(RecvTimeoutError::Timeout) => {
                if token.is_cancelled() {
                    stop_child(pid, exit_rx);
                    return Ok(());
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(WrapperError::WaitFailed {
                    reason: "exit channel closed before a status arrived".to_owned(),
                });
            }
        }
    }
}

/// Interrupt, wait out the grace window, then force-kill and block until
/// the waiter confirms reaping so no zombie survives this call.
#[cfg(unix)]
fn stop_child(pid: u32, exit_rx: &std::sync::mpsc::Receiver<std::io::Result<ExitStatus>>) {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return;
    };

    // SAFETY: pid names the child this supervisor spawned; sending SIGINT
    // to a dead pid merely returns ESRCH.
    unsafe {
        libc::kill(pid, libc::SIGINT);
    }
    if exit_rx.recv_timeout(GRACEFUL_SHUTDOWN_TIMEOUT).is_ok() {
        return;
    }

    // SAFETY: as above; SIGKILL cannot be caught so the waiter's wait call
    // is guaranteed to return.
    unsafe {
        libc::kill(pid, libc::SIGKILL);
    }
    let _ = exit_rx.recv();
}

/// Simplified single-threaded variant for platforms without a
/// user-requestable interrupt: cancellation goes straight to force-kill,
/// with the same reap-before-return guarantee.
#[cfg(not(unix))]
pub fn supervise(mut child: Child, token: &ShutdownToken) -> Result<()> {
    use wait_timeout::ChildExt;

    loop {
        if token.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(());
        }

        match child.wait_timeout(EXIT_POLL_INTERVAL) {
            Ok(Some(status)) => {
                if token.is_cancelled() {
                    return Ok(());
                }
                return normalize_exit(Ok(status));
            }
            Ok(None) => {}
            Err(err) => {
                return Err(WrapperError::WaitFailed {
                    reason: err.to_string(),
                });
            }
        }
    }
}

/// Fold an exit observation into the wrapper's result shape.
fn normalize_exit(wait_result: std::io::Result<ExitStatus>) -> Result<()> {
    let status = wait_result.map_err(|err| WrapperError::WaitFailed {
        reason: err.to_string(),
    })?;

    if status.success() {
        return Ok(());
    }

    Err(WrapperError::NonZeroExit {
        code: exit_code(&status),
    })
}

/// The child's exit code, using the shell convention of 128+signal for
/// signal deaths.
#[cfg(unix)]
fn exit_code(status: &ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
