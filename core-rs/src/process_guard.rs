//! Child process utilities and the abrupt-exit cleanup registry
//!
//! Every spawned server PID is registered here so that an abrupt
//! termination of the hosting test run can still kill the children
//! (forced kill, best effort, no directory cleanup on that path).

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::process::Child;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use sysinfo::{Pid, System};

/// Poll interval for bounded child waits.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// PIDs of live server children spawned by this process.
static SPAWNED: Lazy<Mutex<HashSet<u32>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn spawned() -> MutexGuard<'static, HashSet<u32>> {
    match SPAWNED.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Record a freshly spawned server child.
pub fn register_child(pid: u32) {
    spawned().insert(pid);
}

/// Remove a child after orderly shutdown.
pub fn forget_child(pid: u32) {
    spawned().remove(&pid);
}

/// Force-kill every registered child. Returns how many were signalled.
///
/// Called from the CLI signal handler; normal teardown goes through the
/// instance state machine instead.
pub fn kill_registered() -> usize {
    let pids: Vec<u32> = spawned().iter().copied().collect();
    let mut killed = 0;

    for pid in pids {
        if force_kill(pid) {
            killed += 1;
        }
        spawned().remove(&pid);
    }

    killed
}

/// Check if a process with the given PID is running.
pub fn is_process_running(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_processes(sysinfo::ProcessesToUpdate::All);
    sys.process(Pid::from_u32(pid)).is_some()
}

/// Send SIGTERM to a process.
#[cfg(unix)]
pub fn send_sigterm(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
}

#[cfg(not(unix))]
pub fn send_sigterm(pid: u32) -> bool {
    eprintln!("[ProcessGuard] SIGTERM not supported on this platform");
    false
}

/// Send SIGKILL to a process.
#[cfg(unix)]
pub fn force_kill(pid: u32) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).is_ok()
}

#[cfg(not(unix))]
pub fn force_kill(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_processes(sysinfo::ProcessesToUpdate::All);
    sys.process(Pid::from_u32(pid))
        .map(|p| p.kill())
        .unwrap_or(false)
}

/// Wait for a child to exit, bounded by `timeout`.
///
/// # Returns
///
/// `Some(status)` if the child exited within the budget, `None` on
/// timeout. The loop is a blocking sleep/poll, never a spin.
pub fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(WAIT_POLL_INTERVAL);
    }
}
