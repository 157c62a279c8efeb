//! Server readiness polling
//!
//! Readiness is detected with an external liveness probe (`mysqladmin
//! ping` over TCP), not by log-scraping. A probe that exits non-zero or
//! overruns its 1s budget counts as "not ready yet"; only an inability to
//! invoke the probe at all is an error.

use crate::errors::{FixtureError, Result};
use crate::process_guard;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// Per-attempt probe budget.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Backoff between probe attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Grace delay before the first probe.
pub const GRACE_DELAY: Duration = Duration::from_millis(100);

/// Ping the server once. Uses localhost as the target host.
///
/// # Arguments
///
/// * `admin_path` - Path to the admin binary
/// * `port` - Port to attempt to connect to
///
/// # Returns
///
/// true if the server answered, false if not (or the probe overran its
/// budget).
///
/// # Errors
///
/// Returns `Probe` if the probe binary cannot be invoked.
pub fn ping_server(admin_path: &Path, port: u16) -> Result<bool> {
    let mut probe = Command::new(admin_path)
        .arg("ping")
        .arg("--protocol=TCP")
        .arg("--host=localhost")
        .arg("--silent")
        .arg("--user=root")
        .arg("--password=")
        .arg(format!("--port={}", port))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            FixtureError::Probe(format!("Failed to spawn {}: {}", admin_path.display(), e))
        })?;

    match process_guard::wait_with_timeout(&mut probe, PROBE_TIMEOUT) {
        Ok(Some(status)) => Ok(status.success()),
        Ok(None) => {
            probe.kill().ok();
            probe.wait().ok();
            Ok(false)
        }
        Err(e) => Err(FixtureError::Probe(format!(
            "Failed to wait for probe exit: {}",
            e
        ))),
    }
}

/// Block until the server answers the liveness probe or the attempt
/// budget is exhausted.
///
/// Sleeps a fixed grace interval, then pings at [`POLL_INTERVAL`] up to
/// `attempts` times.
///
/// # Returns
///
/// true if the server became ready within the budget.
pub fn wait_for_ready(admin_path: &Path, port: u16, attempts: u32) -> Result<bool> {
    thread::sleep(GRACE_DELAY);

    for _ in 0..attempts {
        if ping_server(admin_path, port)? {
            return Ok(true);
        }
        thread::sleep(POLL_INTERVAL);
    }

    Ok(false)
}
