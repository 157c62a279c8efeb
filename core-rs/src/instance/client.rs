//! Client command channel
//!
//! Bootstrap commands reach the server through a short-lived `mysql`
//! client subprocess connected over TCP to loopback with the root
//! bootstrap identity. Closing the client's stdin is the designed
//! end-of-input signal: the client drains its queued statements and
//! exits. SQL-level failures are not distinguished from channel
//! failures; bootstrap scripts are expected to succeed or the fixture is
//! unusable.

use crate::errors::{FixtureError, Result};
use crate::process_guard;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// Bounded wait for the client to drain and exit.
pub const CLIENT_EXIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stream command lines, in order, to a client connected to `port`.
///
/// # Arguments
///
/// * `client_path` - Path to the client binary
/// * `workdir` - Working directory for the client subprocess
/// * `port` - Port the server is bound to
/// * `commands` - Command lines, executed in the order supplied; no
///   rollback across the batch
pub fn send_commands(
    client_path: &Path,
    workdir: &Path,
    port: u16,
    commands: &[String],
) -> Result<()> {
    let mut client = Command::new(client_path)
        .arg(format!("--port={}", port))
        .arg("--protocol=TCP")
        .arg("--user=root")
        .arg("--password=")
        .current_dir(workdir)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            FixtureError::Process(format!(
                "Failed to spawn client {}: {}",
                client_path.display(),
                e
            ))
        })?;

    {
        let mut stdin = client
            .stdin
            .take()
            .ok_or_else(|| FixtureError::Process("Client stdin unavailable".to_string()))?;

        for command in commands {
            writeln!(stdin, "{}", command).map_err(|e| {
                FixtureError::Process(format!("Failed to write client command: {}", e))
            })?;
        }
        // stdin drops here, signalling end-of-input
    }

    match process_guard::wait_with_timeout(&mut client, CLIENT_EXIT_TIMEOUT) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => {
            client.kill().ok();
            client.wait().ok();
            Err(FixtureError::Process(format!(
                "Client did not exit within {:?}",
                CLIENT_EXIT_TIMEOUT
            )))
        }
        Err(e) => Err(FixtureError::Process(format!(
            "Failed to wait for client exit: {}",
            e
        ))),
    }
}
