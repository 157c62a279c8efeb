//! Free-port allocation for fixture instances
//!
//! Ports are discovered by binding to port 0 on the loopback interface and
//! recorded in a process-wide claimed set, so concurrent fixtures in the
//! same test run never receive the same port even before their servers
//! bind it.

use crate::errors::{FixtureError, Result};
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::net::TcpListener;
use std::sync::{Mutex, MutexGuard};

/// Ports handed out and not yet released.
static CLAIMED: Lazy<Mutex<HashSet<u16>>> = Lazy::new(|| Mutex::new(HashSet::new()));

fn claimed() -> MutexGuard<'static, HashSet<u16>> {
    match CLAIMED.lock() {
        Ok(guard) => guard,
        // A panic while holding the set leaves valid data; keep going.
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Test if a port can currently be bound on loopback.
pub fn is_port_available(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Allocate a free loopback port and claim it.
///
/// # Returns
///
/// A port that no other fixture in this process holds. The caller owns the
/// claim until [`release`].
///
/// # Errors
///
/// Returns `Port` if the OS cannot provide a bindable port.
pub fn allocate() -> Result<u16> {
    // The OS can hand back a port another fixture claimed but has not bound
    // yet, so retry a few times before giving up.
    for _ in 0..16 {
        let listener = TcpListener::bind(("127.0.0.1", 0))
            .map_err(|e| FixtureError::Port(format!("Failed to bind probe socket: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| FixtureError::Port(format!("Failed to read probe address: {}", e)))?
            .port();
        drop(listener);

        if claimed().insert(port) {
            return Ok(port);
        }
    }

    Err(FixtureError::Port(
        "Unable to find a free port not already claimed".to_string(),
    ))
}

/// Claim an explicitly pinned port.
///
/// # Errors
///
/// Returns `Port` if another fixture in this process already holds it.
pub fn claim(port: u16) -> Result<()> {
    if claimed().insert(port) {
        Ok(())
    } else {
        Err(FixtureError::Port(format!(
            "Port {} already claimed by another fixture",
            port
        )))
    }
}

/// Release a claimed port.
///
/// # Returns
///
/// true if the port was claimed, false otherwise.
pub fn release(port: u16) -> bool {
    claimed().remove(&port)
}
