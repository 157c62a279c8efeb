//! Server instance lifecycle
//!
//! One instance is one `mysqld` child process bound to one loopback port
//! inside one private working directory. The lifecycle interface is a
//! trait so seeding strategies compose as wrappers instead of subclasses.

pub mod client;
pub mod probe;
pub mod process;
pub mod template;

pub use process::{InstanceState, MysqldServer};
pub use template::TemplateSeeded;

use crate::errors::Result;

/// Lifecycle interface for one ephemeral server process.
pub trait ServerProcess {
    /// Spawn the server process without waiting for readiness.
    ///
    /// Valid only once; a second call fails with an invalid-state error
    /// instead of double-spawning.
    fn start(&mut self) -> Result<()>;

    /// Spawn the server process and block until it answers the liveness
    /// probe, or the readiness budget is exhausted.
    fn start_and_wait(&mut self) -> Result<()>;

    /// Send commands to the running server over a short-lived client
    /// connection.
    ///
    /// Useful for creating schemas, users and grants on a fresh instance.
    /// Calling this before `start_and_wait` has returned fails with an
    /// invalid-state error.
    fn send_client_commands(&mut self, commands: &[String]) -> Result<()>;

    /// Stop the server process and delete its working directory.
    fn stop_and_cleanup(&mut self) -> Result<()>;
}
