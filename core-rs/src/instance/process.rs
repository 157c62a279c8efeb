//! The mysqld lifecycle state machine
//!
//! Owns one server child process bound to one port inside one working
//! directory. Notes about how mysqld is started:
//!
//! 1. Binds only to localhost.
//! 2. Uses default timezone of UTC.
//! 3. The socket file lives inside the working directory; addressing is
//!    TCP/loopback throughout.

use crate::binary::BinaryLayout;
use crate::errors::{FixtureError, Result};
use crate::instance::{client, probe, ServerProcess};
use crate::{fsops, process_guard};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

/// Bounded wait for the server to exit after SIGTERM.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle states. No transition skips a state; `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    NotStarted,
    Starting,
    Running,
    Stopped,
}

/// One mysqld server process on a loopback port.
pub struct MysqldServer {
    workdir: PathBuf,
    layout: BinaryLayout,
    port: u16,
    debug: bool,
    startup_attempts: u32,
    state: InstanceState,
    child: Option<Child>,
}

impl MysqldServer {
    /// Create a server bound to `port` inside `workdir`.
    ///
    /// # Arguments
    ///
    /// * `workdir` - Private working directory owned by this instance
    /// * `binary_root` - Installed MySQL distribution root
    /// * `port` - Loopback port, assigned before start and never changed
    /// * `debug` - If true the child inherits stdout/stderr
    pub fn new(workdir: PathBuf, binary_root: PathBuf, port: u16, debug: bool) -> Self {
        Self {
            workdir,
            layout: BinaryLayout::new(binary_root),
            port,
            debug,
            startup_attempts: crate::config::DEFAULT_STARTUP_ATTEMPTS,
            state: InstanceState::NotStarted,
            child: None,
        }
    }

    /// Override the readiness poll budget.
    pub fn with_startup_attempts(mut self, attempts: u32) -> Self {
        self.startup_attempts = attempts;
        self
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// PID of the running child, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(|c| c.id())
    }

    fn launch_command(&self) -> Command {
        let data_dir = self.workdir.join("data");
        let socket = self.workdir.join("socket");

        let mut command = Command::new(self.layout.mysqld());
        command
            .arg("--bind-address=localhost")
            .arg(format!("--basedir={}", self.workdir.display()))
            .arg(format!("--port={}", self.port))
            .arg("--default-time-zone=+00:00")
            .arg(format!("--socket={}", socket.display()))
            .arg(format!("--datadir={}", data_dir.display()))
            .current_dir(&self.workdir)
            .stdin(Stdio::null());

        if self.debug {
            command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        }

        command
    }

    /// Terminate the child: SIGTERM, bounded wait, forced kill as the
    /// fallback.
    fn terminate_child(mut child: Child) {
        let pid = child.id();

        process_guard::send_sigterm(pid);

        match process_guard::wait_with_timeout(&mut child, STOP_TIMEOUT) {
            Ok(Some(_)) => {}
            Ok(None) => {
                eprintln!(
                    "[MysqldServer] mysqld pid {} ignored SIGTERM, killing",
                    pid
                );
                child.kill().ok();
                child.wait().ok();
            }
            Err(e) => {
                eprintln!("[MysqldServer] Wait for mysqld pid {} failed: {}", pid, e);
                child.kill().ok();
                child.wait().ok();
            }
        }

        process_guard::forget_child(pid);
    }
}

impl ServerProcess for MysqldServer {
    fn start(&mut self) -> Result<()> {
        if self.state != InstanceState::NotStarted {
            return Err(FixtureError::InvalidState(
                "Unable to start server. Already started.".to_string(),
            ));
        }

        let child = self.launch_command().spawn().map_err(|e| {
            FixtureError::Process(format!(
                "Failed to spawn {}: {}",
                self.layout.mysqld().display(),
                e
            ))
        })?;

        // Registered immediately so an abrupt exit of the hosting process
        // can still reap the child.
        process_guard::register_child(child.id());

        if self.debug {
            eprintln!(
                "[MysqldServer] Spawned mysqld pid {} on port {}",
                child.id(),
                self.port
            );
        }

        self.child = Some(child);
        self.state = InstanceState::Starting;
        Ok(())
    }

    fn start_and_wait(&mut self) -> Result<()> {
        self.start()?;

        let ready = probe::wait_for_ready(&self.layout.admin(), self.port, self.startup_attempts)?;
        if !ready {
            // State stays Starting; the caller is expected to stop_and_cleanup.
            return Err(FixtureError::StartupTimeout(format!(
                "port {}, {} attempts",
                self.port, self.startup_attempts
            )));
        }

        self.state = InstanceState::Running;
        Ok(())
    }

    fn send_client_commands(&mut self, commands: &[String]) -> Result<()> {
        if self.state != InstanceState::Running {
            return Err(FixtureError::InvalidState(
                "Unable to send client commands. Server not running.".to_string(),
            ));
        }

        client::send_commands(&self.layout.client(), &self.workdir, self.port, commands)
    }

    fn stop_and_cleanup(&mut self) -> Result<()> {
        match self.state {
            InstanceState::Starting | InstanceState::Running => {}
            InstanceState::NotStarted => {
                return Err(FixtureError::InvalidState(
                    "Unable to stop server. Not started.".to_string(),
                ));
            }
            InstanceState::Stopped => {
                return Err(FixtureError::InvalidState(
                    "Unable to stop server. Already stopped.".to_string(),
                ));
            }
        }

        let child = self
            .child
            .take()
            .ok_or_else(|| FixtureError::Process("Server child handle missing".to_string()))?;

        Self::terminate_child(child);
        self.state = InstanceState::Stopped;

        // Deletion failures are reported; the process is already down.
        fsops::remove_tree(&self.workdir)
    }
}

impl Drop for MysqldServer {
    fn drop(&mut self) {
        // Last-resort reap for instances never stopped through the state
        // machine. Forced kill only; no directory cleanup on this path.
        if let Some(mut child) = self.child.take() {
            let pid = child.id();
            eprintln!("[MysqldServer] Dropping unstopped mysqld pid {}", pid);
            child.kill().ok();
            child.wait().ok();
            process_guard::forget_child(pid);
        }
    }
}
