//! Fixture orchestration
//!
//! `MysqlFixture` is the surface exercised by tests: it resolves the
//! binary install, allocates a port, creates the working directory,
//! composes the template-seeded server, runs the bootstrap SQL, and
//! guarantees teardown even when setup fails partway.

use crate::binary::{BinaryLayout, BinaryLoader, LocalInstall};
use crate::config::InstanceConfig;
use crate::errors::{FixtureError, Result};
use crate::instance::{MysqldServer, ServerProcess, TemplateSeeded};
use crate::{fsops, port};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Connection details for a running fixture.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureStatus {
    pub db_name: String,
    pub db_user: String,
    pub port: u16,
    pub url: String,
}

struct ActiveInstance {
    port: u16,
    workdir: PathBuf,
    process: TemplateSeeded<MysqldServer>,
}

/// A fixture that provisions one ephemeral MySQL server.
///
/// # Example
///
/// ```no_run
/// use mysql_fixture::config::InstanceConfig;
/// use mysql_fixture::fixture::MysqlFixture;
///
/// let mut fixture = MysqlFixture::new(InstanceConfig::default_fixture());
/// fixture.set_up().unwrap();
/// let url = fixture.db_url().unwrap();
/// // run migrations against `url` ...
/// fixture.tear_down().unwrap();
/// ```
pub struct MysqlFixture {
    config: InstanceConfig,
    loader: Box<dyn BinaryLoader>,
    active: Option<ActiveInstance>,
}

impl MysqlFixture {
    /// Create a fixture using the local-filesystem binary loader.
    pub fn new(config: InstanceConfig) -> Self {
        Self::with_loader(config, Box::new(LocalInstall))
    }

    /// Create a fixture with an injected binary loader.
    pub fn with_loader(config: InstanceConfig, loader: Box<dyn BinaryLoader>) -> Self {
        Self {
            config,
            loader,
            active: None,
        }
    }

    /// The configured database name.
    pub fn db_name(&self) -> &str {
        &self.config.db_name
    }

    /// The configured database user.
    pub fn db_user(&self) -> &str {
        &self.config.db_user
    }

    /// The configured database password.
    pub fn db_password(&self) -> &str {
        &self.config.db_password
    }

    /// The assigned port. Only present once `set_up()` has run.
    pub fn port(&self) -> Option<u16> {
        self.active.as_ref().map(|a| a.port)
    }

    /// The instance working directory. Only present once `set_up()` has run.
    pub fn workdir(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.workdir.as_path())
    }

    /// A connection string using the assigned port and database name, with
    /// the configured client options accumulated as a query string.
    ///
    /// Example: `mysql://localhost:33061/service?useSSL=false`
    pub fn db_url(&self) -> Option<String> {
        let port = self.port()?;
        let mut url = format!("mysql://localhost:{}/{}", port, self.config.db_name);
        if !self.config.url_options.is_empty() {
            url.push('?');
            url.push_str(&self.config.url_options.join("&"));
        }
        Some(url)
    }

    /// Connection details for status output.
    pub fn status(&self) -> Option<FixtureStatus> {
        Some(FixtureStatus {
            db_name: self.config.db_name.clone(),
            db_user: self.config.db_user.clone(),
            port: self.port()?,
            url: self.db_url()?,
        })
    }

    /// Bring up the instance: resolve binaries, allocate the port, create
    /// the working directory, start the seeded server, run bootstrap SQL.
    ///
    /// Any failure tears down whatever was acquired before the error is
    /// returned, so a half-started instance never leaks a process, a
    /// directory, or a port claim.
    pub fn set_up(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Err(FixtureError::InvalidState(
                "Fixture already set up.".to_string(),
            ));
        }

        self.config.validate()?;

        // Fail fast before anything is acquired
        let binary_root = self
            .loader
            .load()
            .ok_or_else(|| FixtureError::BinaryNotFound("Unable to load mysql binary.".to_string()))?;
        let layout = BinaryLayout::new(binary_root.clone());

        // The port is assigned exactly once, before the server starts
        let port = match self.config.port {
            Some(pinned) => {
                port::claim(pinned)?;
                pinned
            }
            None => port::allocate()?,
        };

        let workdir = match fsops::create_instance_dir() {
            Ok(dir) => dir,
            Err(e) => {
                port::release(port);
                return Err(e);
            }
        };

        let server = MysqldServer::new(workdir.clone(), binary_root, port, self.config.debug)
            .with_startup_attempts(self.config.startup_attempts);
        let process = TemplateSeeded::new(server, workdir.clone(), layout.template());

        let mut active = ActiveInstance {
            port,
            workdir,
            process,
        };

        if let Err(e) = Self::bring_up(&mut active, &self.config) {
            Self::destroy(&mut active);
            port::release(port);
            return Err(e);
        }

        self.active = Some(active);
        Ok(())
    }

    /// Stop the server and delete the working directory. Invoked once per
    /// successful `set_up()` by the owning test.
    pub fn tear_down(&mut self) -> Result<()> {
        let mut active = self
            .active
            .take()
            .ok_or_else(|| FixtureError::InvalidState("Fixture not set up.".to_string()))?;

        let result = active.process.stop_and_cleanup();
        port::release(active.port);
        result
    }

    fn bring_up(active: &mut ActiveInstance, config: &InstanceConfig) -> Result<()> {
        active.process.start_and_wait()?;
        active
            .process
            .send_client_commands(&bootstrap_commands(config))?;
        Ok(())
    }

    /// Best-effort teardown on the failed-setup path. Errors are reported,
    /// never allowed to mask the original setup error.
    fn destroy(active: &mut ActiveInstance) {
        if let Err(e) = active.process.stop_and_cleanup() {
            eprintln!("[Fixture] Teardown after failed setup: {}", e);
            // The server may never have spawned; the directory is still ours
            if active.workdir.exists() {
                if let Err(e) = fsops::remove_tree(&active.workdir) {
                    eprintln!("[Fixture] {}", e);
                }
            }
        }
    }
}

impl Drop for MysqlFixture {
    fn drop(&mut self) {
        // Safety net for tests that forget tear_down. The owning framework
        // is still expected to call it explicitly.
        if let Some(mut active) = self.active.take() {
            eprintln!(
                "[Fixture] Dropped without tear_down, stopping instance on port {}",
                active.port
            );
            if let Err(e) = active.process.stop_and_cleanup() {
                eprintln!("[Fixture] {}", e);
            }
            port::release(active.port);
        }
    }
}

/// The fixed bootstrap sequence: create database, create user, grant.
/// Applied exactly once per instance, immediately after readiness.
pub fn bootstrap_commands(config: &InstanceConfig) -> Vec<String> {
    vec![
        format!("CREATE DATABASE {};", config.db_name),
        format!(
            "CREATE USER '{}'@'localhost' IDENTIFIED BY '{}';",
            config.db_user, config.db_password
        ),
        format!(
            "GRANT ALL ON {}.* TO '{}'@'localhost';",
            config.db_name, config.db_user
        ),
    ]
}
