//! Fixture configuration
//!
//! One `InstanceConfig` describes one ephemeral server: the database to
//! create, the bootstrap user, and how the server process is brought up.
//! Created once per fixture and never mutated after the port is assigned.

use crate::errors::{FixtureError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default readiness budget: 200 pings at 100ms intervals (~20s).
pub const DEFAULT_STARTUP_ATTEMPTS: u32 = 200;

/// Bootstrap identifiers are spliced into SQL text, so only word characters
/// are accepted.
static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").unwrap());

fn default_startup_attempts() -> u32 {
    DEFAULT_STARTUP_ATTEMPTS
}

fn default_url_options() -> Vec<String> {
    vec!["useSSL=false".to_string()]
}

/// Configuration for one fixture instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    /// Database created during bootstrap
    pub db_name: String,

    /// User created during bootstrap
    pub db_user: String,

    /// Password assigned to the bootstrap user
    pub db_password: String,

    /// If true the server's stdout/stderr are inherited for diagnostics
    #[serde(default)]
    pub debug: bool,

    /// Pinned port. None means a free port is allocated at setup time.
    #[serde(default)]
    pub port: Option<u16>,

    /// Readiness poll budget (pings at 100ms intervals)
    #[serde(default = "default_startup_attempts")]
    pub startup_attempts: u32,

    /// Client flags accumulated onto the connection string query
    #[serde(default = "default_url_options")]
    pub url_options: Vec<String>,
}

impl InstanceConfig {
    /// Create a config with explicit parameters.
    ///
    /// # Arguments
    ///
    /// * `db_name` - Database name to initialize
    /// * `db_user` - User to create during setup
    /// * `db_password` - Password to assign to the given user
    /// * `debug` - If true pipes server output to the hosting process
    /// * `port` - Port for the server; None picks a free port at setup time
    pub fn new(
        db_name: &str,
        db_user: &str,
        db_password: &str,
        debug: bool,
        port: Option<u16>,
    ) -> Self {
        Self {
            db_name: db_name.to_string(),
            db_user: db_user.to_string(),
            db_password: db_password.to_string(),
            debug,
            port,
            startup_attempts: DEFAULT_STARTUP_ATTEMPTS,
            url_options: default_url_options(),
        }
    }

    /// Default fixture: database `service`, user `test`, password `test`.
    pub fn default_fixture() -> Self {
        Self::new("service", "test", "test", false, None)
    }

    /// Default fixture with debug output enabled.
    pub fn debug() -> Self {
        Self::new("service", "test", "test", true, None)
    }

    /// Load a config from a YAML file.
    ///
    /// # Example
    ///
    /// ```yaml
    /// dbName: service
    /// dbUser: test
    /// dbPassword: test
    /// debug: false
    /// ```
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            FixtureError::IoError(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: InstanceConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate bootstrap identifiers before they are built into SQL text.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the database name or user contains anything
    /// outside `[A-Za-z0-9_]`, or the password contains a quote or
    /// backslash.
    pub fn validate(&self) -> Result<()> {
        if !IDENTIFIER_RE.is_match(&self.db_name) {
            return Err(FixtureError::Config(format!(
                "Invalid database name: {:?}",
                self.db_name
            )));
        }
        if !IDENTIFIER_RE.is_match(&self.db_user) {
            return Err(FixtureError::Config(format!(
                "Invalid database user: {:?}",
                self.db_user
            )));
        }
        if self.db_password.contains('\'') || self.db_password.contains('\\') {
            return Err(FixtureError::Config(
                "Password must not contain quotes or backslashes".to_string(),
            ));
        }
        if self.startup_attempts == 0 {
            return Err(FixtureError::Config(
                "startupAttempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
