//! MySQL binary discovery
//!
//! A [`BinaryLoader`] resolves the installed server distribution for the
//! ambient machine. The fixture fails fast when no install is found.

use std::path::{Path, PathBuf};

/// Default install root checked by [`LocalInstall`].
pub const BINARY_SOURCE: &str = "/opt/mysql-fixture/";

/// Environment variable overriding the install root.
pub const BINARY_HOME_ENV: &str = "MYSQL_FIXTURE_HOME";

/// Load or use an existing MySQL install from a potentially missing source.
pub trait BinaryLoader {
    /// Attempts to load the location of the MySQL install.
    ///
    /// # Returns
    ///
    /// The install root, or None if unable to load.
    fn load(&self) -> Option<PathBuf>;
}

/// Loads the install for the ambient OS from the local file system:
/// `MYSQL_FIXTURE_HOME` if set, then `/opt/mysql-fixture/`.
#[derive(Debug, Default)]
pub struct LocalInstall;

impl BinaryLoader for LocalInstall {
    fn load(&self) -> Option<PathBuf> {
        if let Ok(home) = std::env::var(BINARY_HOME_ENV) {
            let path = PathBuf::from(home);
            if path.exists() {
                return Some(path);
            }
        }

        let source = PathBuf::from(BINARY_SOURCE);
        if source.exists() {
            Some(source)
        } else {
            None
        }
    }
}

/// A loader pinned to a fixed root. Useful for tests and non-standard
/// installs.
#[derive(Debug, Clone)]
pub struct FixedRoot {
    root: PathBuf,
}

impl FixedRoot {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl BinaryLoader for FixedRoot {
    fn load(&self) -> Option<PathBuf> {
        if self.root.exists() {
            Some(self.root.clone())
        } else {
            None
        }
    }
}

/// Well-known paths inside an install root.
#[derive(Debug, Clone)]
pub struct BinaryLayout {
    root: PathBuf,
}

impl BinaryLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Server daemon binary.
    pub fn mysqld(&self) -> PathBuf {
        self.root.join("bin").join("mysqld")
    }

    /// Interactive client binary, used for bootstrap commands.
    pub fn client(&self) -> PathBuf {
        self.root.join("bin").join("mysql")
    }

    /// Admin binary, used as the liveness probe.
    pub fn admin(&self) -> PathBuf {
        self.root.join("bin").join("mysqladmin")
    }

    /// Default pre-initialized data-directory template.
    pub fn template(&self) -> PathBuf {
        self.root.join("template")
    }
}
