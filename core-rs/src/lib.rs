//! # MySQL Fixture - ephemeral database servers for tests
//!
//! Provisions a single-node MySQL server as a test fixture and guarantees
//! its deterministic teardown regardless of how the test behaves. Each
//! fixture owns one server process, one loopback port, and one private
//! working directory seeded from a pre-initialized template, so parallel
//! tests get fully isolated databases without paying the engine's own
//! initialization cost.
//!
//! ## Lifecycle
//!
//! ```text
//! set_up()                                   tear_down()
//!    │                                           │
//!    ├─ locate install (bin/mysqld, template/)   ├─ SIGTERM + bounded wait
//!    ├─ allocate loopback port                   └─ delete working tree
//!    ├─ create private working directory
//!    ├─ seed from template
//!    ├─ spawn mysqld, poll mysqladmin ping
//!    └─ bootstrap: CREATE DATABASE / USER / GRANT
//! ```
//!
//! Any failure during `set_up()` destroys whatever was acquired before the
//! error propagates to the test runner.

pub mod binary;
pub mod config;
pub mod errors;
pub mod fixture;
pub mod fsops;
pub mod instance;
pub mod port;
pub mod process_guard;

pub use binary::{BinaryLayout, BinaryLoader, FixedRoot, LocalInstall};
pub use config::InstanceConfig;
pub use errors::FixtureError;
pub use fixture::{bootstrap_commands, FixtureStatus, MysqlFixture};
pub use instance::{InstanceState, MysqldServer, ServerProcess, TemplateSeeded};

/// Crate version.
pub const VERSION: &str = "0.3.2";
