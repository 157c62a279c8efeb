//! Error types for the MySQL fixture

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("MySQL binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Template missing: {0}")]
    TemplateMissing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server failed to start in time: {0}")]
    StartupTimeout(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Process error: {0}")]
    Process(String),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Port error: {0}")]
    Port(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FixtureError>;
