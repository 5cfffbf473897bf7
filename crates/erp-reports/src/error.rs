use std::path::PathBuf;

use thiserror::Error;

use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum ReportsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Portal error: {0}")]
    Portal(#[from] PortalError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required environment variable '{name}' is not set")]
    MissingVariable { name: &'static str },

    #[error("Invalid value '{value}' for '{name}': {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid filename template '{template}' for '{name}': {reason}")]
    InvalidTemplate {
        name: &'static str,
        template: String,
        reason: String,
    },

    #[error("Failed to load env file '{path}': {reason}")]
    EnvFile { path: PathBuf, reason: String },

    #[error("Password could not be resolved: {0}")]
    Secret(#[from] SecretError),

    #[error("No downloads directory configured and none could be detected")]
    NoDownloadDirectory,
}

/// Failures reported by a `ReportPortal` implementation.
#[derive(Error, Debug)]
pub enum PortalError {
    #[error("{what} not found ({selector}): {reason}")]
    ElementNotFound {
        what: &'static str,
        selector: String,
        reason: String,
    },

    #[error("{what} is present but not visible")]
    NotVisible { what: &'static str },

    #[error("Script on {what} failed: {reason}")]
    Script { what: &'static str, reason: String },

    #[error("Failed to navigate to {url}: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Browser error: {0}")]
    Browser(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove '{path}': {source}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan downloads directory '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("No finished download found in '{directory}' after {attempts} checks")]
    DownloadNotFound { directory: PathBuf, attempts: u32 },

    #[error("Download '{path}' did not finish after {attempts} checks")]
    DownloadNotFinalized { path: PathBuf, attempts: u32 },
}
