//! Password resolution for the portal login.
//!
//! The password can be supplied in two ways, checked in priority order:
//!
//! 1. **Direct value** - `ERP_PASSWORD=...` in the environment or `.env` file
//! 2. **File reference** - `ERP_PASSWORD_FILE=/run/secrets/erp_password` (Docker secrets pattern)

use secrecy::SecretString;
use std::fs;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need a direct value or a file path)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Secret file '{path}' is empty")]
    EmptyFile { path: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from a direct value or, failing that, a file.
///
/// Empty strings count as "not provided". File contents are trimmed so a
/// trailing newline written by `echo` does not end up in the password.
///
/// # Examples
///
/// ```ignore
/// use erp_reports::secrets::resolve_secret;
///
/// let secret = resolve_secret(None, Some("~/.secrets/erp_password"))?;
/// ```
pub fn resolve_secret(direct: Option<&str>, file_path: Option<&str>) -> Result<SecretString> {
    // Priority 1: Direct value
    if let Some(value) = direct {
        if !value.is_empty() {
            return Ok(SecretString::from(value.to_string()));
        }
    }

    // Priority 2: File
    if let Some(path) = file_path {
        if !path.is_empty() {
            let expanded = expand_home(path);
            let content = fs::read_to_string(&expanded).map_err(|e| SecretError::FileReadError {
                path: expanded.clone(),
                source: e,
            })?;
            let trimmed = content.trim();
            if trimmed.is_empty() {
                return Err(SecretError::EmptyFile { path: expanded });
            }
            return Ok(SecretString::from(trimmed.to_string()));
        }
    }

    Err(SecretError::NoSourceProvided)
}

/// Expands `~` to the user's home directory.
///
/// Handles both `~/path` and standalone `~`; `~user/path` is left untouched.
pub(crate) fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
