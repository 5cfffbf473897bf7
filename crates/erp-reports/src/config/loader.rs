use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::config::schema::{
    BrowserConfig, Config, Destinations, FilenameTemplates, PollingConfig, PortalConfig,
    SessionConfig, DEFAULT_AUTHOR,
};
use crate::config::variables::TemplateEngine;
use crate::error::ConfigError;
use crate::secrets::{expand_home, resolve_secret};

pub const LOGIN_URL: &str = "ERP_LOGIN_URL";
pub const REPORTS_URL: &str = "ERP_REPORTS_URL";
pub const USERNAME: &str = "ERP_USERNAME";
pub const PASSWORD: &str = "ERP_PASSWORD";
pub const PASSWORD_FILE: &str = "ERP_PASSWORD_FILE";
pub const COMPANY: &str = "ERP_COMPANY";
pub const DEST_INVENTORY: &str = "DEST_INVENTORY";
pub const DEST_SALES_SUMMARY: &str = "DEST_SALES_SUMMARY";
pub const DEST_SALES_DETAIL: &str = "DEST_SALES_DETAIL";
pub const REPORT_AUTHOR: &str = "REPORT_AUTHOR";
pub const TEMPLATE_STOCK: &str = "TEMPLATE_STOCK";
pub const TEMPLATE_SALES_SUMMARY: &str = "TEMPLATE_SALES_SUMMARY";
pub const TEMPLATE_SALES_DETAIL: &str = "TEMPLATE_SALES_DETAIL";
pub const DOWNLOAD_DIR: &str = "DOWNLOAD_DIR";
pub const POLL_ATTEMPTS: &str = "POLL_ATTEMPTS";
pub const POLL_INTERVAL_SECS: &str = "POLL_INTERVAL_SECS";
pub const DOWNLOAD_WAIT_ATTEMPTS: &str = "DOWNLOAD_WAIT_ATTEMPTS";
pub const DOWNLOAD_WAIT_INTERVAL_SECS: &str = "DOWNLOAD_WAIT_INTERVAL_SECS";
pub const SESSION_ATTEMPTS: &str = "SESSION_ATTEMPTS";
pub const RELAUNCH_DELAY_SECS: &str = "RELAUNCH_DELAY_SECS";
pub const HOLD_OPEN_SECS: &str = "HOLD_OPEN_SECS";
pub const BROWSER_HEADLESS: &str = "BROWSER_HEADLESS";
pub const CHROME_PATH: &str = "CHROME_PATH";
pub const ARCHIVE_STOCK_DOWNLOAD: &str = "ARCHIVE_STOCK_DOWNLOAD";

/// Generator page path appended to the login origin when `ERP_REPORTS_URL` is unset.
const DEFAULT_REPORTS_PATH: &str = "/app/gerencial/relatorios/relatoriosAvancados/gerar/";

/// Loads a `.env` file into the process environment.
///
/// With no explicit path a missing `.env` in the working directory is fine;
/// an explicit path that cannot be read is an error.
pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => dotenvy::from_path(path)
            .map(|_| ())
            .map_err(|e| ConfigError::EnvFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        None => match dotenvy::dotenv() {
            Ok(_) => Ok(()),
            Err(e) if e.not_found() => Ok(()),
            Err(e) => Err(ConfigError::EnvFile {
                path: PathBuf::from(".env"),
                reason: e.to_string(),
            }),
        },
    }
}

/// Builds the configuration from the process environment.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    load_config_from(|name| std::env::var(name).ok())
}

/// Builds the configuration from an arbitrary variable source.
///
/// All required variables are checked before anything else so a fresh
/// deployment reports every missing key's first occurrence in one place.
pub fn load_config_from<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let source = VarSource { lookup };

    let login_url = source.required(LOGIN_URL)?;
    let username = source.required(USERNAME)?;
    let company = source.required(COMPANY)?;
    let inventory = source.required(DEST_INVENTORY)?;
    let sales_summary = source.required(DEST_SALES_SUMMARY)?;
    let sales_detail = source.required(DEST_SALES_DETAIL)?;

    let password_direct = source.optional(PASSWORD);
    let password_file = source.optional(PASSWORD_FILE);
    if password_direct.is_none() && password_file.is_none() {
        return Err(ConfigError::MissingVariable { name: PASSWORD });
    }
    let password = resolve_secret(password_direct.as_deref(), password_file.as_deref())?;

    let parsed_login = validate_url(LOGIN_URL, &login_url)?;
    let reports_url = match source.optional(REPORTS_URL) {
        Some(url) => {
            validate_url(REPORTS_URL, &url)?;
            url
        }
        None => parsed_login
            .join(DEFAULT_REPORTS_PATH)
            .map_err(|e| ConfigError::InvalidValue {
                name: LOGIN_URL,
                value: login_url.clone(),
                reason: e.to_string(),
            })?
            .to_string(),
    };

    let author = source
        .optional(REPORT_AUTHOR)
        .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());
    if author.contains('/') || author.contains('\\') {
        return Err(ConfigError::InvalidValue {
            name: REPORT_AUTHOR,
            value: author,
            reason: "must not contain path separators".to_string(),
        });
    }

    let defaults = FilenameTemplates::default();
    let engine = TemplateEngine::new(&author);
    let templates = FilenameTemplates {
        stock: source.template(&engine, TEMPLATE_STOCK, defaults.stock)?,
        sales_summary: source.template(&engine, TEMPLATE_SALES_SUMMARY, defaults.sales_summary)?,
        sales_detail: source.template(&engine, TEMPLATE_SALES_DETAIL, defaults.sales_detail)?,
    };

    let download_directory = match source.optional(DOWNLOAD_DIR) {
        Some(dir) => PathBuf::from(expand_home(&dir)),
        None => dirs::download_dir().ok_or(ConfigError::NoDownloadDirectory)?,
    };

    let polling_defaults = PollingConfig::default();
    let polling = PollingConfig {
        report_attempts: source.positive(POLL_ATTEMPTS, polling_defaults.report_attempts)?,
        report_interval: source.seconds(POLL_INTERVAL_SECS, polling_defaults.report_interval)?,
        download_attempts: source
            .positive(DOWNLOAD_WAIT_ATTEMPTS, polling_defaults.download_attempts)?,
        download_interval: source.seconds(
            DOWNLOAD_WAIT_INTERVAL_SECS,
            polling_defaults.download_interval,
        )?,
    };

    let session_defaults = SessionConfig::default();
    let session = SessionConfig {
        attempts: source.positive(SESSION_ATTEMPTS, session_defaults.attempts)?,
        relaunch_delay: source.seconds(RELAUNCH_DELAY_SECS, session_defaults.relaunch_delay)?,
        hold_open: source.seconds(HOLD_OPEN_SECS, session_defaults.hold_open)?,
    };

    let browser = BrowserConfig {
        headless: source.flag(BROWSER_HEADLESS, false)?,
        chrome_path: source
            .optional(CHROME_PATH)
            .map(|p| PathBuf::from(expand_home(&p))),
        ..BrowserConfig::default()
    };

    Ok(Config {
        portal: PortalConfig {
            login_url,
            reports_url,
            username,
            password,
            company,
        },
        destinations: Destinations {
            inventory: PathBuf::from(expand_home(&inventory)),
            sales_summary: PathBuf::from(expand_home(&sales_summary)),
            sales_detail: PathBuf::from(expand_home(&sales_detail)),
        },
        templates,
        author,
        download_directory,
        polling,
        browser,
        session,
        archive_stock_download: source.flag(ARCHIVE_STOCK_DOWNLOAD, true)?,
    })
}

/// Removes one pair of matching surrounding quotes (`"…"` or `'…'`).
pub fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

struct VarSource<F> {
    lookup: F,
}

impl<F> VarSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Trimmed, quote-unwrapped value; blank counts as unset.
    fn optional(&self, name: &str) -> Option<String> {
        let raw = (self.lookup)(name)?;
        let value = strip_quotes(raw.trim()).to_string();
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }

    fn required(&self, name: &'static str) -> Result<String, ConfigError> {
        self.optional(name)
            .ok_or(ConfigError::MissingVariable { name })
    }

    fn positive(&self, name: &'static str, default: u32) -> Result<u32, ConfigError> {
        let Some(value) = self.optional(name) else {
            return Ok(default);
        };
        match value.parse::<u32>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidValue {
                name,
                value,
                reason: "expected a positive integer".to_string(),
            }),
        }
    }

    fn seconds(&self, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        let Some(value) = self.optional(name) else {
            return Ok(default);
        };
        value
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidValue {
                name,
                value,
                reason: "expected a whole number of seconds".to_string(),
            })
    }

    fn flag(&self, name: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(value) = self.optional(name) else {
            return Ok(default);
        };
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name,
                value,
                reason: "expected true/false".to_string(),
            }),
        }
    }

    fn template(
        &self,
        engine: &TemplateEngine,
        name: &'static str,
        default: String,
    ) -> Result<String, ConfigError> {
        let template = self.optional(name).unwrap_or(default);
        engine
            .validate(&template)
            .map_err(|reason| ConfigError::InvalidTemplate {
                name,
                template: template.clone(),
                reason,
            })?;
        Ok(template)
    }
}

/// Parses an http(s) URL that names a host.
fn validate_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("expected an http(s) URL".to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host".to_string()));
    }
    Ok(url)
}
