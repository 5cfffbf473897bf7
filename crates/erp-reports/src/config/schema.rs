use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// Everything a run needs, built once at startup and passed by reference.
#[derive(Debug)]
pub struct Config {
    pub portal: PortalConfig,
    pub destinations: Destinations,
    pub templates: FilenameTemplates,
    /// Token substituted for `$author` in filename templates.
    pub author: String,
    /// Where the browser drops downloaded spreadsheets.
    pub download_directory: PathBuf,
    pub polling: PollingConfig,
    pub browser: BrowserConfig,
    pub session: SessionConfig,
    /// Keep an extra copy of the stock download under the portal's own filename.
    pub archive_stock_download: bool,
}

#[derive(Debug)]
pub struct PortalConfig {
    pub login_url: String,
    /// Base URL of the report generator page; the family query is appended.
    pub reports_url: String,
    pub username: String,
    pub password: SecretString,
    pub company: String,
}

#[derive(Debug, Clone)]
pub struct Destinations {
    pub inventory: PathBuf,
    pub sales_summary: PathBuf,
    pub sales_detail: PathBuf,
}

#[derive(Debug, Clone)]
pub struct FilenameTemplates {
    pub stock: String,
    pub sales_summary: String,
    pub sales_detail: String,
}

pub const DEFAULT_STOCK_TEMPLATE: &str = "Estoque Atual.xlsx";
pub const DEFAULT_SALES_SUMMARY_TEMPLATE: &str = "$y_Rel_Venda_Sint_$author.xlsx";
/// Detail files have always carried the accented name, unlike the summaries.
pub const DEFAULT_SALES_DETAIL_TEMPLATE: &str = "$y_$m_Rel_Venda_Anali_André_Sborz_01-$m-$y.xlsx";
pub const DEFAULT_AUTHOR: &str = "Andre_Sborz";

impl Default for FilenameTemplates {
    fn default() -> Self {
        Self {
            stock: DEFAULT_STOCK_TEMPLATE.to_string(),
            sales_summary: DEFAULT_SALES_SUMMARY_TEMPLATE.to_string(),
            sales_detail: DEFAULT_SALES_DETAIL_TEMPLATE.to_string(),
        }
    }
}

/// Bounds for the two polling loops of each report.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// How many times the report listing is checked for today's row.
    pub report_attempts: u32,
    /// Pause between listing checks (after clicking refresh).
    pub report_interval: Duration,
    /// How many times the downloads folder is checked for the finished file.
    pub download_attempts: u32,
    pub download_interval: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            report_attempts: 40,
            report_interval: Duration::from_secs(3),
            download_attempts: 60,
            download_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub timings: PortalTimings,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_path: None,
            timings: PortalTimings::default(),
        }
    }
}

/// Wait budgets and settle pauses used when driving the portal UI.
#[derive(Debug, Clone)]
pub struct PortalTimings {
    pub element_wait: Duration,
    pub password_wait: Duration,
    pub company_wait: Duration,
    pub generate_wait: Duration,
    pub cleanup_wait: Duration,
    pub acknowledge_wait: Duration,
    /// Pause after small interactions (clicks, select changes).
    pub settle: Duration,
    /// Pause after page loads, login submission and download clicks.
    pub page_load: Duration,
}

impl Default for PortalTimings {
    fn default() -> Self {
        Self {
            element_wait: Duration::from_secs(10),
            password_wait: Duration::from_secs(20),
            company_wait: Duration::from_secs(20),
            generate_wait: Duration::from_secs(30),
            cleanup_wait: Duration::from_secs(5),
            acknowledge_wait: Duration::from_secs(5),
            settle: Duration::from_secs(1),
            page_load: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on full session attempts (browser launch through sequencing).
    pub attempts: u32,
    /// Pause between tearing a failed session down and launching the next one.
    pub relaunch_delay: Duration,
    /// How long the browser stays open after the final attempt.
    pub hold_open: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            relaunch_delay: Duration::from_secs(5),
            hold_open: Duration::from_secs(20),
        }
    }
}

#[cfg(test)]
impl Config {
    /// Config rooted in a scratch directory, for unit tests.
    pub(crate) fn for_tests(root: &std::path::Path) -> Self {
        Self {
            portal: PortalConfig {
                login_url: "https://erp.example.com/ERP/Login".to_string(),
                reports_url: "https://erp.example.com/gerar/".to_string(),
                username: "operator".to_string(),
                password: SecretString::from("hunter2".to_string()),
                company: "Loja Centro".to_string(),
            },
            destinations: Destinations {
                inventory: root.join("estoque"),
                sales_summary: root.join("venda"),
                sales_detail: root.join("analitico"),
            },
            templates: FilenameTemplates::default(),
            author: DEFAULT_AUTHOR.to_string(),
            download_directory: root.join("downloads"),
            polling: PollingConfig {
                report_attempts: 3,
                report_interval: Duration::ZERO,
                download_attempts: 3,
                download_interval: Duration::ZERO,
            },
            browser: BrowserConfig::default(),
            session: SessionConfig {
                attempts: 2,
                relaunch_delay: Duration::ZERO,
                hold_open: Duration::ZERO,
            },
            archive_stock_download: true,
        }
    }
}
