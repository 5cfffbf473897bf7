use std::path::PathBuf;

use clap::Parser;

/// Generate, download and file the ERP's sales and inventory spreadsheets.
///
/// Settings come from the environment or a `.env` file (`ERP_LOGIN_URL`,
/// `ERP_USERNAME`, `ERP_PASSWORD`, `ERP_COMPANY`, `DEST_*`, ...).
#[derive(Debug, Parser)]
#[command(name = "erp-reports", version, about)]
pub struct Cli {
    /// Load variables from this file instead of `./.env`
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Run Chrome without a window (overrides BROWSER_HEADLESS)
    #[arg(long)]
    pub headless: bool,

    /// Print which reports are fresh or stale and exit without a browser
    #[arg(long)]
    pub plan: bool,

    /// Print the run report as JSON instead of summary lines
    #[arg(long)]
    pub json: bool,

    /// Seconds to keep the browser open after the run (overrides HOLD_OPEN_SECS)
    #[arg(long, value_name = "SECS")]
    pub hold_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}
