//! Test harness for isolated session runs.
//!
//! The `TestHarness` struct provides:
//! - A temporary root with destination and downloads folders
//! - A `Config` loaded through the same loader production uses
//! - Helpers to mark targets fresh or stale and to run a full session

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use assert_fs::prelude::*;
use assert_fs::TempDir;
use chrono::Local;

use erp_reports::config::load_config_from;
use erp_reports::pipeline::NoopProgress;
use erp_reports::portal::PortalLauncher;
use erp_reports::session::Session;
use erp_reports::status::RunReport;
use erp_reports::target::{ReportKind, ReportTarget};
use erp_reports::Config;

pub struct TestHarness {
    temp_dir: TempDir,
    pub download_dir: PathBuf,
    pub config: Config,
}

impl TestHarness {
    /// Harness with fast polling: 3 listing checks, 3 download checks, no sleeps.
    pub fn new() -> Self {
        Self::with_overrides(&[])
    }

    pub fn with_overrides(overrides: &[(&str, &str)]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let downloads = temp_dir.child("downloads");
        downloads
            .create_dir_all()
            .expect("Failed to create downloads dir");

        let mut vars = Self::base_vars(temp_dir.path());
        for (name, value) in overrides {
            vars.insert(name.to_string(), value.to_string());
        }
        let config = load_config_from(|name| vars.get(name).cloned())
            .expect("harness config should load");

        Self {
            download_dir: downloads.path().to_path_buf(),
            temp_dir,
            config,
        }
    }

    pub fn base_vars(root: &Path) -> HashMap<String, String> {
        let path = |name: &str| root.join(name).to_string_lossy().into_owned();
        HashMap::from([
            ("ERP_LOGIN_URL".to_string(), "https://erp.example.com/ERP/Login".to_string()),
            ("ERP_USERNAME".to_string(), "operator".to_string()),
            ("ERP_PASSWORD".to_string(), "s3cret".to_string()),
            ("ERP_COMPANY".to_string(), "Loja Centro".to_string()),
            ("DEST_INVENTORY".to_string(), path("estoque")),
            ("DEST_SALES_SUMMARY".to_string(), path("venda")),
            ("DEST_SALES_DETAIL".to_string(), path("analitico")),
            ("DOWNLOAD_DIR".to_string(), path("downloads")),
            ("POLL_ATTEMPTS".to_string(), "3".to_string()),
            ("POLL_INTERVAL_SECS".to_string(), "0".to_string()),
            ("DOWNLOAD_WAIT_ATTEMPTS".to_string(), "3".to_string()),
            ("DOWNLOAD_WAIT_INTERVAL_SECS".to_string(), "0".to_string()),
            ("RELAUNCH_DELAY_SECS".to_string(), "0".to_string()),
            ("HOLD_OPEN_SECS".to_string(), "0".to_string()),
        ])
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn targets(&self) -> Vec<ReportTarget> {
        ReportTarget::resolve_all(&self.config, Local::now().date_naive())
    }

    pub fn target(&self, kind: ReportKind) -> ReportTarget {
        self.targets()
            .into_iter()
            .find(|t| t.kind == kind)
            .expect("every kind resolves")
    }

    /// Writes the target's destination file with a current mtime.
    pub fn make_fresh(&self, kind: ReportKind) -> PathBuf {
        self.write_destination(kind, b"fresh", SystemTime::now())
    }

    /// Writes the target's destination file dated two years back.
    pub fn make_stale(&self, kind: ReportKind, content: &[u8]) -> PathBuf {
        let two_years = Duration::from_secs(2 * 366 * 24 * 3600);
        self.write_destination(kind, content, SystemTime::now() - two_years)
    }

    fn write_destination(&self, kind: ReportKind, content: &[u8], modified: SystemTime) -> PathBuf {
        let path = self.target(kind).path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
        path
    }

    pub fn downloads_left(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.download_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    pub fn run(&self, launcher: &dyn PortalLauncher) -> RunReport {
        Session::new(&self.config, launcher, Arc::new(AtomicBool::new(false))).run(&NoopProgress)
    }
}
