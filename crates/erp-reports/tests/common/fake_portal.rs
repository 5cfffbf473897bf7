//! Scripted `ReportPortal` that records every interaction.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use secrecy::{ExposeSecret, SecretString};

use erp_reports::error::PortalError;
use erp_reports::portal::{PortalLauncher, ReportPortal};
use erp_reports::target::{Period, ReportFamily, ReportType};

/// How one launched session behaves.
#[derive(Debug, Clone)]
pub struct PortalScript {
    /// Company selection times out.
    pub fail_company: bool,
    /// The dated row never shows up in the listing.
    pub row_never_appears: bool,
    /// Listing checks before the dated row becomes visible.
    pub row_after_checks: u32,
    /// Reports already queued on the generator page.
    pub queued: u32,
    /// Contents written to the downloads folder per download click.
    pub download_content: Vec<u8>,
}

impl Default for PortalScript {
    fn default() -> Self {
        Self {
            fail_company: false,
            row_never_appears: false,
            row_after_checks: 1,
            queued: 0,
            download_content: b"PK\x03\x04 spreadsheet".to_vec(),
        }
    }
}

/// Everything the fake sessions did, shared with the test.
#[derive(Debug, Default)]
pub struct Journal {
    pub events: Vec<String>,
    pub launches: u32,
    pub passwords: Vec<String>,
}

impl Journal {
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| e.as_str() == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }
}

pub struct FakeLauncher {
    scripts: Mutex<VecDeque<PortalScript>>,
    fallback: PortalScript,
    download_dir: PathBuf,
    fail_launch: bool,
    pub journal: Arc<Mutex<Journal>>,
}

impl FakeLauncher {
    /// Every launch behaves like `script`.
    pub fn new(download_dir: &Path, script: PortalScript) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            fallback: script,
            download_dir: download_dir.to_path_buf(),
            fail_launch: false,
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// Launch `n` uses `scripts[n]`; later launches use the default script.
    pub fn with_sequence(download_dir: &Path, scripts: Vec<PortalScript>) -> Self {
        let launcher = Self::new(download_dir, PortalScript::default());
        *launcher.scripts.lock().unwrap() = scripts.into();
        launcher
    }

    pub fn failing(download_dir: &Path) -> Self {
        Self {
            fail_launch: true,
            ..Self::new(download_dir, PortalScript::default())
        }
    }

    pub fn launches(&self) -> u32 {
        self.journal.lock().unwrap().launches
    }

    pub fn events(&self) -> Vec<String> {
        self.journal.lock().unwrap().events.clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.journal.lock().unwrap().count(event)
    }
}

impl PortalLauncher for FakeLauncher {
    fn launch(&self) -> Result<Box<dyn ReportPortal>, PortalError> {
        let mut journal = self.journal.lock().unwrap();
        journal.launches += 1;
        journal.events.push("launch".to_string());
        if self.fail_launch {
            return Err(PortalError::Browser("chrome binary not found".to_string()));
        }

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        let download_number = journal.count("download") as u32;

        Ok(Box::new(FakePortal {
            queued: script.queued,
            script,
            journal: Arc::clone(&self.journal),
            download_dir: self.download_dir.clone(),
            checks: 0,
            download_number,
            closed: false,
        }))
    }
}

pub struct FakePortal {
    script: PortalScript,
    journal: Arc<Mutex<Journal>>,
    download_dir: PathBuf,
    queued: u32,
    checks: u32,
    download_number: u32,
    closed: bool,
}

impl FakePortal {
    fn record(&self, event: impl Into<String>) {
        self.journal.lock().unwrap().events.push(event.into());
    }
}

impl ReportPortal for FakePortal {
    fn open_login(&mut self) -> Result<(), PortalError> {
        self.record("open_login");
        Ok(())
    }

    fn enter_username(&mut self, username: &str) -> Result<(), PortalError> {
        self.record(format!("username:{}", username));
        Ok(())
    }

    fn enter_password(&mut self, password: &SecretString) -> Result<(), PortalError> {
        self.record("password");
        self.journal
            .lock()
            .unwrap()
            .passwords
            .push(password.expose_secret().to_string());
        Ok(())
    }

    fn submit_login(&mut self) -> Result<(), PortalError> {
        self.record("submit_login");
        Ok(())
    }

    fn select_company(&mut self, company: &str) -> Result<(), PortalError> {
        self.record(format!("company:{}", company));
        if self.script.fail_company {
            return Err(PortalError::ElementNotFound {
                what: "company option",
                selector: format!("//div[@id='ui-id-2' and contains(text(), '{}')]", company),
                reason: "timed out".to_string(),
            });
        }
        Ok(())
    }

    fn confirm_company(&mut self) -> Result<(), PortalError> {
        self.record("confirm_company");
        Ok(())
    }

    fn open_generator(&mut self, family: ReportFamily) -> Result<(), PortalError> {
        self.record(format!("open:{}", family.query_value()));
        Ok(())
    }

    fn remove_oldest_queued(&mut self) -> Result<bool, PortalError> {
        if self.queued == 0 {
            return Ok(false);
        }
        self.queued -= 1;
        self.record("remove");
        Ok(true)
    }

    fn select_by_salesperson(&mut self) -> Result<(), PortalError> {
        self.record("salesperson");
        Ok(())
    }

    fn select_report_type(&mut self, report_type: ReportType) -> Result<(), PortalError> {
        self.record(format!("type:{}", report_type.option_value()));
        Ok(())
    }

    fn select_period(&mut self, period: Period) -> Result<(), PortalError> {
        self.record(format!("period:{}", period.option_value()));
        Ok(())
    }

    fn trigger_generation(&mut self) -> Result<(), PortalError> {
        self.record("generate");
        self.checks = 0;
        Ok(())
    }

    fn dismiss_acknowledgement(&mut self) -> Result<bool, PortalError> {
        Ok(false)
    }

    fn has_dated_report(&mut self, date: &str) -> Result<bool, PortalError> {
        self.checks += 1;
        self.record(format!("check:{}", date));
        Ok(!self.script.row_never_appears && self.checks >= self.script.row_after_checks)
    }

    fn refresh_listing(&mut self) -> Result<(), PortalError> {
        self.record("refresh");
        Ok(())
    }

    fn download_dated_report(&mut self, _date: &str) -> Result<(), PortalError> {
        self.record("download");
        self.download_number += 1;
        std::fs::create_dir_all(&self.download_dir).unwrap();
        let name = format!("relatorio_{}.xlsx", self.download_number);
        std::fs::write(self.download_dir.join(name), &self.script.download_content).unwrap();
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.record("close");
        }
    }
}
