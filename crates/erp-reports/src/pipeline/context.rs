use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::status::RunLog;
use crate::storage::Relocated;
use crate::target::{ReportFamily, ReportTarget};

use super::error::PipelineWarning;

/// Where one target is in its generate → download → relocate protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPhase {
    NotStarted,
    Navigated,
    Cleaned,
    Configured,
    Generating,
    Polling { attempt: u32 },
    Found,
    Downloading,
    Downloaded,
    Relocated,
    Done,
    Aborted(String),
}

impl fmt::Display for TargetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPhase::NotStarted => f.write_str("not started"),
            TargetPhase::Navigated => f.write_str("on generator page"),
            TargetPhase::Cleaned => f.write_str("queue cleaned"),
            TargetPhase::Configured => f.write_str("controls set"),
            TargetPhase::Generating => f.write_str("generating"),
            TargetPhase::Polling { attempt } => write!(f, "waiting for report (check {})", attempt),
            TargetPhase::Found => f.write_str("report listed"),
            TargetPhase::Downloading => f.write_str("downloading"),
            TargetPhase::Downloaded => f.write_str("downloaded"),
            TargetPhase::Relocated => f.write_str("relocated"),
            TargetPhase::Done => f.write_str("done"),
            TargetPhase::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

pub struct TargetContext {
    pub target: ReportTarget,
    pub phase: TargetPhase,

    // Set once the downloads folder produced the file
    pub download: Option<PathBuf>,

    // Set after relocation
    pub relocated: Option<Relocated>,

    pub removed_queued: u32,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl TargetContext {
    pub fn new(target: ReportTarget) -> Self {
        Self {
            target,
            phase: TargetPhase::NotStarted,
            download: None,
            relocated: None,
            removed_queued: 0,
            warnings: Vec::new(),
        }
    }
}

/// State shared by the targets of one session attempt.
pub struct SessionContext {
    pub attempt: u32,
    pub today: NaiveDate,
    /// `today` as the portal prints it in the report listing.
    pub date_label: String,
    /// Generator page the active tab currently shows.
    pub current_generator: Option<ReportFamily>,
    pub log: RunLog,
}

impl SessionContext {
    pub fn new(attempt: u32, today: NaiveDate, mut log: RunLog) -> Self {
        log.begin_attempt(attempt);
        Self {
            attempt,
            today,
            date_label: listing_date(today),
            current_generator: None,
            log,
        }
    }

    pub fn into_log(self) -> RunLog {
        self.log
    }
}

/// `dd/mm/yyyy`, the format of the listing's date column.
pub fn listing_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
