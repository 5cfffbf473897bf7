//! Typed run log and the final per-target report.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::target::{Cadence, ReportKind, ReportTarget};

/// A single action of the session protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Plan,
    Launch,
    OpenLogin,
    EnterUsername,
    EnterPassword,
    SubmitLogin,
    SelectCompany,
    ConfirmCompany,
    OpenGenerator,
    Cleanup,
    SelectSalesperson,
    SelectReportType,
    SelectPeriod,
    Generate,
    Acknowledge,
    Refresh,
    AwaitReport,
    Download,
    AwaitFile,
    Relocate,
    RemoveTemp,
    Teardown,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Plan => "plan",
            Step::Launch => "launch browser",
            Step::OpenLogin => "open login page",
            Step::EnterUsername => "enter username",
            Step::EnterPassword => "enter password",
            Step::SubmitLogin => "submit login",
            Step::SelectCompany => "select company",
            Step::ConfirmCompany => "confirm company",
            Step::OpenGenerator => "open report generator",
            Step::Cleanup => "remove queued reports",
            Step::SelectSalesperson => "select by salesperson",
            Step::SelectReportType => "select report type",
            Step::SelectPeriod => "select period",
            Step::Generate => "generate report",
            Step::Acknowledge => "acknowledge dialog",
            Step::Refresh => "refresh listing",
            Step::AwaitReport => "wait for report",
            Step::Download => "download report",
            Step::AwaitFile => "wait for downloaded file",
            Step::Relocate => "relocate file",
            Step::RemoveTemp => "remove temporary download",
            Step::Teardown => "close browser",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Ok,
    Skipped,
    Warning,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub attempt: u32,
    pub target: Option<ReportKind>,
    pub step: Step,
    pub kind: OutcomeKind,
    pub message: String,
}

impl fmt::Display for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            OutcomeKind::Ok => "ok",
            OutcomeKind::Skipped => "skipped",
            OutcomeKind::Warning => "warning",
            OutcomeKind::Failed => "FAILED",
        };
        write!(f, "[attempt {}] ", self.attempt)?;
        if let Some(target) = self.target {
            write!(f, "{} / ", target)?;
        }
        write!(f, "{}: {}", self.step, kind)?;
        if !self.message.is_empty() {
            write!(f, " - {}", self.message)?;
        }
        Ok(())
    }
}

/// Ordered step records for a whole run, across session attempts.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunLog {
    records: Vec<StepRecord>,
    #[serde(skip)]
    attempt: u32,
    #[serde(skip)]
    target: Option<ReportKind>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags subsequent records with a session attempt number.
    pub fn begin_attempt(&mut self, attempt: u32) {
        self.attempt = attempt;
        self.target = None;
    }

    /// Tags subsequent records with a target (or none, for session-level steps).
    pub fn set_target(&mut self, target: Option<ReportKind>) {
        self.target = target;
    }

    pub fn record(&mut self, step: Step, kind: OutcomeKind, message: impl Into<String>) {
        self.records.push(StepRecord {
            attempt: self.attempt,
            target: self.target,
            step,
            kind,
            message: message.into(),
        });
    }

    pub fn ok(&mut self, step: Step) {
        self.record(step, OutcomeKind::Ok, String::new());
    }

    pub fn ok_with(&mut self, step: Step, message: impl Into<String>) {
        self.record(step, OutcomeKind::Ok, message);
    }

    pub fn skipped(&mut self, step: Step, message: impl Into<String>) {
        self.record(step, OutcomeKind::Skipped, message);
    }

    pub fn warning(&mut self, step: Step, message: impl Into<String>) {
        self.record(step, OutcomeKind::Warning, message);
    }

    pub fn failed(&mut self, step: Step, message: impl Into<String>) {
        self.record(step, OutcomeKind::Failed, message);
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<StepRecord> {
        self.records
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    AlreadyFresh { cadence: Cadence },
    Generated { path: PathBuf },
    Failed { step: Step, reason: String },
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetReport {
    pub kind: ReportKind,
    pub filename: String,
    #[serde(flatten)]
    pub status: TargetStatus,
}

impl TargetReport {
    pub fn new(target: &ReportTarget, status: TargetStatus) -> Self {
        Self {
            kind: target.kind,
            filename: target.filename.clone(),
            status,
        }
    }

    pub fn summary_line(&self) -> String {
        let outcome = match &self.status {
            TargetStatus::AlreadyFresh { cadence } => {
                format!("already generated {}", cadence.window_label())
            }
            TargetStatus::Generated { .. } => "ok".to_string(),
            TargetStatus::Failed { .. } => "error".to_string(),
            TargetStatus::NotAttempted => "not attempted".to_string(),
        };
        format!("{} - {}", self.filename, outcome)
    }
}

/// Everything a run produced: per-target outcomes plus the full step log.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    /// Session attempts actually launched (0 when everything was fresh).
    pub attempts: u32,
    pub targets: Vec<TargetReport>,
    pub records: Vec<StepRecord>,
}

impl RunReport {
    /// One line per target in generation order.
    pub fn summary_lines(&self) -> Vec<String> {
        self.targets.iter().map(TargetReport::summary_line).collect()
    }

    /// Records that need an operator's attention.
    pub fn actionable_errors(&self) -> Vec<&StepRecord> {
        self.records
            .iter()
            .filter(|r| r.kind == OutcomeKind::Failed)
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.targets.iter().all(|t| {
            matches!(
                t.status,
                TargetStatus::AlreadyFresh { .. } | TargetStatus::Generated { .. }
            )
        })
    }
}
