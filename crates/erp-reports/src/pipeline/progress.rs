use std::path::PathBuf;

use log::{error, info};

use crate::status::Step;
use crate::target::ReportKind;

use super::context::TargetPhase;

/// Events emitted while a session runs.
pub enum ProgressEvent {
    Authenticating,
    Phase {
        kind: ReportKind,
        phase: TargetPhase,
    },
    Completed {
        kind: ReportKind,
        path: PathBuf,
    },
    Failed {
        kind: Option<ReportKind>,
        step: Step,
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Writes progress to the log, for interactive runs.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Authenticating => info!("Signing in to the ERP"),
            ProgressEvent::Phase { kind, phase } => info!("{}: {}", kind, phase),
            ProgressEvent::Completed { kind, path } => {
                info!("{}: saved {}", kind, crate::sanitize::redact_path(&path))
            }
            ProgressEvent::Failed { kind, step, error } => match kind {
                Some(kind) => error!("{}: {} failed: {}", kind, step, error),
                None => error!("{} failed: {}", step, error),
            },
        }
    }
}
