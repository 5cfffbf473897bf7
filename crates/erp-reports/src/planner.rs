//! Decides which report targets need regenerating.
//!
//! A target is fresh when its destination file exists and the file's local
//! modification date falls inside the cadence window of "now". Planning only
//! reads file metadata.

use std::path::Path;

use chrono::{DateTime, Datelike, Local};
use log::debug;

use crate::config::Config;
use crate::sanitize;
use crate::target::{Cadence, ReportTarget};

pub fn is_fresh(path: &Path, cadence: Cadence, now: DateTime<Local>) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }
    let Ok(modified) = metadata.modified() else {
        return false;
    };
    let modified: DateTime<Local> = modified.into();

    match cadence {
        Cadence::Daily => modified.date_naive() == now.date_naive(),
        Cadence::Monthly => modified.year() == now.year() && modified.month() == now.month(),
        Cadence::Yearly => modified.year() == now.year(),
    }
}

/// Targets split by freshness, each list kept in generation order.
#[derive(Debug, Clone)]
pub struct Plan {
    pub fresh: Vec<ReportTarget>,
    pub stale: Vec<ReportTarget>,
}

impl Plan {
    pub fn build(config: &Config, now: DateTime<Local>) -> Self {
        let targets = ReportTarget::resolve_all(config, now.date_naive());
        Self::from_targets(targets, now)
    }

    pub fn from_targets(targets: Vec<ReportTarget>, now: DateTime<Local>) -> Self {
        let (fresh, stale): (Vec<_>, Vec<_>) = targets
            .into_iter()
            .partition(|target| is_fresh(&target.path(), target.cadence, now));

        for target in &fresh {
            debug!(
                "{} is fresh ({}): {}",
                target.kind,
                target.cadence.window_label(),
                sanitize::redact_path(&target.path())
            );
        }
        for target in &stale {
            debug!(
                "{} needs regenerating: {}",
                target.kind,
                sanitize::redact_path(&target.path())
            );
        }

        Self { fresh, stale }
    }

    pub fn all_fresh(&self) -> bool {
        self.stale.is_empty()
    }
}
