//! Session orchestration: plan, launch, sequence, and retry on a fresh browser.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Local;
use log::{info, warn};
use tracing::info_span;
use uuid::Uuid;

use crate::config::Config;
use crate::pipeline::{ProgressReporter, SessionContext, Sequencer};
use crate::planner::Plan;
use crate::portal::{PortalLauncher, ReportPortal};
use crate::status::{RunLog, RunReport, Step, TargetReport, TargetStatus};
use crate::target::{ReportKind, ReportTarget};

pub struct Session<'a> {
    config: &'a Config,
    launcher: &'a dyn PortalLauncher,
    shutdown: Arc<AtomicBool>,
}

impl<'a> Session<'a> {
    pub fn new(
        config: &'a Config,
        launcher: &'a dyn PortalLauncher,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            launcher,
            shutdown,
        }
    }

    /// Runs up to `session.attempts` browser sessions and reports every target.
    ///
    /// Freshness is re-planned before each attempt, so a relaunch never
    /// regenerates what an earlier attempt already saved.
    pub fn run(&self, progress: &dyn ProgressReporter) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Local::now();
        let _session_span = info_span!("session", run_id = %run_id).entered();

        let max_attempts = self.config.session.attempts.max(1);
        let mut log = RunLog::new();
        let mut launched = 0;
        let mut targets: Vec<ReportTarget> = Vec::new();
        let mut statuses: HashMap<ReportKind, TargetStatus> = HashMap::new();

        for attempt in 1..=max_attempts {
            let _attempt_span = info_span!("attempt", attempt).entered();
            log.begin_attempt(attempt);

            let now = Local::now();
            let plan = Plan::build(self.config, now);
            targets = plan.fresh.iter().chain(&plan.stale).cloned().collect();
            targets.sort_by_key(|t| kind_order(t.kind));
            merge_plan(&mut statuses, &plan);

            if plan.all_fresh() {
                info!("All reports are up to date; nothing to generate");
                log.skipped(Step::Plan, "all reports are up to date");
                break;
            }
            log.ok_with(
                Step::Plan,
                format!(
                    "{} of {} report(s) need regenerating",
                    plan.stale.len(),
                    ReportKind::ALL.len()
                ),
            );

            if self.shutdown.load(Ordering::Relaxed) {
                log.failed(Step::Launch, "cancelled before launch");
                break;
            }

            launched += 1;
            let mut portal = match self.launcher.launch() {
                Ok(portal) => {
                    log.ok(Step::Launch);
                    portal
                }
                Err(e) => {
                    warn!("Browser launch failed: {}", e);
                    log.failed(Step::Launch, e.to_string());
                    break;
                }
            };

            let sequencer = Sequencer::new(self.config, Arc::clone(&self.shutdown));
            let mut ctx = SessionContext::new(attempt, now.date_naive(), log);
            let outcome = sequencer.run(portal.as_mut(), &mut ctx, &plan.stale, progress);
            log = ctx.into_log();

            for (kind, status) in outcome.statuses.iter().cloned() {
                statuses.insert(kind, status);
            }

            let retry = outcome.is_retryable() && attempt < max_attempts;
            if retry {
                info!(
                    "Company selection failed on attempt {}; relaunching in {:?}",
                    attempt, self.config.session.relaunch_delay
                );
                teardown(portal.as_mut(), &mut log);
                self.sleep_unless_shutdown(self.config.session.relaunch_delay);
                continue;
            }

            self.hold_open();
            teardown(portal.as_mut(), &mut log);
            break;
        }

        let targets = targets
            .iter()
            .map(|target| {
                let status = statuses
                    .get(&target.kind)
                    .cloned()
                    .unwrap_or(TargetStatus::NotAttempted);
                TargetReport::new(target, status)
            })
            .collect();

        RunReport {
            run_id,
            started_at,
            finished_at: Local::now(),
            attempts: launched,
            targets,
            records: log.into_records(),
        }
    }

    /// Keeps the final browser window up so an operator can look at it.
    fn hold_open(&self) {
        let hold = self.config.session.hold_open;
        if hold.is_zero() {
            return;
        }
        info!("Keeping the browser open for {:?}", hold);
        self.sleep_unless_shutdown(hold);
    }

    fn sleep_unless_shutdown(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.shutdown.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            std::thread::sleep((deadline - now).min(Duration::from_millis(250)));
        }
    }
}

fn teardown(portal: &mut dyn ReportPortal, log: &mut RunLog) {
    portal.close();
    log.set_target(None);
    log.ok(Step::Teardown);
}

/// Fresh targets become `AlreadyFresh` unless an earlier attempt generated them.
fn merge_plan(statuses: &mut HashMap<ReportKind, TargetStatus>, plan: &Plan) {
    for target in &plan.fresh {
        let generated_earlier = matches!(
            statuses.get(&target.kind),
            Some(TargetStatus::Generated { .. })
        );
        if !generated_earlier {
            statuses.insert(
                target.kind,
                TargetStatus::AlreadyFresh {
                    cadence: target.cadence,
                },
            );
        }
    }
    for target in &plan.stale {
        statuses.insert(target.kind, TargetStatus::NotAttempted);
    }
}

fn kind_order(kind: ReportKind) -> usize {
    ReportKind::ALL
        .iter()
        .position(|k| *k == kind)
        .unwrap_or(ReportKind::ALL.len())
}
