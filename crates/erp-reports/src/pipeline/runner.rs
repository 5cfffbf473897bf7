use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, info_span, warn};

use crate::config::Config;
use crate::error::PortalError;
use crate::portal::ReportPortal;
use crate::sanitize;
use crate::status::{Step, TargetStatus};
use crate::storage::{DownloadWatcher, FileStorage, Relocated};
use crate::target::{ReportKind, ReportTarget};

use super::context::{SessionContext, TargetContext, TargetPhase};
use super::error::{PipelineError, PipelineWarning};
use super::progress::{ProgressEvent, ProgressReporter};

/// Drives one authenticated browser session through the stale targets.
pub struct Sequencer<'a> {
    config: &'a Config,
    storage: FileStorage,
    downloads: DownloadWatcher,
    shutdown: Arc<AtomicBool>,
}

/// What one session attempt achieved.
#[derive(Debug)]
pub struct SequenceOutcome {
    /// Status of every target handed to the sequencer, in order.
    pub statuses: Vec<(ReportKind, TargetStatus)>,
    /// The failure that ended the attempt early, if any.
    pub error: Option<PipelineError>,
}

impl SequenceOutcome {
    pub fn is_retryable(&self) -> bool {
        self.error.as_ref().is_some_and(PipelineError::is_retryable)
    }
}

impl<'a> Sequencer<'a> {
    pub fn new(config: &'a Config, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            config,
            storage: FileStorage::new(),
            downloads: DownloadWatcher::new(
                &config.download_directory,
                &config.polling,
                Arc::clone(&shutdown),
            ),
            shutdown,
        }
    }

    /// Signs in, then generates every target in order, stopping at the first failure.
    pub fn run(
        &self,
        portal: &mut dyn ReportPortal,
        ctx: &mut SessionContext,
        targets: &[ReportTarget],
        progress: &dyn ProgressReporter,
    ) -> SequenceOutcome {
        let mut statuses: Vec<(ReportKind, TargetStatus)> = targets
            .iter()
            .map(|t| (t.kind, TargetStatus::NotAttempted))
            .collect();

        ctx.log.set_target(None);
        {
            let _step = info_span!("authenticate").entered();
            progress.report(ProgressEvent::Authenticating);
            if let Err(e) = self.authenticate(portal, ctx) {
                let message = e.to_string();
                ctx.log.failed(e.step(), message.clone());
                progress.report(ProgressEvent::Failed {
                    kind: None,
                    step: e.step(),
                    error: message,
                });
                return SequenceOutcome {
                    statuses,
                    error: Some(e),
                };
            }
        }

        for (index, target) in targets.iter().enumerate() {
            let _span = info_span!("target",
                kind = %target.kind,
                filename = %target.filename,
            )
            .entered();

            ctx.log.set_target(Some(target.kind));
            let mut target_ctx = TargetContext::new(target.clone());

            match self.run_target(portal, ctx, &mut target_ctx, progress) {
                Ok(path) => {
                    progress.report(ProgressEvent::Completed {
                        kind: target.kind,
                        path: path.clone(),
                    });
                    statuses[index].1 = TargetStatus::Generated { path };
                }
                Err(e) => {
                    let message = e.to_string();
                    target_ctx.phase = TargetPhase::Aborted(message.clone());
                    ctx.log.failed(e.step(), message.clone());
                    progress.report(ProgressEvent::Failed {
                        kind: Some(target.kind),
                        step: e.step(),
                        error: message.clone(),
                    });
                    statuses[index].1 = TargetStatus::Failed {
                        step: e.step(),
                        reason: message,
                    };
                    ctx.log.set_target(None);
                    return SequenceOutcome {
                        statuses,
                        error: Some(e),
                    };
                }
            }
        }

        ctx.log.set_target(None);
        SequenceOutcome {
            statuses,
            error: None,
        }
    }

    pub fn authenticate(
        &self,
        portal: &mut dyn ReportPortal,
        ctx: &mut SessionContext,
    ) -> Result<(), PipelineError> {
        let portal_config = &self.config.portal;

        checked(ctx, Step::OpenLogin, portal.open_login())?;
        checked(
            ctx,
            Step::EnterUsername,
            portal.enter_username(&portal_config.username),
        )?;
        checked(
            ctx,
            Step::EnterPassword,
            portal.enter_password(&portal_config.password),
        )?;
        checked(ctx, Step::SubmitLogin, portal.submit_login())?;
        checked(
            ctx,
            Step::SelectCompany,
            portal.select_company(&portal_config.company),
        )?;
        checked(ctx, Step::ConfirmCompany, portal.confirm_company())?;
        ctx.current_generator = None;
        Ok(())
    }

    /// Runs the generate → poll → download → relocate protocol for one target.
    /// Returns the destination path.
    pub fn run_target(
        &self,
        portal: &mut dyn ReportPortal,
        ctx: &mut SessionContext,
        target: &mut TargetContext,
        progress: &dyn ProgressReporter,
    ) -> Result<PathBuf, PipelineError> {
        let kind = target.target.kind;

        {
            let _step = info_span!("open_generator").entered();
            self.check_shutdown(Step::OpenGenerator)?;
            self.step_open_generator(portal, ctx, kind)?;
            advance(target, TargetPhase::Navigated, progress);
        }

        {
            let _step = info_span!("cleanup").entered();
            self.step_cleanup(portal, ctx, target);
            advance(target, TargetPhase::Cleaned, progress);
        }

        {
            let _step = info_span!("configure").entered();
            self.step_configure(portal, ctx, kind)?;
            advance(target, TargetPhase::Configured, progress);
        }

        {
            let _step = info_span!("generate").entered();
            checked(ctx, Step::Generate, portal.trigger_generation())?;
            advance(target, TargetPhase::Generating, progress);
            match portal.dismiss_acknowledgement() {
                Ok(true) => ctx.log.ok(Step::Acknowledge),
                Ok(false) => ctx.log.skipped(Step::Acknowledge, "dialog not shown"),
                Err(e) => ctx.log.skipped(Step::Acknowledge, e.to_string()),
            }
        }

        {
            let _step = info_span!("await_report").entered();
            self.step_await_report(portal, ctx, target, progress)?;
            advance(target, TargetPhase::Found, progress);
        }

        let download = {
            let _step = info_span!("download").entered();
            let download = self.step_download(portal, ctx, target)?;
            advance(target, TargetPhase::Downloaded, progress);
            download
        };

        let _step = info_span!("relocate").entered();
        let relocated = self.step_relocate(ctx, target, &download)?;
        advance(target, TargetPhase::Relocated, progress);
        self.step_remove_temp(ctx, target, &download);
        advance(target, TargetPhase::Done, progress);

        Ok(relocated.path)
    }

    fn check_shutdown(&self, step: Step) -> Result<(), PipelineError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(PipelineError::Cancelled { step });
        }
        Ok(())
    }

    fn step_open_generator(
        &self,
        portal: &mut dyn ReportPortal,
        ctx: &mut SessionContext,
        kind: ReportKind,
    ) -> Result<(), PipelineError> {
        let family = kind.family();
        if kind.reuses_open_generator() && ctx.current_generator == Some(family) {
            ctx.log
                .skipped(Step::OpenGenerator, "already on the generator page");
            return Ok(());
        }

        checked(ctx, Step::OpenGenerator, portal.open_generator(family))?;
        ctx.current_generator = Some(family);
        Ok(())
    }

    /// Best effort: queue cleanup problems are recorded and never abort.
    fn step_cleanup(
        &self,
        portal: &mut dyn ReportPortal,
        ctx: &mut SessionContext,
        target: &mut TargetContext,
    ) {
        let limit = target.target.kind.cleanup_limit();
        let mut failures = 0;

        for _ in 0..limit {
            match portal.remove_oldest_queued() {
                Ok(true) => target.removed_queued += 1,
                Ok(false) => break,
                Err(e) => {
                    warn!("Failed to remove queued report: {}", e);
                    failures += 1;
                    ctx.log.warning(Step::Cleanup, e.to_string());
                    target.warnings.push(PipelineWarning::CleanupFailed {
                        error: e.to_string(),
                    });
                }
            }
        }

        if failures == 0 {
            ctx.log.ok_with(
                Step::Cleanup,
                format!("{} queued report(s) removed", target.removed_queued),
            );
        }
    }

    fn step_configure(
        &self,
        portal: &mut dyn ReportPortal,
        ctx: &mut SessionContext,
        kind: ReportKind,
    ) -> Result<(), PipelineError> {
        let controls = kind.controls();

        if controls.by_salesperson {
            checked(ctx, Step::SelectSalesperson, portal.select_by_salesperson())?;
        }
        if let Some(report_type) = controls.report_type {
            checked(
                ctx,
                Step::SelectReportType,
                portal.select_report_type(report_type),
            )?;
        }
        if let Some(period) = controls.period {
            checked(ctx, Step::SelectPeriod, portal.select_period(period))?;
        }
        Ok(())
    }

    fn step_await_report(
        &self,
        portal: &mut dyn ReportPortal,
        ctx: &mut SessionContext,
        target: &mut TargetContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let attempts = self.config.polling.report_attempts;

        for attempt in 1..=attempts {
            self.check_shutdown(Step::AwaitReport)?;
            advance(target, TargetPhase::Polling { attempt }, progress);

            match portal.has_dated_report(&ctx.date_label) {
                Ok(true) => {
                    ctx.log.ok_with(
                        Step::AwaitReport,
                        format!("listed after {} check(s)", attempt),
                    );
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => debug!("Listing check {} failed: {}", attempt, e),
            }

            if attempt == attempts {
                break;
            }
            if let Err(e) = portal.refresh_listing() {
                ctx.log.warning(Step::Refresh, e.to_string());
                target.warnings.push(PipelineWarning::RefreshFailed {
                    attempt,
                    error: e.to_string(),
                });
            }
            std::thread::sleep(self.config.polling.report_interval);
        }

        Err(PipelineError::NotFound {
            date: ctx.date_label.clone(),
            attempts,
        })
    }

    fn step_download(
        &self,
        portal: &mut dyn ReportPortal,
        ctx: &mut SessionContext,
        target: &mut TargetContext,
    ) -> Result<PathBuf, PipelineError> {
        let clicked_at = SystemTime::now();
        let clicked = portal.download_dated_report(&ctx.date_label);
        checked(ctx, Step::Download, clicked)?;
        target.phase = TargetPhase::Downloading;

        let download = self
            .downloads
            .wait_for_download(clicked_at)
            .map_err(|e| PipelineError::storage(Step::AwaitFile, e))?
            .ok_or(PipelineError::Cancelled {
                step: Step::AwaitFile,
            })?;

        ctx.log
            .ok_with(Step::AwaitFile, sanitize::redact_path(&download));
        target.download = Some(download.clone());
        Ok(download)
    }

    fn step_relocate(
        &self,
        ctx: &mut SessionContext,
        target: &mut TargetContext,
        download: &Path,
    ) -> Result<Relocated, PipelineError> {
        let keep_original_name =
            target.target.kind == ReportKind::Stock && self.config.archive_stock_download;

        let relocated = self
            .storage
            .relocate(
                download,
                target.target.directory(),
                &target.target.filename,
                keep_original_name,
            )
            .map_err(|e| PipelineError::storage(Step::Relocate, e))?;

        debug!(
            "Relocated {} -> {}",
            sanitize::redact_path(download),
            sanitize::redact_path(&relocated.path)
        );
        ctx.log.ok_with(Step::Relocate, target.target.filename.clone());
        target.relocated = Some(relocated.clone());
        Ok(relocated)
    }

    fn step_remove_temp(
        &self,
        ctx: &mut SessionContext,
        target: &mut TargetContext,
        download: &Path,
    ) {
        match self.storage.remove_download(download) {
            Ok(()) => ctx.log.ok(Step::RemoveTemp),
            Err(e) => {
                warn!("{}", e);
                ctx.log.warning(Step::RemoveTemp, e.to_string());
                target.warnings.push(PipelineWarning::TempRemovalFailed {
                    path: download.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Records `step` as done, or converts the portal failure.
fn checked<T>(
    ctx: &mut SessionContext,
    step: Step,
    result: Result<T, PortalError>,
) -> Result<T, PipelineError> {
    match result {
        Ok(value) => {
            ctx.log.ok(step);
            Ok(value)
        }
        Err(e) => Err(PipelineError::portal(step, e)),
    }
}

fn advance(target: &mut TargetContext, phase: TargetPhase, progress: &dyn ProgressReporter) {
    debug!("{}: {} -> {}", target.target.kind, target.phase, phase);
    target.phase = phase.clone();
    progress.report(ProgressEvent::Phase {
        kind: target.target.kind,
        phase,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::progress::NoopProgress;
    use crate::status::{OutcomeKind, RunLog};
    use crate::target::{Period, ReportFamily, ReportType};
    use chrono::Local;
    use secrecy::SecretString;
    use tempfile::TempDir;

    /// Minimal portal: every interaction succeeds; the listing shows today's
    /// row after `row_after` checks and a download drops a file.
    struct ScriptedPortal {
        calls: Vec<String>,
        queued: u32,
        fail_confirm_remove: bool,
        acknowledgement: bool,
        row_after: Option<u32>,
        checks: u32,
        download_dir: PathBuf,
    }

    impl ScriptedPortal {
        fn new(download_dir: &Path) -> Self {
            Self {
                calls: Vec::new(),
                queued: 0,
                fail_confirm_remove: false,
                acknowledgement: true,
                row_after: Some(1),
                checks: 0,
                download_dir: download_dir.to_path_buf(),
            }
        }

        fn count(&self, call: &str) -> usize {
            self.calls.iter().filter(|c| c.as_str() == call).count()
        }
    }

    impl ReportPortal for ScriptedPortal {
        fn open_login(&mut self) -> Result<(), PortalError> {
            self.calls.push("open_login".into());
            Ok(())
        }
        fn enter_username(&mut self, _: &str) -> Result<(), PortalError> {
            self.calls.push("username".into());
            Ok(())
        }
        fn enter_password(&mut self, _: &SecretString) -> Result<(), PortalError> {
            self.calls.push("password".into());
            Ok(())
        }
        fn submit_login(&mut self) -> Result<(), PortalError> {
            self.calls.push("submit".into());
            Ok(())
        }
        fn select_company(&mut self, _: &str) -> Result<(), PortalError> {
            self.calls.push("company".into());
            Ok(())
        }
        fn confirm_company(&mut self) -> Result<(), PortalError> {
            self.calls.push("confirm".into());
            Ok(())
        }
        fn open_generator(&mut self, family: ReportFamily) -> Result<(), PortalError> {
            self.calls.push(format!("open:{}", family.query_value()));
            Ok(())
        }
        fn remove_oldest_queued(&mut self) -> Result<bool, PortalError> {
            self.calls.push("remove".into());
            if self.fail_confirm_remove {
                return Err(PortalError::ElementNotFound {
                    what: "remove confirmation",
                    selector: "//button".into(),
                    reason: "timeout".into(),
                });
            }
            if self.queued == 0 {
                return Ok(false);
            }
            self.queued -= 1;
            Ok(true)
        }
        fn select_by_salesperson(&mut self) -> Result<(), PortalError> {
            self.calls.push("salesperson".into());
            Ok(())
        }
        fn select_report_type(&mut self, t: ReportType) -> Result<(), PortalError> {
            self.calls.push(format!("type:{}", t.option_value()));
            Ok(())
        }
        fn select_period(&mut self, p: Period) -> Result<(), PortalError> {
            self.calls.push(format!("period:{}", p.option_value()));
            Ok(())
        }
        fn trigger_generation(&mut self) -> Result<(), PortalError> {
            self.calls.push("generate".into());
            self.checks = 0;
            Ok(())
        }
        fn dismiss_acknowledgement(&mut self) -> Result<bool, PortalError> {
            Ok(self.acknowledgement)
        }
        fn has_dated_report(&mut self, _: &str) -> Result<bool, PortalError> {
            self.checks += 1;
            Ok(self.row_after.is_some_and(|n| self.checks >= n))
        }
        fn refresh_listing(&mut self) -> Result<(), PortalError> {
            self.calls.push("refresh".into());
            Ok(())
        }
        fn download_dated_report(&mut self, _: &str) -> Result<(), PortalError> {
            self.calls.push("download".into());
            std::fs::create_dir_all(&self.download_dir).unwrap();
            std::fs::write(self.download_dir.join("relatorio_123.xlsx"), b"PK data").unwrap();
            Ok(())
        }
        fn close(&mut self) {
            self.calls.push("close".into());
        }
    }

    fn setup() -> (TempDir, Config) {
        let tmp = TempDir::new().unwrap();
        let config = Config::for_tests(tmp.path());
        (tmp, config)
    }

    fn target(config: &Config, kind: ReportKind) -> ReportTarget {
        ReportTarget::resolve_all(config, Local::now().date_naive())
            .into_iter()
            .find(|t| t.kind == kind)
            .unwrap()
    }

    fn session_ctx() -> SessionContext {
        SessionContext::new(1, Local::now().date_naive(), RunLog::new())
    }

    fn no_shutdown() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn test_stock_target_happy_path() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::Stock));

        let path = sequencer
            .run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress)
            .unwrap();

        assert_eq!(path, config.destinations.inventory.join("Estoque Atual.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK data");
        assert_eq!(target_ctx.phase, TargetPhase::Done);
        assert!(config.destinations.inventory.join("relatorio_123.xlsx").exists());
        assert!(!config.download_directory.join("relatorio_123.xlsx").exists());
        assert!(target_ctx.warnings.is_empty());
        assert_eq!(target_ctx.relocated.as_ref().map(|r| &r.path), Some(&path));
        assert_eq!(
            target_ctx.download,
            Some(config.download_directory.join("relatorio_123.xlsx"))
        );
    }

    #[test]
    fn test_relocation_failure_keeps_download() {
        let (_tmp, config) = setup();
        // a plain file where the destination directory should be
        std::fs::create_dir_all(config.destinations.inventory.parent().unwrap()).unwrap();
        std::fs::write(&config.destinations.inventory, b"not a directory").unwrap();

        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::Stock));

        let err = sequencer
            .run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress)
            .unwrap_err();

        assert_eq!(err.step(), Step::Relocate);
        assert!(target_ctx.relocated.is_none());
        assert_eq!(target_ctx.phase, TargetPhase::Downloaded);
        assert!(config.download_directory.join("relatorio_123.xlsx").exists());
        assert!(!ctx
            .log
            .records()
            .iter()
            .any(|r| r.step == Step::RemoveTemp));
    }

    #[test]
    fn test_controls_for_previous_month_detail() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::DetailPreviousMonth));

        sequencer
            .run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress)
            .unwrap();

        assert!(portal.calls.contains(&"type:2".to_string()));
        assert!(portal.calls.contains(&"period:mes_passado".to_string()));
        assert_eq!(portal.count("salesperson"), 0);
        assert!(!config.destinations.sales_detail.join("relatorio_123.xlsx").exists());
    }

    #[test]
    fn test_current_month_detail_stays_on_sales_page() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        let mut ctx = session_ctx();
        ctx.current_generator = Some(ReportFamily::Sales);
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::DetailCurrentMonth));

        sequencer
            .run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress)
            .unwrap();

        assert_eq!(portal.count("open:venda"), 0);
        assert!(ctx
            .log
            .records()
            .iter()
            .any(|r| r.step == Step::OpenGenerator && r.kind == OutcomeKind::Skipped));
    }

    #[test]
    fn test_cleanup_respects_limit() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        portal.queued = 10;
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::DetailCurrentMonth));

        sequencer.step_cleanup(&mut portal, &mut ctx, &mut target_ctx);

        assert_eq!(target_ctx.removed_queued, 2);
        assert_eq!(portal.queued, 8);
    }

    #[test]
    fn test_cleanup_stops_when_queue_empty() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        portal.queued = 1;
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::Stock));

        sequencer.step_cleanup(&mut portal, &mut ctx, &mut target_ctx);

        assert_eq!(target_ctx.removed_queued, 1);
        assert_eq!(portal.count("remove"), 2);
    }

    #[test]
    fn test_cleanup_failures_are_warnings() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        portal.fail_confirm_remove = true;
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::SummaryCurrentYear));

        let result = sequencer.run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress);

        assert!(result.is_ok());
        assert_eq!(target_ctx.warnings.len(), 5);
        assert!(ctx
            .log
            .records()
            .iter()
            .filter(|r| r.step == Step::Cleanup)
            .all(|r| r.kind == OutcomeKind::Warning));
    }

    #[test]
    fn test_missing_acknowledgement_is_skipped() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        portal.acknowledgement = false;
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::Stock));

        sequencer
            .run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress)
            .unwrap();

        let ack = ctx
            .log
            .records()
            .iter()
            .find(|r| r.step == Step::Acknowledge)
            .unwrap();
        assert_eq!(ack.kind, OutcomeKind::Skipped);
    }

    #[test]
    fn test_poll_refreshes_until_row_appears() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        portal.row_after = Some(3);
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::Stock));

        sequencer
            .run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress)
            .unwrap();

        assert_eq!(portal.count("refresh"), 2);
    }

    #[test]
    fn test_poll_is_bounded() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        portal.row_after = None;
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::Stock));

        let err = sequencer
            .run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress)
            .unwrap_err();

        assert!(matches!(err, PipelineError::NotFound { attempts: 3, .. }));
        assert_eq!(portal.checks, 3);
        assert_eq!(portal.count("download"), 0);
    }

    #[test]
    fn test_shutdown_cancels_before_navigation() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, Arc::new(AtomicBool::new(true)));
        let mut portal = ScriptedPortal::new(&config.download_directory);
        let mut ctx = session_ctx();
        let mut target_ctx = TargetContext::new(target(&config, ReportKind::Stock));

        let err = sequencer
            .run_target(&mut portal, &mut ctx, &mut target_ctx, &NoopProgress)
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Cancelled {
                step: Step::OpenGenerator
            }
        ));
        assert!(portal.calls.is_empty());
    }

    #[test]
    fn test_run_authenticates_once_then_sequences() {
        let (_tmp, config) = setup();
        let sequencer = Sequencer::new(&config, no_shutdown());
        let mut portal = ScriptedPortal::new(&config.download_directory);
        let mut ctx = session_ctx();
        let targets = ReportTarget::resolve_all(&config, Local::now().date_naive());

        let outcome = sequencer.run(&mut portal, &mut ctx, &targets, &NoopProgress);

        assert!(outcome.error.is_none());
        assert_eq!(portal.count("company"), 1);
        assert_eq!(portal.count("generate"), 5);
        // stock opens its tab, the summary navigates to sales, current-month detail reuses it
        assert_eq!(portal.count("open:estoque"), 1);
        assert_eq!(portal.count("open:venda"), 3);
        assert!(outcome
            .statuses
            .iter()
            .all(|(_, s)| matches!(s, TargetStatus::Generated { .. })));
    }
}
