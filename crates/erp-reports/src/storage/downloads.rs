use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use log::{debug, info};
use walkdir::WalkDir;

use crate::config::PollingConfig;
use crate::error::StorageError;
use crate::sanitize;

/// Extension of the spreadsheets the portal produces.
const REPORT_EXTENSION: &str = "xlsx";

/// Extensions browsers use while a download is still being written.
const PROVISIONAL_EXTENSIONS: &[&str] = &["crdownload", "part", "tmp"];

/// Filesystem timestamps can trail the click that started the download.
const CLOCK_SLACK: Duration = Duration::from_secs(2);

/// Watches the browser's downloads folder for a finished report.
pub struct DownloadWatcher {
    directory: PathBuf,
    attempts: u32,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

/// What one look at the downloads folder found.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DownloadScan {
    /// Newest finished report, if any.
    pub finished: Option<PathBuf>,
    /// Newest file still being written, if any.
    pub provisional: Option<PathBuf>,
}

impl DownloadWatcher {
    pub fn new<P: AsRef<Path>>(
        directory: P,
        polling: &PollingConfig,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            attempts: polling.download_attempts,
            interval: polling.download_interval,
            shutdown,
        }
    }

    /// Looks at the top level of the downloads folder once.
    ///
    /// Only files modified at or after `since` (minus a small slack) count.
    pub fn scan(&self, since: SystemTime) -> Result<DownloadScan, StorageError> {
        let cutoff = since.checked_sub(CLOCK_SLACK).unwrap_or(since);
        let mut finished: Option<(SystemTime, PathBuf)> = None;
        let mut provisional: Option<(SystemTime, PathBuf)> = None;

        for entry in WalkDir::new(&self.directory).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| StorageError::ScanFailed {
                path: self.directory.clone(),
                source: e,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            // A file can vanish between listing and stat while the browser renames it
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let Ok(modified) = metadata.modified() else {
                continue;
            };
            if modified < cutoff {
                continue;
            }

            let path = entry.path();
            let slot = if is_provisional(path) {
                &mut provisional
            } else if is_report(path) && metadata.len() > 0 {
                &mut finished
            } else {
                continue;
            };

            if slot.as_ref().map_or(true, |(newest, _)| modified > *newest) {
                *slot = Some((modified, path.to_path_buf()));
            }
        }

        Ok(DownloadScan {
            finished: finished.map(|(_, p)| p),
            provisional: provisional.map(|(_, p)| p),
        })
    }

    /// Polls until a finished report appears.
    ///
    /// Returns `Ok(None)` when shutdown is requested while waiting.
    pub fn wait_for_download(&self, since: SystemTime) -> Result<Option<PathBuf>, StorageError> {
        let mut last_provisional = None;

        for attempt in 1..=self.attempts {
            if self.shutdown.load(Ordering::Relaxed) {
                info!("Download wait interrupted by shutdown");
                return Ok(None);
            }

            let scan = self.scan(since)?;
            if let Some(path) = scan.finished {
                debug!(
                    "Download finished after {} check(s): {}",
                    attempt,
                    sanitize::redact_path(&path)
                );
                return Ok(Some(path));
            }
            if scan.provisional.is_some() {
                last_provisional = scan.provisional;
            }

            if attempt < self.attempts {
                std::thread::sleep(self.interval);
            }
        }

        match last_provisional {
            Some(path) => Err(StorageError::DownloadNotFinalized {
                path,
                attempts: self.attempts,
            }),
            None => Err(StorageError::DownloadNotFound {
                directory: self.directory.clone(),
                attempts: self.attempts,
            }),
        }
    }
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_provisional(path: &Path) -> bool {
    extension_lowercase(path)
        .map(|ext| PROVISIONAL_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn is_report(path: &Path) -> bool {
    extension_lowercase(path).as_deref() == Some(REPORT_EXTENSION)
}
