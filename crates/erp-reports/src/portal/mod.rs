//! The ERP's report-generation UI, seen as a set of blocking operations.
//!
//! [`ReportPortal`] is what the sequencer drives. [`chrome::ChromePortal`]
//! implements it against a real browser; tests substitute a scripted fake.

pub mod chrome;
pub mod selectors;

use secrecy::SecretString;

use crate::error::PortalError;
use crate::target::{Period, ReportFamily, ReportType};

pub use chrome::{ChromeLauncher, ChromePortal};

/// One live browser session on the ERP.
///
/// Every method blocks until the interaction finished or its wait budget ran
/// out. Element lookups that time out surface as
/// [`PortalError::ElementNotFound`].
pub trait ReportPortal {
    fn open_login(&mut self) -> Result<(), PortalError>;

    fn enter_username(&mut self, username: &str) -> Result<(), PortalError>;

    /// Waits for the password field to be present and visible, then types.
    fn enter_password(&mut self, password: &SecretString) -> Result<(), PortalError>;

    fn submit_login(&mut self) -> Result<(), PortalError>;

    /// Picks the company from the context modal.
    fn select_company(&mut self, company: &str) -> Result<(), PortalError>;

    fn confirm_company(&mut self) -> Result<(), PortalError>;

    /// Opens the generator page for a report family.
    fn open_generator(&mut self, family: ReportFamily) -> Result<(), PortalError>;

    /// Removes the first queued report in the listing.
    ///
    /// Returns `Ok(false)` when there was nothing left to remove.
    fn remove_oldest_queued(&mut self) -> Result<bool, PortalError>;

    fn select_by_salesperson(&mut self) -> Result<(), PortalError>;

    fn select_report_type(&mut self, report_type: ReportType) -> Result<(), PortalError>;

    fn select_period(&mut self, period: Period) -> Result<(), PortalError>;

    fn trigger_generation(&mut self) -> Result<(), PortalError>;

    /// Dismisses the "report queued" dialog. `Ok(false)` when it never showed up.
    fn dismiss_acknowledgement(&mut self) -> Result<bool, PortalError>;

    /// Whether the listing shows a visible row dated `date` (`dd/mm/yyyy`).
    fn has_dated_report(&mut self, date: &str) -> Result<bool, PortalError>;

    fn refresh_listing(&mut self) -> Result<(), PortalError>;

    /// Clicks the download link of the first row dated `date`.
    fn download_dated_report(&mut self, date: &str) -> Result<(), PortalError>;

    /// Releases the browser. Calling it twice is harmless.
    fn close(&mut self);
}

/// Starts browser sessions; the orchestrator calls it once per session attempt.
pub trait PortalLauncher {
    fn launch(&self) -> Result<Box<dyn ReportPortal>, PortalError>;
}
