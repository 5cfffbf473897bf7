pub mod config;
pub mod error;
pub mod pipeline;
pub mod planner;
pub mod portal;
pub mod sanitize;
pub mod secrets;
pub mod session;
pub mod status;
pub mod storage;
pub mod target;

pub use config::{load_config_from_env, Config, TemplateEngine};
pub use error::{ConfigError, PortalError, ReportsError, StorageError};
pub use pipeline::{PipelineError, Sequencer};
pub use planner::Plan;
pub use portal::{PortalLauncher, ReportPortal};
pub use secrets::{resolve_secret, SecretError};
pub use session::Session;
pub use status::{RunReport, TargetStatus};
pub use target::{ReportKind, ReportTarget};
