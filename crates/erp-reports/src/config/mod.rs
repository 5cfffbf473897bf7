pub mod loader;
pub mod schema;
pub mod variables;

pub use loader::{load_config_from, load_config_from_env, load_env_file};
pub use schema::{
    BrowserConfig, Config, Destinations, FilenameTemplates, PollingConfig, PortalConfig,
    PortalTimings, SessionConfig,
};
pub use variables::TemplateEngine;
