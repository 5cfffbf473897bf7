pub mod downloads;
pub mod filesystem;

pub use downloads::DownloadWatcher;
pub use filesystem::{FileStorage, Relocated};
