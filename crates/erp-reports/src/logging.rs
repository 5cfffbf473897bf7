//! Subscriber setup for the binary.
//!
//! Library code logs through `log` and opens `tracing` spans; both end up in
//! the same `tracing-subscriber` pipeline.

use tracing_log::LogTracer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset. Chrome's CDP chatter stays at warn.
const DEFAULT_FILTER: &str = "info,headless_chrome=warn,tungstenite=warn";

pub fn init(json: bool) -> anyhow::Result<()> {
    LogTracer::init()?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = Registry::default().with(filter);

    if json {
        let subscriber = registry.with(fmt::layer().json().with_current_span(true));
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = registry.with(fmt::layer().with_target(false));
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}
