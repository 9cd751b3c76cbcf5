//! Tracing initialization shared by every binary in the workspace.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Initializes a global `tracing` subscriber: `RUST_LOG` (default `info`)
/// drives the filter, output goes to stdout in the default `fmt` format.
pub fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    Registry::default()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to set global tracing subscriber: {e}"))?;

    Ok(())
}
