//! Telemetry initialization (tracing with a fmt subscriber).
//!
//! Log verbosity is controlled with the standard `RUST_LOG` environment variable,
//! e.g. `RUST_LOG=taskctl=debug,sqlx=warn`. Defaults to `info` when unset.

use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize tracing with console output
///
/// This function sets up tracing-subscriber with an EnvFilter and a fmt layer.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    info!("Telemetry initialized");

    Ok(())
}
