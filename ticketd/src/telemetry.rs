//! Tracing initialisation.
//!
//! Log verbosity follows `RUST_LOG` (standard `EnvFilter` syntax), defaulting
//! to `info`. Repository methods are instrumented with `#[instrument]`, so a
//! filter like `RUST_LOG=ticketd=debug,sqlx=warn` shows per-operation spans
//! without the driver noise.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber with console output.
///
/// Safe to call once per process; a second call returns an error from
/// `try_init` which is propagated to the caller.
pub fn init_telemetry() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
