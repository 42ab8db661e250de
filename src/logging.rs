use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Initialize diagnostic logging on stderr.
///
/// User-facing progress goes to stdout; this only carries `tracing` events,
/// filtered by `RUST_LOG` (default `warn`).
pub fn init_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}
