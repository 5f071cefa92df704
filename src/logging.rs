use crate::config::LoggingConfig;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let layer = fmt::layer().json().with_target(true).with_ansi(false);
        registry.with(layer).try_init()?;
    } else {
        let layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(layer).try_init()?;
    }

    Ok(())
}
