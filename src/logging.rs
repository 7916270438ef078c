// Logging setup: tracing subscriber writing to stderr
use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map `-v` count to a default filter directive.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "rtreport=info",
        1 => "rtreport=debug",
        _ => "rtreport=trace",
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the verbosity flag.
pub fn init(verbosity: u8) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level_for_verbosity(verbosity)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::debug!("logging initialised");
    Ok(())
}
