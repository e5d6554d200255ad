//! Tracing subscriber installation.
//!
//! Filtering comes from `RUST_LOG` (default `info`), e.g.
//! `RUST_LOG=stockroom_infra=debug,sqlx=warn`.

use tracing_subscriber::EnvFilter;

use crate::LogFormat;

/// Install the global subscriber. Later calls are no-ops.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    // `try_init` fails only when a subscriber is already set.
    let _ = match format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}
