use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when neither `RUST_LOG` nor `--log`/`[log] filter` is set.
pub const DEFAULT_FILTER: &str = "warn";

/// Initialize tracing on stderr so stdout stays machine-readable.
///
/// Precedence: `RUST_LOG`, then `configured` (flag or config file), then
/// `warn`. An unparsable directive falls back to the default.
pub fn init(configured: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .without_time()
        .compact();

    // try_init: a second call (tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();

    tracing::debug!("tracing initialized");
}
