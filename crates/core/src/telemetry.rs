use tracing_subscriber::{EnvFilter, fmt};

/// Default filter when `RUST_LOG` is unset: our crates at `info`, noisy
/// dependencies (sqlx statement logging) at `warn`.
const DEFAULT_DIRECTIVES: &str = "info,sqlx=warn";

/// Initialise the global tracing subscriber.
///
/// Respects `RUST_LOG` env var; otherwise uses [`DEFAULT_DIRECTIVES`].
pub fn init() {
    init_with(DEFAULT_DIRECTIVES);
}

/// Initialise with explicit fallback directives. Calling this twice is a no-op
/// for the second call.
pub fn init_with(default_directives: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    if fmt().with_env_filter(filter).with_target(true).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
