//! # Observability Setup
//!
//! Structured logging via `tracing`. Filtering follows `RUST_LOG` with an
//! `info` default; `LOG_FORMAT=json` switches to JSON lines for log
//! shippers.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. Call once at startup; later
/// calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}
