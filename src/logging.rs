//! Structured logging setup for the embedding web layer.
//!
//! Reads `LOG_FORMAT` ("json" for JSON output, anything else for text) and
//! `RUST_LOG` for level filtering (defaults to info).
//!
//! ```rust,ignore
//! study_queue::logging::init_logging();
//! tracing::info!(participant_id = %id, "Task assigned");
//! ```

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize the global tracing subscriber.
pub fn init_logging() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .flatten_event(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_ansi(true))
            .init();
    }
}
