//! Logging initialization.
//!
//! Diagnostics go to stderr so that report output on stdout stays clean.
//! The level defaults to `warn` and can be raised with `RUST_LOG`, for
//! example `RUST_LOG=pendtag=debug` to see every skipped instrument.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber may already be installed when embedded in another binary.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
