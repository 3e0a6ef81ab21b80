//! Log output for the driver.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a `fmt` subscriber. `RUST_LOG` takes precedence over
/// `default_level`.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_names(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
