//! Tracing subscriber setup for the binary.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "info";

/// Install a stderr subscriber. Call once near the start of `main`.
///
/// `verbose` lowers the default level to `debug`; `RUST_LOG` still wins.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { DEFAULT_DIRECTIVE };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}
