//! Command line tools for the RC language.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with a default filter.
///
/// Use the `RUST_LOG` environment variable to override the default, which
/// is `warn` globally and `info` for the compiler crates.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,rc_lang=info,rc_tools=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}
