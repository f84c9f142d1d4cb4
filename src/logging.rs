//! Log setup for the binary.
//!
//! ```bash
//! SCRIPTMARK_LOG=debug scriptmark definition page.php 12 4
//! SCRIPTMARK_LOG="scriptmark::index=trace" scriptmark --serve
//! ```
//!
//! Everything goes to stderr: stdout carries CLI results and JSON-RPC.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Filter variable, same syntax as `RUST_LOG`.
pub const LOG_ENV: &str = "SCRIPTMARK_LOG";

fn build_filter(verbose: bool) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(val) => EnvFilter::builder().parse_lossy(val),
        Err(_) if verbose => EnvFilter::new("scriptmark=debug"),
        Err(_) => EnvFilter::new("warn"),
    }
}

/// Install the global subscriber. `verbose` raises the default level to
/// debug; an explicit `SCRIPTMARK_LOG` always wins. Calling twice is a no-op.
pub fn init(verbose: bool) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    let _ = tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(layer)
        .try_init();
}
