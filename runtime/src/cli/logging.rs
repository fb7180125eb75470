//! Tracing subscriber setup for the binary.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Default filter directive, raised to `debug` by `-v`.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "sitedigest=debug"
    } else {
        "sitedigest=info"
    }
}

/// Install the global subscriber. Logs go to stderr so stdout stays JSON.
///
/// `RUST_LOG` directives are honoured on top of the default.
pub fn init(verbose: bool, json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(
        default_directive(verbose)
            .parse()
            .context("invalid log directive")?,
    );

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}
