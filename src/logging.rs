//! tracing subscriber setup for the command-line front end.
//!
//! Logs go to stderr so that stdout only carries rendered output. `RUST_LOG`
//! takes precedence over the verbosity flag when it is set.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

pub fn init(verbosity: u8) -> Result<()> {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to initialise logging: {err}"))
}
