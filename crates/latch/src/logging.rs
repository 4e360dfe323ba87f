//! Logging initialization

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber based on verbosity flags.
///
/// `-v`/`-vv`/`-vvv` raise the default level; `--quiet` pins it to `error`
/// regardless of `-v`; `RUST_LOG` always wins when set.
pub fn init_logging(verbosity: u8, quiet: bool) -> Result<(), tracing_subscriber::filter::ParseError> {
    let default_level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
