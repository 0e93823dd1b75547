use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Diagnostics go to stderr so stdout stays clean for command output.
/// `RUST_LOG` overrides the default filter; `verbose` lowers it to debug.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "jobetl=debug,warn" } else { "jobetl=info,warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();
}
