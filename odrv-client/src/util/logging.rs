use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Resolve the log filter: `RUST_LOG` wins, then `--verbose`, then the
/// level from the config file.
pub fn build_filter(configured_level: &str, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = if verbose { "debug" } else { configured_level };
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

pub fn init_tracing(configured_level: &str, verbose: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr) // keep stdout for the shell itself
        .with_target(verbose)
        .without_time();

    // try_init: tests and embedders may already have installed a subscriber
    let _ = tracing_subscriber::registry()
        .with(build_filter(configured_level, verbose))
        .with(fmt_layer)
        .try_init();
}
