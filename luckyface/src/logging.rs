use tracing_subscriber::{EnvFilter, fmt};

/// Initialize logging to stderr.
///
/// `RUST_LOG` wins when set; otherwise `debug` selects the verbosity.
///
/// ```
/// luckyface::init_logging(luckyface::PipelineConfig::default().debug);
/// ```
pub fn init_logging(debug: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(debug)));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn default_level(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}
