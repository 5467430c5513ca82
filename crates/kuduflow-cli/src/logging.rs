use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber; stdout is reserved for command output.
///
/// `RUST_LOG` takes precedence over `level`. An unparsable level falls back
/// to `info`.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
