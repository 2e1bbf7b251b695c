use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Filter used when `RUST_LOG` is unset.
fn default_directive(verbose: bool, level: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    match level.map(str::trim) {
        Some(level) if !level.is_empty() => level.to_string(),
        _ => "warn".to_string(),
    }
}

/// Install the stderr subscriber. A second call is a no-op.
pub fn init_logging(verbose: bool, level: Option<&str>) {
    let directive = default_directive(verbose, level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).without_time())
        .with(filter)
        .try_init();
}
