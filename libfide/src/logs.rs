use eyre::Result;

/// Starts the logging and error handling. Can be used by unittests to get more insights.
#[cfg(not(target_arch = "wasm32"))]
pub fn start_logging() -> Result<()> {
    use std::io::stderr;

    use tracing_subscriber::{Layer, Registry, fmt, layer::SubscriberExt};

    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let subscriber = Registry::default().with(
        fmt::layer()
            .without_time()
            .with_writer(stderr)
            .with_filter(filter),
    );

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// Logging on wasm is set up by the embedding page.
#[cfg(target_arch = "wasm32")]
pub fn start_logging() -> Result<()> {
    Ok(())
}
