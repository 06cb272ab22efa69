//! Code for the `fide-server` executable.
use clap::Parser;
use eyre::{Result, bail};
use std::{io::stdout, path::PathBuf};
use tokio::runtime::Builder;
use tracing::subscriber::set_global_default;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// FIDE player list in XML (as published by FIDE) or JSON format
    players: PathBuf,
    /// Port on which server will listen
    #[clap(long)]
    port: Option<u16>,
    /// IP address to bind the server to
    #[clap(long)]
    bind_address: Option<String>,
}

/// Starts the logging and error handling. Can be used by unittests to get more insights.
pub fn start_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let subscriber = Registry::default().with(
        fmt::layer()
            .without_time()
            .with_writer(stdout)
            .with_filter(filter),
    );

    set_global_default(subscriber)?;

    Ok(())
}

fn main() -> Result<()> {
    start_logging()?;

    let runtime = Builder::new_current_thread().enable_all().build()?;

    let args = Args::parse();

    if !args.players.is_file() {
        bail!("Player list does not exist: {}", args.players.display());
    }

    let bind_addr = args
        .bind_address
        .unwrap_or_else(|| std::net::Ipv4Addr::LOCALHOST.to_string());
    let port = args.port.unwrap_or(8912);

    runtime.block_on(fide_server::server_main(port, bind_addr, &args.players, None))
}
