//! Demo server for the request logger.
//!
//! ```text
//! request-logger-demo --bind 127.0.0.1:3000 --config logger.toml
//! ```
//!
//! Try `curl -H 'authorization: Bearer xyz' localhost:3000/items` and watch
//! the `[INI]` / `[END]` lines.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use request_logger::config::{load_options, LoggerConfig, LoggerOptions};
use request_logger::http::HttpServer;
use request_logger::lifecycle::{signals::shutdown_on_signal, Shutdown};
use request_logger::observability::init_logging;
use request_logger::RequestLogger;

#[derive(Parser)]
#[command(name = "request-logger-demo")]
#[command(about = "Sample Axum server instrumented by the request logger", long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(short, long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// TOML file with logger options.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let options = match &cli.config {
        Some(path) => load_options(path)?,
        None => LoggerOptions::default(),
    };
    let config = LoggerConfig::resolve(options);

    init_logging(&config)?;

    tracing::info!(
        bind_address = %cli.bind,
        level = %config.level,
        pretty_print = config.pretty_print,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&cli.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(
        RequestLogger::from_config(config),
        Duration::from_secs(cli.timeout_secs),
    );
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
