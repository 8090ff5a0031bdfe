//! EmberKV - A Minimal In-Memory Key-Value Server
//!
//! This is the main entry point for the EmberKV server.
//! It sets up logging, the shared store and the TCP listener, and spawns
//! one task per incoming connection.

use anyhow::{bail, Context};
use emberkv::commands::CommandDispatcher;
use emberkv::connection::{handle_connection, ConnectionConfig, ConnectionStats};
use emberkv::storage::StorageEngine;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Per-connection read buffer and idle timeout
    connection: ConnectionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: emberkv::DEFAULT_HOST.to_string(),
            port: emberkv::DEFAULT_PORT,
            connection: ConnectionConfig::default(),
        }
    }
}

/// What the command line asked for.
#[derive(Debug, PartialEq)]
enum CliAction {
    Run(Config),
    Help,
    Version,
}

impl Config {
    /// Parse configuration from command-line arguments (program name excluded)
    fn from_args<I>(args: I) -> anyhow::Result<CliAction>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Config::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .with_context(|| format!("{} requires a value", flag))
            };

            match arg.as_str() {
                "--host" | "-h" => config.host = value("--host")?,
                "--port" | "-p" => {
                    config.port = value("--port")?
                        .parse()
                        .context("invalid port number")?;
                }
                "--read-buffer" => {
                    let size: usize = value("--read-buffer")?
                        .parse()
                        .context("invalid read buffer size")?;
                    if size == 0 {
                        bail!("read buffer size must be greater than zero");
                    }
                    config.connection.read_buffer_size = size;
                }
                "--timeout" => {
                    let secs: u64 = value("--timeout")?
                        .parse()
                        .context("invalid timeout")?;
                    config.connection.idle_timeout = Some(Duration::from_secs(secs));
                }
                "--help" => return Ok(CliAction::Help),
                "--version" | "-v" => return Ok(CliAction::Version),
                other => bail!("unknown argument: {}", other),
            }
        }

        Ok(CliAction::Run(config))
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
EmberKV - A Minimal In-Memory Key-Value Server

USAGE:
    emberkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>           Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>           Port to listen on (default: 6379)
        --read-buffer <BYTES>   Maximum bytes read per request (default: 2048)
        --timeout <SECS>        Close idle connections after SECS (default: never)
    -v, --version               Print version information
        --help                  Print this help message

COMMANDS:
    PING | ECHO message | SET key value [PX ms] | GET key

LOGGING:
    Set RUST_LOG (e.g. RUST_LOG=emberkv=debug) to change verbosity.
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(config)) => config,
        Ok(CliAction::Help) => {
            print_help();
            return Ok(());
        }
        Ok(CliAction::Version) => {
            println!("EmberKV version {}", emberkv::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            print_help();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Created once; lives until the process exits
    let storage = Arc::new(StorageEngine::new());
    info!(version = emberkv::VERSION, "Storage engine initialized");

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!(
        address = %config.bind_address(),
        read_buffer = config.connection.read_buffer_size,
        idle_timeout = ?config.connection.idle_timeout,
        "Listening"
    );

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&storage), Arc::clone(&stats), config.connection) => {}
        _ = shutdown => {}
    }

    let store = storage.stats();
    info!(
        keys = store.keys,
        gets = store.gets,
        sets = store.sets,
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        commands = stats.commands_processed.load(Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    storage: Arc<StorageEngine>,
    stats: Arc<ConnectionStats>,
    connection: ConnectionConfig,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let dispatcher = CommandDispatcher::new(Arc::clone(&storage));
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, dispatcher, connection, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
