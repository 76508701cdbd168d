//! # ntfy-subscriber
//!
//! Command-line listener for an ntfy command/response topic pair.
//! Prints each event as a JSON line on stdout; logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use ntfy_subscriber::endpoint::redact_auth;
use ntfy_subscriber::{ChannelSink, Listener, ListenerConfig, NtfyResult};

mod output;

/// Events buffered between the listener and the stdout writer.
const OUTPUT_BUFFER: usize = 256;

/// Subscribe to ntfy topics over WebSocket.
#[derive(Parser)]
#[command(name = "ntfy-subscriber", version, about)]
struct Cli {
    /// Path to ntfy.toml config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Id of the server to use, overriding `active_server_id`
    #[arg(short, long)]
    server: Option<String>,

    /// Enable verbose logging (set RUST_LOG for fine-grained control)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Listen until Ctrl+C, printing events as JSON lines (default)
    Listen,

    /// Print the WebSocket URL that would be used
    Url {
        /// Include the auth query parameter
        #[arg(long)]
        show_auth: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "ntfy_subscriber=debug,ntfy_subscriber_cli=debug"
    } else {
        "ntfy_subscriber=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = ListenerConfig::discover(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.active_server_id = Some(server);
    }

    match cli.command.unwrap_or(Command::Listen) {
        Command::Listen => listen(config).await?,
        Command::Url { show_auth } => {
            let url = config.ws_url()?;
            if show_auth {
                println!("{url}");
            } else {
                println!("{}", redact_auth(&url));
            }
        }
    }

    Ok(())
}

async fn listen(config: ListenerConfig) -> NtfyResult<()> {
    let (sink, rx) = ChannelSink::new(OUTPUT_BUFFER);
    let mut handle = Listener::new(config, Arc::new(sink)).try_start()?;
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        output::write_events(rx, &mut stdout).await
    });

    tokio::select! {
        () = handle.finished() => {
            tracing::warn!("Listener gave up reconnecting");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "Failed to wait for Ctrl+C");
            }
            tracing::info!("Shutting down");
        }
    }

    handle.stop().await;
    // The sink is dropped with the listener task, which ends the writer.
    match writer.await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "Output task failed");
            Ok(())
        }
    }
}
