//! Subscribes to the configured command/response topics and prints every
//! event and connection change until Ctrl+C.
//!
//! ```bash
//! NTFY_COMMANDS_TOPIC=boat-commands NTFY_RESPONSES_TOPIC=boat-responses \
//!     cargo run --example listen
//! ```

use std::sync::Arc;

use ntfy_subscriber::{ChannelSink, ConnectionEvent, Listener, ListenerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = ListenerConfig::discover(None)?;
    let (sink, mut rx) = ChannelSink::new(64);
    let listener = Listener::new(config, Arc::new(sink));

    // Monitor connection events in background
    let mut events = listener.event_receiver();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ConnectionEvent::Connecting { attempt } => {
                    println!("[event] Connecting (after {attempt} failures)");
                }
                ConnectionEvent::Connected { server_id } => {
                    println!("[event] Connected to {server_id}");
                }
                ConnectionEvent::Disconnected { reason } => {
                    println!("[event] Disconnected: {reason}");
                }
                ConnectionEvent::LivenessTimeout { idle } => {
                    println!("[event] Silent for {}s, recycling", idle.as_secs());
                }
                ConnectionEvent::Reconnecting { attempt, delay } => {
                    println!("[event] Reconnecting (attempt {attempt}) in {delay:?}");
                }
                ConnectionEvent::ReconnectFailed {
                    attempts,
                    last_error,
                } => println!("[event] Gave up after {attempts} attempts: {last_error}"),
                ConnectionEvent::Stopped => println!("[event] Stopped"),
            }
        }
    });

    let mut handle = listener.try_start()?;
    println!("Listening. Press Ctrl+C to exit.\n");

    loop {
        tokio::select! {
            received = rx.events.recv() => {
                let Some((kind, event)) = received else { break };
                println!("[{}] {} ({}): {}", kind.path(), event.id, event.topic, event.message);
            }
            Some(error) = rx.errors.recv() => {
                println!("[error] {error}");
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    handle.stop().await;
    Ok(())
}
