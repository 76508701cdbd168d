use tokio::io::{AsyncWrite, AsyncWriteExt};

use ntfy_subscriber::sink::SinkReceivers;
use ntfy_subscriber::{ClassifiedEvent, EventKind, NtfyResult};

/// Write events as JSON lines until every sender is gone.
///
/// Runs off the listener's event loop; errors reported by the listener go
/// to stderr.
pub async fn write_events<W>(mut rx: SinkReceivers, out: &mut W) -> NtfyResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut errors_open = true;
    loop {
        tokio::select! {
            biased;
            error = rx.errors.recv(), if errors_open => match error {
                Some(error) => eprintln!("error: {error}"),
                None => errors_open = false,
            },
            received = rx.events.recv() => {
                let Some((kind, event)) = received else {
                    break;
                };
                let mut line = format_line(kind, &event)?;
                line.push('\n');
                out.write_all(line.as_bytes()).await?;
                out.flush().await?;
            }
        }
    }
    Ok(())
}

pub fn format_line(kind: EventKind, event: &ClassifiedEvent) -> NtfyResult<String> {
    let value = serde_json::json!({
        "path": kind.path(),
        "event": event,
    });
    Ok(serde_json::to_string(&value)?)
}
