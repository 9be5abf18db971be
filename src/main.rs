use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};

use wkbeat::{ActivityEvent, ConfigSnapshot, Dispatcher, HttpTransport, Settings};

fn env(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("failed to get \"{}\" environment variable", key))
}

/// Reads one JSON activity event per line from stdin and reports each one.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let use_ansi = env("NO_COLOR").is_err();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(use_ansi)
        .with_writer(std::io::stderr)
        .init();

    let config = ConfigSnapshot::from_env().context("failed to load wakatime config")?;
    let settings = Settings::from_env().context("failed to load engine settings")?;

    let transport = HttpTransport::new(&settings)?;
    tracing::debug!(endpoint = %transport.endpoint(), "sending heartbeats");

    let dispatcher = Dispatcher::new(config, settings, transport);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<ActivityEvent>(line) {
            Ok(event) => {
                let decision = dispatcher.dispatch(&event);
                tracing::trace!(?decision, path = %event.source_path, "event handled");
            }
            Err(e) => tracing::warn!("ignoring malformed event {:?}: {}", line, e),
        }
    }

    dispatcher.shutdown().await;

    Ok(())
}
