//! Example: dump an Icecast/Shoutcast stream
//!
//! Audio goes to stdout, metadata (one JSON object per block) to stderr.
//!
//! Run with: cargo run -p pmoicy --example icy_dump -- --metadata http://radio.example.com/stream > out.mp3
//! Metadata only: cargo run -p pmoicy --example icy_dump -- --metadata --noaudio <url>
//!
//! Client settings can also come from `PMOICY__*` environment variables.

use std::env;

use pmoicy::{IcyClient, IcyConfig};
use tokio::io::{self, AsyncWrite, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut config = IcyConfig::from_env()?;
    let mut noaudio = false;
    let mut url = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--metadata" => config.metadata = true,
            "--noaudio" => noaudio = true,
            _ => url = Some(arg),
        }
    }
    let url = url.ok_or_else(|| anyhow::anyhow!("missing url argument"))?;

    let client = IcyClient::from_config(&config)?;
    let mut session = client.connect(&url).await?;

    eprintln!(
        "Connected to {} ({}), metaint: {:?}",
        session.icy().name.as_deref().unwrap_or("unnamed station"),
        session.status(),
        session.metaint()
    );

    let printer = session.take_metadata().map(|mut metadata| {
        tokio::spawn(async move {
            let mut out: Box<dyn AsyncWrite + Unpin + Send> = if noaudio {
                Box::new(io::stdout())
            } else {
                Box::new(io::stderr())
            };
            while let Some(meta) = metadata.recv().await {
                let line = format!("metadata: {}\n", serde_json::to_string(&meta)?);
                out.write_all(line.as_bytes()).await?;
                out.flush().await?;
            }
            anyhow::Ok(())
        })
    });

    let copied = if noaudio {
        io::copy(&mut session, &mut io::sink()).await
    } else {
        io::copy(&mut session, &mut io::stdout()).await
    };
    // closing the session ends the metadata receiver
    session.close();

    if let Some(printer) = printer {
        printer.await??;
    }

    let bytes = copied.map_err(pmoicy::Error::from_read_error)?;
    eprintln!("Stream ended after {} audio bytes", bytes);
    Ok(())
}
