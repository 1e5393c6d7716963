//! `volley listen`: a byte-counting sink for testing sends.

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use crate::{OutputFormat, human_size};

/// Arguments for `volley listen`.
#[derive(clap::Args)]
pub struct ListenArgs {
    /// Address to bind (e.g. 127.0.0.1:9000).
    pub addr: String,

    /// Exit after the first connection closes.
    #[arg(long)]
    pub once: bool,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

pub async fn run(args: ListenArgs) -> Result<()> {
    let listener = TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(%peer, "accepted");
        if args.once {
            let n = count(stream).await?;
            report(args.format, &peer.to_string(), n)?;
            return Ok(());
        }
        let format = args.format;
        tokio::spawn(async move {
            match count(stream).await {
                Ok(n) => {
                    if let Err(e) = report(format, &peer.to_string(), n) {
                        tracing::warn!(%peer, error = %e, "report failed");
                    }
                }
                Err(e) => tracing::warn!(%peer, error = %e, "connection error"),
            }
        });
    }
}

/// Reads until EOF and returns the byte count.
async fn count(mut stream: TcpStream) -> std::io::Result<u64> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        total += n as u64;
    }
}

fn report(format: OutputFormat, peer: &str, bytes: u64) -> Result<()> {
    if matches!(format, OutputFormat::Json) {
        let obj = serde_json::json!({ "peer": peer, "bytes": bytes });
        println!("{}", serde_json::to_string(&obj)?);
    } else {
        println!("{peer}: {} ({bytes} bytes)", human_size(bytes));
    }
    Ok(())
}
