//! `volley send`: one scatter-gather send to a TCP peer.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use volley::{SendDescriptor, SendFlags, SendPacketsExt, SendPlan, SendRequest, Socket, StreamHandle};

use crate::{OutputFormat, human_size};

/// Arguments for `volley send`.
///
/// Usage: `volley send [OPTIONS] ADDR`
#[derive(clap::Args)]
pub struct SendArgs {
    /// Peer address (e.g. 127.0.0.1:9000).
    pub addr: String,

    /// Start from a JSON send plan.
    #[arg(long)]
    pub plan: Option<PathBuf>,

    /// Packet to append, in order: `text:STR`, `file:PATH[@OFFSET[+LEN]]`
    /// or `stream:PATH[@OFFSET[+LEN]]`.
    #[arg(short = 'p', long = "part")]
    pub parts: Vec<Part>,

    /// Disconnect after sending.
    #[arg(short = 'd', long)]
    pub disconnect: bool,

    /// Keep the socket reusable after disconnecting.
    #[arg(long, requires = "disconnect")]
    pub reuse: bool,

    /// Chunk size hint in bytes (0 = default).
    #[arg(long, default_value_t = 0)]
    pub chunk_size: usize,

    /// Output format.
    #[arg(long, default_value = "table")]
    pub format: OutputFormat,
}

/// A packet given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Literal text.
    Text(String),
    /// A file region.
    File {
        /// File path.
        path: PathBuf,
        /// Start offset.
        offset: u64,
        /// Byte count (0 with offset 0 = whole file).
        length: u64,
    },
    /// A file opened as a caller-owned stream.
    Stream {
        /// File path.
        path: PathBuf,
        /// Start offset.
        offset: u64,
        /// Byte count (0 with offset 0 = rest of the stream).
        length: u64,
    },
}

impl FromStr for Part {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((kind, value)) = s.split_once(':') else {
            bail!("expected KIND:VALUE, got '{s}'");
        };
        match kind {
            "text" => Ok(Self::Text(value.to_owned())),
            "file" => {
                let (path, offset, length) = parse_region(value)?;
                Ok(Self::File {
                    path,
                    offset,
                    length,
                })
            }
            "stream" => {
                let (path, offset, length) = parse_region(value)?;
                Ok(Self::Stream {
                    path,
                    offset,
                    length,
                })
            }
            other => bail!("unknown part kind '{other}' (expected text, file or stream)"),
        }
    }
}

/// Parses `PATH[@OFFSET[+LEN]]`.
fn parse_region(value: &str) -> Result<(PathBuf, u64, u64)> {
    let Some((path, range)) = value.rsplit_once('@') else {
        return Ok((PathBuf::from(value), 0, 0));
    };
    let (offset, length) = match range.split_once('+') {
        Some((o, l)) => (o, l),
        None => (range, "0"),
    };
    let offset = offset
        .parse()
        .with_context(|| format!("invalid offset '{offset}'"))?;
    let length = length
        .parse()
        .with_context(|| format!("invalid length '{length}'"))?;
    Ok((PathBuf::from(path), offset, length))
}

impl Part {
    async fn into_descriptor(self) -> Result<SendDescriptor> {
        Ok(match self {
            Self::Text(text) => SendDescriptor::memory(text.into_bytes()),
            Self::File {
                path,
                offset,
                length,
            } => SendDescriptor::file_range(path, offset, length),
            Self::Stream {
                path,
                offset,
                length,
            } => {
                let file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                SendDescriptor::stream_range(StreamHandle::new(file), offset, length)
            }
        })
    }
}

pub async fn run(args: SendArgs) -> Result<()> {
    let request = build_request(&args).await?;
    let mut socket = Socket::connect(args.addr.as_str())
        .await
        .with_context(|| format!("failed to connect to {}", args.addr))?;
    tracing::info!(addr = %args.addr, "connected");

    let result = socket.send_packets(&request).await?;

    if matches!(args.format, OutputFormat::Json) {
        let obj = serde_json::json!({
            "status": result.status.to_string(),
            "bytes": result.bytes_transferred,
            "synchronous": result.completed_synchronously,
        });
        println!("{}", serde_json::to_string_pretty(&obj)?);
    } else {
        println!(
            "{}: {} ({} bytes)",
            result.status,
            human_size(result.bytes_transferred),
            result.bytes_transferred
        );
    }
    if !result.is_success() {
        bail!("send failed: {}", result.status);
    }
    Ok(())
}

async fn build_request(args: &SendArgs) -> Result<SendRequest> {
    let mut builder = SendRequest::builder();
    let mut flags = SendFlags::NONE;
    let mut chunk_size = args.chunk_size;

    if let Some(path) = &args.plan {
        let plan = SendPlan::load(path)
            .with_context(|| format!("failed to load plan {}", path.display()))?;
        flags |= plan.flags();
        if chunk_size == 0 {
            chunk_size = plan.chunk_size;
        }
        for packet in plan.packets {
            builder = builder.push(packet.into());
        }
    }
    for part in &args.parts {
        builder = builder.push(part.clone().into_descriptor().await?);
    }
    if args.disconnect {
        flags |= SendFlags::DISCONNECT;
    }
    if args.reuse {
        flags |= SendFlags::REUSE_SOCKET;
    }
    Ok(builder.flags(flags).chunk_size(chunk_size).build())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_parts() {
        assert_eq!(
            "text:a:b".parse::<Part>().unwrap(),
            Part::Text("a:b".into())
        );
        assert_eq!(
            "file:/tmp/x.bin".parse::<Part>().unwrap(),
            Part::File {
                path: "/tmp/x.bin".into(),
                offset: 0,
                length: 0
            }
        );
        assert_eq!(
            "stream:/tmp/x.bin@10+20".parse::<Part>().unwrap(),
            Part::Stream {
                path: "/tmp/x.bin".into(),
                offset: 10,
                length: 20
            }
        );
        assert_eq!(
            "file:/tmp/x.bin@7".parse::<Part>().unwrap(),
            Part::File {
                path: "/tmp/x.bin".into(),
                offset: 7,
                length: 0
            }
        );
    }

    #[test]
    fn rejects_bad_parts() {
        assert!("nokind".parse::<Part>().is_err());
        assert!("blob:x".parse::<Part>().is_err());
        assert!("file:/x@ten".parse::<Part>().is_err());
    }
}
