//! CLI for scatter-gather packet sends over TCP.

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::missing_docs_in_private_items
)]

mod listen;
mod send;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;
use volley::{PlanPacket, SendDescriptor, SendPlan};

#[derive(Parser)]
#[command(name = "volley", version, about = "Scatter-gather packet sends over TCP")]
struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to a peer and send buffers, file regions and plans as one write.
    Send(send::SendArgs),

    /// Accept connections and report how many bytes each one sent.
    Listen(listen::ListenArgs),

    /// Validate a send plan and print it.
    Plan {
        /// Path of the JSON plan.
        path: std::path::PathBuf,

        /// Output format.
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },

    /// Generate shell completion scripts.
    #[command(hide = true)]
    Completion {
        /// Target shell.
        shell: Shell,
    },
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable table.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(e) = cli.dispatch().await {
        eprintln!("volley: {e:#}");
        std::process::exit(1);
    }
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    async fn dispatch(self) -> Result<()> {
        match self.command {
            Command::Send(args) => send::run(args).await,
            Command::Listen(args) => listen::run(args).await,
            Command::Plan { path, format } => plan(&path, format),
            Command::Completion { shell } => {
                clap_complete::generate(shell, &mut Self::command(), "volley", &mut std::io::stdout());
                Ok(())
            }
        }
    }
}

fn plan(path: &std::path::Path, format: OutputFormat) -> Result<()> {
    let plan = SendPlan::load(path)
        .with_context(|| format!("failed to load plan {}", path.display()))?;

    if matches!(format, OutputFormat::Json) {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{:<4} {:<6} {:<40} {:>10}", "#", "KIND", "SOURCE", "SIZE");
    for (i, packet) in plan.packets.iter().enumerate() {
        let (kind, source) = match packet {
            PlanPacket::Text { text } => ("text", text.escape_debug().to_string()),
            PlanPacket::Bytes { .. } => ("bytes", String::new()),
            PlanPacket::File { file, offset, .. } => {
                ("file", format!("{}@{offset}", file.display()))
            }
            _ => ("?", String::new()),
        };
        let size = packet_size(packet);
        println!("{i:<4} {kind:<6} {:<40} {:>10}", truncate(&source, 40), human_size(size));
    }
    println!("flags: {:?}, chunk size: {}", plan.flags(), plan.chunk_size);
    Ok(())
}

/// Bytes `packet` puts on the wire; skipped packets count as 0.
fn packet_size(packet: &PlanPacket) -> u64 {
    if SendDescriptor::from(packet.clone()).is_elided() {
        return 0;
    }
    match packet {
        PlanPacket::Text { text } => text.len() as u64,
        PlanPacket::Bytes { bytes } => bytes.len() as u64,
        PlanPacket::File {
            file,
            offset,
            length,
        } => {
            if *length == 0 {
                std::fs::metadata(file).map_or(0, |m| m.len().saturating_sub(*offset))
            } else {
                *length
            }
        }
        _ => 0,
    }
}

/// Shortens `s` to at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Formats bytes into a human-readable size string.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn human_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}
