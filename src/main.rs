//! Entry point for `rudp-transfer`.
//!
//! Parses CLI arguments and dispatches into either **send** or **recv** mode.
//! All actual protocol work is delegated to library modules; `main.rs` owns
//! only process setup (logging, signal handling, argument parsing, file I/O).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use rudp_transfer::receiver::{Receiver, ReceiverConfig};
use rudp_transfer::sender::{Sender, SenderConfig};
use rudp_transfer::window::AckMode;

/// Reliable sliding-window file transfer over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Print per-packet debug messages.
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Transfer a file (or stdin) to a receiver.
    Send {
        /// Receiver address or hostname.
        #[arg(short, long, default_value = "localhost")]
        address: String,

        /// Destination port.
        #[arg(short, long, default_value_t = 33122)]
        port: u16,

        /// File to transfer; reads from stdin when omitted.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Retransmission timeout in milliseconds.
        #[arg(short, long, default_value_t = 500)]
        timeout_ms: u64,

        /// Enable selective acknowledgement mode.
        #[arg(short = 'k', long)]
        sack: bool,
    },
    /// Receive one transfer and write it to a file (or stdout).
    Recv {
        /// Local port to listen on.
        #[arg(short, long, default_value_t = 33122)]
        port: u16,

        /// Output file; writes to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Enable selective acknowledgement mode.
        #[arg(short = 'k', long)]
        sack: bool,
    },
}

fn ack_mode(sack: bool) -> AckMode {
    if sack {
        AckMode::Selective
    } else {
        AckMode::Cumulative
    }
}

async fn run_send(
    address: String,
    port: u16,
    file: Option<PathBuf>,
    timeout_ms: u64,
    sack: bool,
) -> anyhow::Result<()> {
    let source = match &file {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("reading stdin")?;
            buf
        }
    };

    let peer: SocketAddr = tokio::net::lookup_host((address.as_str(), port))
        .await
        .with_context(|| format!("resolving {address}:{port}"))?
        .next()
        .with_context(|| format!("no address for {address}:{port}"))?;

    let mut config = SenderConfig::new(peer);
    config.timeout = Duration::from_millis(timeout_ms);
    config.mode = ack_mode(sack);

    let sender = Sender::bind(config).await?;
    let stats = sender.run(&source).await?;
    log::info!(
        "sent {} fragments ({} retransmits)",
        stats.fragments,
        stats.retransmits
    );
    Ok(())
}

async fn run_recv(port: u16, output: Option<PathBuf>, sack: bool) -> anyhow::Result<()> {
    let bind = SocketAddr::new(std::net::Ipv4Addr::UNSPECIFIED.into(), port);
    let mut config = ReceiverConfig::new(bind);
    config.mode = ack_mode(sack);

    let receiver = Receiver::bind(config).await?;
    let data = receiver.run().await?;

    match &output {
        Some(path) => tokio::fs::write(path, &data)
            .await
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&data).await.context("writing stdout")?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if cli.debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    let work = async {
        match cli.mode {
            Mode::Send {
                address,
                port,
                file,
                timeout_ms,
                sack,
            } => run_send(address, port, file, timeout_ms, sack).await,
            Mode::Recv { port, output, sack } => run_recv(port, output, sack).await,
        }
    };

    // Ctrl-C aborts between loop iterations; no partial-transfer recovery.
    tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            log::info!("interrupted; shutting down");
            Ok(())
        }
    }
}
