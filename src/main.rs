//! Signal Relay — WebRTC signaling over WebSocket
//!
//! Clients connect to `/ws`, receive `{"userId": "<id>"}`, and exchange
//! `sdp` / `candidate` envelopes addressed by id. The relay stamps the
//! sender's id into every forwarded envelope and never looks at the payload.
//!
//! Usage:
//!   signal-relay                         # Default port 8080 on 0.0.0.0
//!   signal-relay --port 9000             # Custom port
//!   signal-relay --max-connections 500   # Cap live connections
//!   signal-relay --verbose --log-file    # Debug logging to ./signal-relay.log

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use clap::builder::RangedU64ValueParser;
use signal_router::{MAX_OUTBOUND_BUFFER, RouterConfig, SignalRouter};
use signal_transport::{TransportConfig, TransportServer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "signal-relay", about = "Signal Relay — peer-to-peer signaling over WebSocket")]
struct Cli {
    /// Port to listen on (0 for OS-assigned)
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Hostname to bind to
    #[arg(long, default_value = "0.0.0.0")]
    hostname: String,

    /// Maximum concurrent connections (unlimited if not set)
    #[arg(long)]
    max_connections: Option<usize>,

    /// Outbound queue capacity per connection
    #[arg(
        long,
        default_value = "256",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_OUTBOUND_BUFFER as u64)
    )]
    outbound_buffer: usize,

    /// How long a stalled socket may block a write before it is abandoned
    #[arg(long, default_value = "2000")]
    write_timeout_ms: u64,

    /// How long shutdown waits for connections to close
    #[arg(long, default_value = "5000")]
    shutdown_grace_ms: u64,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file (defaults to ./signal-relay.log if no path given)
    #[arg(long, default_missing_value = "DEFAULT", num_args = 0..=1)]
    log_file: Option<String>,
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    if let Some(ref log_file_arg) = cli.log_file {
        let log_path = if log_file_arg == "DEFAULT" {
            PathBuf::from("signal-relay.log")
        } else {
            PathBuf::from(log_file_arg)
        };

        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("failed to open log file {}", log_path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();

        eprintln!("Logging to {}", log_path.display());
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let router = Arc::new(SignalRouter::new(RouterConfig {
        outbound_buffer: cli.outbound_buffer,
        write_timeout: Duration::from_millis(cli.write_timeout_ms),
    }));

    let transport_config = TransportConfig {
        port: cli.port,
        hostname: cli.hostname.clone(),
        max_connections: cli.max_connections,
        ..TransportConfig::default()
    };

    let mut transport = TransportServer::start(transport_config, router.clone())
        .await
        .context("failed to start transport")?;

    info!(
        "Signal relay ready on ws://{}:{}{}",
        cli.hostname,
        transport.port(),
        transport.path()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutting down...");
    router
        .shutdown(Duration::from_millis(cli.shutdown_grace_ms))
        .await;
    transport.stop().await;
    info!("Signal relay stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_buffer_defaults_to_256() {
        let cli = Cli::try_parse_from(["signal-relay"]).unwrap();
        assert_eq!(cli.outbound_buffer, 256);
        assert_eq!(cli.write_timeout_ms, 2000);
    }

    #[test]
    fn outbound_buffer_accepts_the_maximum() {
        let max = MAX_OUTBOUND_BUFFER.to_string();
        let cli = Cli::try_parse_from(["signal-relay", "--outbound-buffer", &max]).unwrap();
        assert_eq!(cli.outbound_buffer, MAX_OUTBOUND_BUFFER);
    }

    #[test]
    fn outbound_buffer_out_of_range_is_rejected() {
        let too_big = (MAX_OUTBOUND_BUFFER + 1).to_string();
        assert!(Cli::try_parse_from(["signal-relay", "--outbound-buffer", &too_big]).is_err());
        assert!(Cli::try_parse_from(["signal-relay", "--outbound-buffer", "0"]).is_err());
        assert!(
            Cli::try_parse_from(["signal-relay", "--outbound-buffer", "18446744073709551615"])
                .is_err()
        );
    }
}
