//! Concord daemon — entry point for running one cluster member.

use std::path::PathBuf;

use clap::Parser;

use concord_node::{init_logging, LogFormat, Node, ShutdownController};
use concord_types::{HostsTable, ProcessId, RunConfig, Tuning};

#[derive(Parser)]
#[command(name = "concord-daemon", about = "Concord agreement-protocol node")]
struct Cli {
    /// This process's id (1-indexed, must appear in the hosts file).
    #[arg(long, env = "CONCORD_ID")]
    id: ProcessId,

    /// Hosts file: one `<id> <ip> <port>` triple per line.
    #[arg(long, env = "CONCORD_HOSTS")]
    hosts: PathBuf,

    /// Output file for protocol events.
    #[arg(long, env = "CONCORD_OUTPUT")]
    output: PathBuf,

    /// Protocol config file (`<m>` for broadcast, `<p> <vs> <ds>` plus
    /// proposal lines for lattice agreement).
    #[arg(long, env = "CONCORD_CONFIG")]
    config: PathBuf,

    /// Optional TOML file overriding the tuning knobs.
    #[arg(long, env = "CONCORD_TUNING")]
    tuning: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "info", env = "CONCORD_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "CONCORD_LOG_FORMAT")]
    log_format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(LogFormat::parse(&cli.log_format), &cli.log_level);

    let hosts = HostsTable::from_file(&cli.hosts)?;
    let config = RunConfig::from_file(&cli.config)?;
    let tuning = match &cli.tuning {
        Some(path) => Tuning::from_toml_file(path)?,
        None => Tuning::default(),
    };

    let mode = match config {
        RunConfig::Broadcast { .. } => "broadcast",
        RunConfig::Lattice { .. } => "lattice",
    };
    tracing::info!(id = cli.id, cluster = hosts.len(), mode, "starting node");

    let node = Node::new(cli.id, hosts, config, tuning, &cli.output)?;

    let signals: ShutdownController = node.shutdown_handle();
    tokio::spawn(async move {
        signals.wait_for_signal().await;
    });

    node.run().await?;
    Ok(())
}
