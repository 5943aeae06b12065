//! monodb-cli — a terminal REPL for monodb's table-mutation language.
//!
//! Connects to a running `monodb-server`, reads statements from the
//! terminal, and prints back whatever the server sends — the parsed AST on
//! success, or `ERROR: ...` on a parse failure. It does not talk to the WAL
//! directly; everything goes through the server's line protocol.

mod repl;

use std::net::SocketAddr;

use clap::Parser;
use monodb_client::{Client, ConnectionConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "monodb-cli")]
#[command(about = "Terminal REPL for monodb")]
#[command(version)]
struct Cli {
    /// Address of the monodb-server instance to connect to.
    #[arg(short, long, default_value = "127.0.0.1:7401", env = "MONODB_SERVER")]
    server: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let client = Client::new(ConnectionConfig::new(cli.server));
    repl::run(client, cli.server).await
}
