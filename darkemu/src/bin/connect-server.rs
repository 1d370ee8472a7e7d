//! Connect server: advertises the game-server roster to clients.
//!
//! Run with: `cargo run --bin connect-server -- --roster ServerList.json`

use anyhow::Context;
use clap::Parser;
use darkemu::runtime::{init_tracing, shutdown_on_ctrl_c};
use darkemu_server::{ConnectDispatcher, ConnectionPolicy, DEFAULT_CONNECT_PORT, ServerBuilder};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_CONNECT_PORT)]
    port: u16,
    /// IPv4 address to bind to
    #[arg(short, long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    bind: Ipv4Addr,
    /// JSON file with the advertised game servers
    #[arg(short, long, default_value = "ServerList.json")]
    roster: PathBuf,
    /// Keep connections open and answer every request
    #[arg(long)]
    keep_alive: bool,
    /// Log filter, overrides RUST_LOG (e.g. "debug")
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("connect server failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let policy = if args.keep_alive {
        ConnectionPolicy::KeepAlive
    } else {
        ConnectionPolicy::CloseAfterResponse
    };
    let dispatcher = ConnectDispatcher::from_roster_file(&args.roster)
        .with_context(|| format!("loading roster {}", args.roster.display()))?
        .with_policy(policy);

    let mut server = ServerBuilder::new()
        .bind(SocketAddr::from((args.bind, args.port)))
        .handler(dispatcher)
        .build()
        .context("starting connect server")?;
    shutdown_on_ctrl_c(server.shutdown_handle()).context("installing signal handler")?;

    tracing::info!(
        port = server.port(),
        servers = server.handler().roster().visible_count(),
        ?policy,
        "connect server ready"
    );
    server.run()?;
    Ok(())
}
