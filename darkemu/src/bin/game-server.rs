//! Game server front-end: accepts clients and logs their traffic.
//!
//! Run with: `cargo run --bin game-server -- --port 55901`

use anyhow::Context;
use clap::Parser;
use darkemu::runtime::{init_tracing, shutdown_on_ctrl_c};
use darkemu_server::{DEFAULT_GAME_PORT, PacketLogger, ServerBuilder};
use std::net::{Ipv4Addr, SocketAddr};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_GAME_PORT)]
    port: u16,
    /// IPv4 address to bind to
    #[arg(short, long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    bind: Ipv4Addr,
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
            tracing::error!("game server failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut server = ServerBuilder::new()
        .bind(SocketAddr::from((args.bind, args.port)))
        .handler(PacketLogger::new())
        .build()
        .context("starting game server")?;
    shutdown_on_ctrl_c(server.shutdown_handle()).context("installing signal handler")?;

    tracing::info!(port = server.port(), "game server ready");
    server.run()?;
    tracing::info!(
        bytes_received = server.handler().bytes_received(),
        "game server stopped"
    );
    Ok(())
}
