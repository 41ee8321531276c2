//! Arena server binary.

use clap::Parser;
use log::info;
use std::time::Duration;

use server::network::Server;
use shared::{Layout, MAX_PLAYERS};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "5000")]
    port: u16,
    /// Minimum tick period in milliseconds
    #[clap(short, long, default_value = "50")]
    tick_ms: u64,
    /// Maximum number of players
    #[clap(short, long, default_value_t = MAX_PLAYERS)]
    max_players: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut server = Server::bind(
        &addr,
        Duration::from_millis(args.tick_ms),
        args.max_players,
        Layout::default_arena(),
    )
    .await?;

    info!(
        "arena server up at {} ({}ms ticks, {} players max)",
        server.local_addr(),
        args.tick_ms,
        args.max_players
    );
    server.run().await?;

    Ok(())
}
