//! Headless arena client: joins a session and plays random inputs. Useful
//! for soaking a server and for driving multi-client sessions by hand.

use clap::Parser;
use log::info;
use rand::Rng;

use client::game::ClientGameState;
use client::network::Client;
use shared::{Layout, Message, PlayerAction, PLAYER_SPEED};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:5000")]
    server: String,

    /// Player name
    #[arg(short, long, default_value = "bot")]
    name: String,

    /// Image path carried in the player record
    #[arg(short, long, default_value = "images/default.png")]
    image: String,

    /// Request the game start once joined
    #[arg(long)]
    start: bool,

    /// How many ticks to play before disconnecting (0 = forever)
    #[arg(short, long, default_value = "0")]
    ticks: u64,
}

fn random_actions() -> Vec<PlayerAction> {
    let mut rng = rand::thread_rng();
    let mut actions = Vec::new();
    let step = PLAYER_SPEED;
    match rng.gen_range(0..4) {
        0 => actions.push(PlayerAction::Translate { dx: step, dy: 0 }),
        1 => actions.push(PlayerAction::Translate { dx: -step, dy: 0 }),
        2 => actions.push(PlayerAction::Translate { dx: 0, dy: step }),
        _ => actions.push(PlayerAction::Translate { dx: 0, dy: -step }),
    }
    if rng.gen_bool(0.3) {
        actions.push(PlayerAction::Rotate {
            angle: rng.gen_range(0.0..std::f64::consts::TAU),
        });
    }
    if rng.gen_bool(0.1) {
        actions.push(PlayerAction::Shoot);
    }
    actions
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    info!("connecting to {}", args.server);

    let mut client = Client::connect(&args.server).await?;
    let mut state = ClientGameState::new(Layout::default_arena());

    client.join(&args.name, &args.image).await?;
    if args.start {
        client.send(&Message::StartGame).await?;
    }

    // Lobby: absorb roster traffic until the game starts.
    while !state.started() {
        match client.next_message().await? {
            Some(message) => {
                state.apply(&message);
                if state.rejected() {
                    info!("session refused us, giving up");
                    return Ok(());
                }
            }
            None => {
                info!("server closed the connection before start");
                return Ok(());
            }
        }
    }
    info!("game started with {} players", state.roster().len());

    let mut tick: u64 = 0;
    'game: loop {
        client.send_update(&random_actions()).await?;

        // Replay the tick's validated events up to the end marker.
        loop {
            match client.next_message().await? {
                Some(message) => {
                    let done = matches!(message, Message::EndPlayerUpdate);
                    state.apply(&message);
                    if done {
                        break;
                    }
                }
                None => {
                    info!("server closed the connection");
                    break 'game;
                }
            }
        }

        tick += 1;
        if args.ticks > 0 && tick >= args.ticks {
            info!("played {} ticks, disconnecting", tick);
            break;
        }
    }

    Ok(())
}
