//! Client connection boundary: line-delimited TCP to the server.

use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use shared::{Message, PlayerAction, PlayerRecord};

/// A connected client. Reads and writes the server's line stream; decoding
/// failures are logged and skipped so one bad line never kills the session.
pub struct Client {
    reader: tokio::io::Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(addr).await?;
        info!("connected to {}", addr);
        let (read_half, write_half) = stream.into_split();
        Ok(Client {
            reader: BufReader::new(read_half).lines(),
            writer: write_half,
        })
    }

    /// Sends one encoded message as a line.
    pub async fn send(&mut self, message: &Message) -> std::io::Result<()> {
        self.writer.write_all(message.encode().as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    /// Announces this player to the session. The server assigns the spawn
    /// position at game start, so the announced coordinates are placeholders.
    pub async fn join(&mut self, name: &str, image_path: &str) -> std::io::Result<()> {
        let record = PlayerRecord {
            name: name.to_string(),
            image_path: image_path.to_string(),
            x: 0,
            y: 0,
        };
        self.send(&Message::NewPlayer(record)).await
    }

    /// Submits this tick's batched input. An empty batch still counts as the
    /// tick report the server is waiting for.
    pub async fn send_update(&mut self, actions: &[PlayerAction]) -> std::io::Result<()> {
        self.send(&Message::PlayerUpdate(actions.to_vec())).await
    }

    /// Next decoded message from the server, or `None` once the server has
    /// closed the stream. Undecodable lines are skipped.
    pub async fn next_message(&mut self) -> std::io::Result<Option<Message>> {
        loop {
            match self.reader.next_line().await? {
                Some(line) => match Message::decode(line.trim_end()) {
                    Ok(message) => return Ok(Some(message)),
                    Err(e) => warn!("ignoring malformed line from server: {}", e),
                },
                None => return Ok(None),
            }
        }
    }
}
