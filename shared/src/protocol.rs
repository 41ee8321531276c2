//! Wire protocol: newline-delimited UTF-8 text lines over a persistent
//! duplex stream per connection.
//!
//! Two delimiters are in play: `:` separates a message kind from its
//! arguments, `!` separates sub-actions inside one batched-update line (and
//! player records inside an `ALL_PLAYERS` snapshot). Every line decodes into
//! a [`Message`]; anything that does not is a typed [`ProtocolError`] and the
//! reader logs and skips the line rather than tearing down the connection.

use thiserror::Error;

/// Separates a message kind from its arguments.
pub const FIELD_DELIMITER: char = ':';
/// Separates sub-actions inside one batched-update line.
pub const BATCH_DELIMITER: char = '!';
/// Separates the fields of an encoded player record.
pub const RECORD_DELIMITER: char = ',';

/// Errors produced while decoding a protocol line.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("unknown message kind: {0}")]
    UnknownKind(String),

    #[error("missing field in {0} message")]
    MissingField(&'static str),

    #[error("malformed numeric field: {0}")]
    BadNumber(String),

    #[error("malformed player record: {0}")]
    BadRecord(String),

    #[error("empty line")]
    EmptyLine,
}

fn parse_int(field: &str) -> Result<i32, ProtocolError> {
    field
        .parse()
        .map_err(|_| ProtocolError::BadNumber(field.to_string()))
}

fn parse_index(field: &str) -> Result<usize, ProtocolError> {
    field
        .parse()
        .map_err(|_| ProtocolError::BadNumber(field.to_string()))
}

fn parse_angle(field: &str) -> Result<f64, ProtocolError> {
    field
        .parse()
        .map_err(|_| ProtocolError::BadNumber(field.to_string()))
}

/// The wire form of a player: everything a peer needs to reconstruct the
/// roster entry. Encoded as comma-joined `name,image_path,x,y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    pub name: String,
    pub image_path: String,
    pub x: i32,
    pub y: i32,
}

impl PlayerRecord {
    pub fn encode(&self) -> String {
        format!(
            "{}{d}{}{d}{}{d}{}",
            self.name,
            self.image_path,
            self.x,
            self.y,
            d = RECORD_DELIMITER
        )
    }

    pub fn decode(record: &str) -> Result<Self, ProtocolError> {
        let fields: Vec<&str> = record.split(RECORD_DELIMITER).collect();
        if fields.len() != 4 {
            return Err(ProtocolError::BadRecord(record.to_string()));
        }
        Ok(Self {
            name: fields[0].to_string(),
            image_path: fields[1].to_string(),
            x: parse_int(fields[2])?,
            y: parse_int(fields[3])?,
        })
    }
}

/// The kind tag of a batched sub-action. Keys the last-writer-wins merge in
/// the per-connection pending batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Translate,
    Rotate,
    Shoot,
}

impl ActionKind {
    /// All kinds in the fixed order batches are drained and applied.
    pub const ALL: [ActionKind; 3] = [ActionKind::Translate, ActionKind::Rotate, ActionKind::Shoot];
}

/// One sub-action inside a client's batched update. Carries no player index;
/// the server attributes it to the sending connection.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    Translate { dx: i32, dy: i32 },
    Rotate { angle: f64 },
    Shoot,
}

impl PlayerAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PlayerAction::Translate { .. } => ActionKind::Translate,
            PlayerAction::Rotate { .. } => ActionKind::Rotate,
            PlayerAction::Shoot => ActionKind::Shoot,
        }
    }

    pub fn encode(&self) -> String {
        match self {
            PlayerAction::Translate { dx, dy } => {
                format!("PLAYER_TRANSLATE{d}{}{d}{}", dx, dy, d = FIELD_DELIMITER)
            }
            PlayerAction::Rotate { angle } => {
                format!("PLAYER_ROTATE{d}{}", angle, d = FIELD_DELIMITER)
            }
            PlayerAction::Shoot => "PLAYER_SHOOT".to_string(),
        }
    }

    pub fn decode(encoded: &str) -> Result<Self, ProtocolError> {
        let (kind, payload) = split_kind(encoded);
        match kind {
            "PLAYER_TRANSLATE" => {
                let mut fields = payload.split(FIELD_DELIMITER);
                let dx = parse_int(fields.next().ok_or(ProtocolError::MissingField(
                    "PLAYER_TRANSLATE",
                ))?)?;
                let dy = parse_int(fields.next().ok_or(ProtocolError::MissingField(
                    "PLAYER_TRANSLATE",
                ))?)?;
                Ok(PlayerAction::Translate { dx, dy })
            }
            "PLAYER_ROTATE" => {
                if payload.is_empty() {
                    return Err(ProtocolError::MissingField("PLAYER_ROTATE"));
                }
                Ok(PlayerAction::Rotate {
                    angle: parse_angle(payload)?,
                })
            }
            "PLAYER_SHOOT" => Ok(PlayerAction::Shoot),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// The full message catalogue, both directions.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A player joined (client announces itself; server relays to others).
    NewPlayer(PlayerRecord),
    /// Full roster snapshot, sent to a newly joined client.
    AllPlayers(Vec<PlayerRecord>),
    /// Roster removal by player index.
    PlayerLeft { index: usize },
    /// Address the server advertises for others to join at.
    ServerIp { addr: String },
    /// Begin the simulation.
    StartGame,
    /// Validated movement, rebroadcast by the server.
    PlayerTranslate { index: usize, dx: i32, dy: i32 },
    /// Facing change, rebroadcast by the server.
    PlayerRotate { index: usize, angle: f64 },
    /// Projectile spawned by the indexed player.
    PlayerShoot { index: usize },
    /// One tick's batched input from a client.
    PlayerUpdate(Vec<PlayerAction>),
    /// Tick-complete barrier marker.
    EndPlayerUpdate,
    /// Admission refused.
    Rejected,
}

impl Message {
    pub fn encode(&self) -> String {
        let d = FIELD_DELIMITER;
        match self {
            Message::NewPlayer(record) => format!("NEW_PLAYER{d}{}", record.encode()),
            Message::AllPlayers(records) => {
                if records.is_empty() {
                    "ALL_PLAYERS".to_string()
                } else {
                    let joined: Vec<String> = records.iter().map(PlayerRecord::encode).collect();
                    format!("ALL_PLAYERS{d}{}", joined.join(&BATCH_DELIMITER.to_string()))
                }
            }
            Message::PlayerLeft { index } => format!("PLAYER_LEFT{d}{}", index),
            Message::ServerIp { addr } => format!("SERVER_IP{d}{}", addr),
            Message::StartGame => "START_GAME".to_string(),
            Message::PlayerTranslate { index, dx, dy } => {
                format!("PLAYER_TRANSLATE{d}{}{d}{}{d}{}", index, dx, dy)
            }
            Message::PlayerRotate { index, angle } => {
                format!("PLAYER_ROTATE{d}{}{d}{}", index, angle)
            }
            Message::PlayerShoot { index } => format!("PLAYER_SHOOT{d}{}", index),
            Message::PlayerUpdate(actions) => {
                if actions.is_empty() {
                    "PLAYER_UPDATE".to_string()
                } else {
                    let joined: Vec<String> = actions.iter().map(PlayerAction::encode).collect();
                    format!(
                        "PLAYER_UPDATE{d}{}",
                        joined.join(&BATCH_DELIMITER.to_string())
                    )
                }
            }
            Message::EndPlayerUpdate => "END_PLAYER_UPDATE".to_string(),
            Message::Rejected => "REJECTED".to_string(),
        }
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        if line.is_empty() {
            return Err(ProtocolError::EmptyLine);
        }
        let (kind, payload) = split_kind(line);
        match kind {
            "NEW_PLAYER" => Ok(Message::NewPlayer(PlayerRecord::decode(payload)?)),
            "ALL_PLAYERS" => {
                if payload.is_empty() {
                    return Ok(Message::AllPlayers(Vec::new()));
                }
                let records = payload
                    .split(BATCH_DELIMITER)
                    .map(PlayerRecord::decode)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Message::AllPlayers(records))
            }
            "PLAYER_LEFT" => {
                if payload.is_empty() {
                    return Err(ProtocolError::MissingField("PLAYER_LEFT"));
                }
                Ok(Message::PlayerLeft {
                    index: parse_index(payload)?,
                })
            }
            "SERVER_IP" => {
                // The address itself may contain the field delimiter.
                if payload.is_empty() {
                    return Err(ProtocolError::MissingField("SERVER_IP"));
                }
                Ok(Message::ServerIp {
                    addr: payload.to_string(),
                })
            }
            "START_GAME" => Ok(Message::StartGame),
            "PLAYER_TRANSLATE" => {
                let mut fields = payload.split(FIELD_DELIMITER);
                let missing = ProtocolError::MissingField("PLAYER_TRANSLATE");
                let index = parse_index(fields.next().ok_or(missing)?)?;
                let dx = parse_int(
                    fields
                        .next()
                        .ok_or(ProtocolError::MissingField("PLAYER_TRANSLATE"))?,
                )?;
                let dy = parse_int(
                    fields
                        .next()
                        .ok_or(ProtocolError::MissingField("PLAYER_TRANSLATE"))?,
                )?;
                Ok(Message::PlayerTranslate { index, dx, dy })
            }
            "PLAYER_ROTATE" => {
                let mut fields = payload.split(FIELD_DELIMITER);
                let index = parse_index(
                    fields
                        .next()
                        .ok_or(ProtocolError::MissingField("PLAYER_ROTATE"))?,
                )?;
                let angle = parse_angle(
                    fields
                        .next()
                        .ok_or(ProtocolError::MissingField("PLAYER_ROTATE"))?,
                )?;
                Ok(Message::PlayerRotate { index, angle })
            }
            "PLAYER_SHOOT" => {
                if payload.is_empty() {
                    return Err(ProtocolError::MissingField("PLAYER_SHOOT"));
                }
                Ok(Message::PlayerShoot {
                    index: parse_index(payload)?,
                })
            }
            "PLAYER_UPDATE" => {
                if payload.is_empty() {
                    return Ok(Message::PlayerUpdate(Vec::new()));
                }
                let actions = payload
                    .split(BATCH_DELIMITER)
                    .map(PlayerAction::decode)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Message::PlayerUpdate(actions))
            }
            "END_PLAYER_UPDATE" => Ok(Message::EndPlayerUpdate),
            "REJECTED" => Ok(Message::Rejected),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// Splits a line at the first field delimiter into kind and payload.
fn split_kind(line: &str) -> (&str, &str) {
    match line.split_once(FIELD_DELIMITER) {
        Some((kind, payload)) => (kind, payload),
        None => (line, ""),
    }
}
