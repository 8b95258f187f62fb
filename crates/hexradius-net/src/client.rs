//! Headless client: connects, mirrors the game, and optionally plays.
//!
//! Rendering is a collaborator concern; this runner prints notification
//! lines and, with `auto_play`, proposes simple moves so a session can be
//! exercised end to end from the command line.

use crate::codec::{self, CodecError};
use crate::mirror::{Mirror, MirrorPhase};
use hexradius_core::{Direction, HexCoord, Message, PlayerColour};
use tokio::net::TcpStream;

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Server address, `host:port`.
    pub addr: String,
    /// Player name sent in INIT.
    pub name: String,
    /// Ask to be switched to the spectator colour after joining.
    pub spectate: bool,
    /// Play automatically instead of only observing.
    pub auto_play: bool,
    /// As admin, send BEGIN once this many players are in the lobby.
    pub start_at: Option<usize>,
}

/// Errors terminating a client run.
#[derive(Debug)]
pub enum ClientError {
    Io(std::io::Error),
    Codec(CodecError),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Io(err) => write!(f, "I/O error: {}", err),
            ClientError::Codec(err) => write!(f, "Protocol error: {}", err),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err)
    }
}

impl From<CodecError> for ClientError {
    fn from(err: CodecError) -> Self {
        ClientError::Codec(err)
    }
}

/// Run the client until the server closes the session.
pub async fn run(config: ClientConfig) -> Result<(), ClientError> {
    let stream = TcpStream::connect(&config.addr).await?;
    let (mut read_half, mut write_half) = stream.into_split();

    codec::write_frame(
        &mut write_half,
        &Message::Init {
            player_name: config.name.clone(),
        },
    )
    .await?;

    let mut mirror = Mirror::new();
    let mut begun = false;
    loop {
        let msg = codec::read_frame(&mut read_half).await?;
        let tag = msg.tag();
        mirror.apply(&msg);

        for note in mirror.take_notes() {
            println!("{}", note);
        }

        match mirror.phase() {
            MirrorPhase::Quit(reason) => {
                println!("Disconnected by server: {}", reason);
                return Ok(());
            }
            MirrorPhase::Over(winner) => {
                match winner {
                    Some(colour) => println!("Team {} wins", colour),
                    None => println!("Game drawn"),
                }
                continue;
            }
            _ => {}
        }

        if tag == "GINFO" && config.spectate {
            codec::write_frame(
                &mut write_half,
                &Message::ChangeColour {
                    player_id: mirror.my_id(),
                    colour: PlayerColour::Spectate,
                },
            )
            .await?;
        }

        // Admin auto-start once the lobby is full enough
        if let Some(threshold) = config.start_at {
            if !begun
                && *mirror.phase() == MirrorPhase::Lobby
                && mirror.my_id() == hexradius_core::ADMIN_ID
                && mirror.state().players.len() >= threshold
            {
                begun = true;
                codec::write_frame(
                    &mut write_half,
                    &Message::Begin {
                        cols: 0,
                        rows: 0,
                        tiles: vec![],
                        players: vec![],
                        colour: PlayerColour::Spectate,
                    },
                )
                .await?;
            }
        }

        if config.auto_play && mirror.my_turn() {
            match propose_move(&mirror) {
                Some((from, to)) => {
                    codec::write_frame(
                        &mut write_half,
                        &Message::Move {
                            from,
                            to,
                            power_rand_vals: vec![],
                        },
                    )
                    .await?;
                }
                None => {
                    codec::write_frame(&mut write_half, &Message::Resign).await?;
                }
            }
        }
    }
}

/// Pick a plausible move from the replica: the first own pawn with a
/// steppable neighbouring tile. The server remains the validator.
fn propose_move(mirror: &Mirror) -> Option<(HexCoord, HexCoord)> {
    let state = mirror.state();
    for id in state.player_pawns(mirror.colour()) {
        let pawn = &state.pawns[&id];
        let from_tile = state.board.get(&pawn.pos)?;
        for dir in Direction::ALL {
            let to = match state.board.resolved_neighbor(&pawn.pos, dir) {
                Some(to) => to,
                None => continue,
            };
            let tile = match state.board.get(&to) {
                Some(tile) => tile,
                None => continue,
            };
            if tile.smashed || tile.black_hole {
                continue;
            }
            if (tile.height - from_tile.height).abs() > 1 {
                continue;
            }
            if let Some(occupant) = state.pawn_at(&to) {
                if occupant.colour == mirror.colour() {
                    continue;
                }
            }
            return Some((pawn.pos, to));
        }
    }
    None
}
