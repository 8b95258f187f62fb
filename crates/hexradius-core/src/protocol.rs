//! The tagged message union replicated between server and clients.
//!
//! Every message travels as a self-describing record; framing is the
//! transport crate's concern. Encoding then decoding any message yields an
//! equal message.

use crate::hex::{DirectionMask, HexCoord};
use crate::pawn::{Pawn, PawnFlags};
use crate::player::PlayerColour;
use crate::powers::PowerId;
use crate::tile::{EdgeMask, Tile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A player as replicated to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: u16,
    pub name: String,
    pub colour: PlayerColour,
    pub score: u32,
}

impl From<&crate::player::Player> for PlayerInfo {
    fn from(player: &crate::player::Player) -> Self {
        Self {
            id: player.id,
            name: player.name.clone(),
            colour: player.colour,
            score: player.score,
        }
    }
}

/// Authoritative snapshot of one tile.
///
/// The identity of an unclaimed pickup stays server-side; clients only
/// learn that a power is present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileRecord {
    pub coord: HexCoord,
    pub height: i8,
    pub smashed: bool,
    pub has_power: bool,
    pub mine: Option<PlayerColour>,
    pub landing_pad: Option<PlayerColour>,
    pub black_hole: bool,
    pub eye: Option<PlayerColour>,
    pub wrap: EdgeMask,
    pub hill: bool,
    /// The pawn standing here; `None` means the tile is empty.
    pub pawn: Option<PawnRecord>,
}

impl TileRecord {
    /// Snapshot a tile and the pawn standing on it.
    pub fn from_tile(tile: &Tile, pawn: Option<&Pawn>) -> Self {
        Self {
            coord: tile.coord,
            height: tile.height,
            smashed: tile.smashed,
            has_power: tile.has_power(),
            mine: tile.mine,
            landing_pad: tile.landing_pad,
            black_hole: tile.black_hole,
            eye: tile.eye,
            wrap: tile.wrap,
            hill: tile.hill,
            pawn: pawn.map(PawnRecord::from_pawn),
        }
    }
}

/// Authoritative snapshot of one pawn, addressed by its coordinate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PawnRecord {
    pub pos: HexCoord,
    pub colour: PlayerColour,
    pub flags: PawnFlags,
    pub range: u8,
    pub powers: BTreeMap<PowerId, u32>,
}

impl PawnRecord {
    pub fn from_pawn(pawn: &Pawn) -> Self {
        Self {
            pos: pawn.pos,
            colour: pawn.colour,
            flags: pawn.flags,
            range: pawn.range,
            powers: pawn.powers.clone(),
        }
    }
}

/// Free-form argument attached to an animation message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimArg {
    pub key: String,
    pub value: AnimValue,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AnimValue {
    Int(i64),
    Float(f64),
    Str(String),
}

/// The wire message union.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum Message {
    /// Client hello carrying the desired player name.
    #[serde(rename = "INIT")]
    Init { player_name: String },

    /// Lobby roster sent to a joiner, including its assigned id.
    #[serde(rename = "GINFO")]
    GameInfo {
        player_id: u16,
        players: Vec<PlayerInfo>,
        map_name: String,
        fog_of_war: bool,
        king_of_the_hill: bool,
    },

    /// Another player joined the lobby.
    #[serde(rename = "PJOIN")]
    PlayerJoined { player: PlayerInfo },

    /// A player left; their pawns are forfeit.
    #[serde(rename = "PQUIT")]
    PlayerQuit { player_id: u16, quit_msg: String },

    /// Lobby colour change for a player.
    #[serde(rename = "CCOLOUR")]
    ChangeColour { player_id: u16, colour: PlayerColour },

    /// Admin: toggle a pending game setting.
    #[serde(rename = "CHANGE_SETTING")]
    ChangeSetting {
        fog_of_war: Option<bool>,
        king_of_the_hill: Option<bool>,
    },

    /// Admin: select a different scenario.
    #[serde(rename = "CHANGE_MAP")]
    ChangeMap { map_name: String },

    /// Admin: add a server-local AI participant.
    #[serde(rename = "ADD_AI")]
    AddAi { name: String },

    /// Admin: remove a player from the session.
    #[serde(rename = "KICK")]
    Kick { player_id: u16, quit_msg: String },

    /// Game start: the initial board, already visibility-filtered for the
    /// recipient, whose own colour rides along.
    #[serde(rename = "BEGIN")]
    Begin {
        cols: u32,
        rows: u32,
        tiles: Vec<TileRecord>,
        players: Vec<PlayerInfo>,
        colour: PlayerColour,
    },

    /// It is now this player's turn.
    #[serde(rename = "TURN")]
    Turn { player_id: u16 },

    /// A pawn move; echoed verbatim to all clients when legal.
    #[serde(rename = "MOVE")]
    Move {
        from: HexCoord,
        to: HexCoord,
        /// RNG prefix consumed resolving this move (pickups).
        power_rand_vals: Vec<u32>,
    },

    /// Server-initiated relocation (teleport result, wrap traversal).
    #[serde(rename = "FORCE_MOVE")]
    ForceMove { from: HexCoord, to: HexCoord },

    /// A pawn was removed from this tile.
    #[serde(rename = "DESTROY")]
    Destroy { at: HexCoord },

    /// A power use; echoed to all clients when legal.
    #[serde(rename = "USE")]
    Use {
        at: HexCoord,
        power: PowerId,
        power_direction: DirectionMask,
        target: Option<HexCoord>,
        /// RNG prefix consumed resolving this use.
        power_rand_vals: Vec<u32>,
    },

    /// Authoritative state delta carrying only what changed.
    #[serde(rename = "UPDATE")]
    Update {
        tiles: Vec<TileRecord>,
        pawns: Vec<PawnRecord>,
    },

    /// Game over; `winner` is `None` on a draw.
    #[serde(rename = "GOVER")]
    GameOver { winner: Option<PlayerColour> },

    /// The server is closing this client's session.
    #[serde(rename = "QUIT")]
    Quit { quit_msg: String },

    /// The proposed action failed validation; no state changed.
    #[serde(rename = "BADMOVE")]
    BadMove,

    /// Acknowledgement of a successful non-echoed request.
    #[serde(rename = "OK")]
    Ok,

    /// The sender forfeits, destroying all their pawns.
    #[serde(rename = "RESIGN")]
    Resign,

    #[serde(rename = "PAWN_ANIMATION")]
    PawnAnimation {
        animation_name: String,
        at: HexCoord,
        misc: Vec<AnimArg>,
    },

    #[serde(rename = "TILE_ANIMATION")]
    TileAnimation {
        animation_name: String,
        tiles: Vec<HexCoord>,
        center: HexCoord,
        delay_factor: f32,
        misc: Vec<AnimArg>,
    },

    #[serde(rename = "PARTICLE_ANIMATION")]
    ParticleAnimation {
        animation_name: String,
        at: HexCoord,
        misc: Vec<AnimArg>,
    },

    /// A pawn picked up a power on this tile.
    #[serde(rename = "ADD_POWER_NOTIFICATION")]
    AddPowerNotification { at: HexCoord },

    /// A pawn spent a power.
    #[serde(rename = "USE_POWER_NOTIFICATION")]
    UsePowerNotification {
        at: HexCoord,
        power: PowerId,
        power_direction: DirectionMask,
    },

    /// King-of-the-Hill score change.
    #[serde(rename = "SCORE_UPDATE")]
    ScoreUpdate { players: Vec<PlayerInfo> },
}

impl Message {
    /// The wire tag, for diagnostics.
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Init { .. } => "INIT",
            Message::GameInfo { .. } => "GINFO",
            Message::PlayerJoined { .. } => "PJOIN",
            Message::PlayerQuit { .. } => "PQUIT",
            Message::ChangeColour { .. } => "CCOLOUR",
            Message::ChangeSetting { .. } => "CHANGE_SETTING",
            Message::ChangeMap { .. } => "CHANGE_MAP",
            Message::AddAi { .. } => "ADD_AI",
            Message::Kick { .. } => "KICK",
            Message::Begin { .. } => "BEGIN",
            Message::Turn { .. } => "TURN",
            Message::Move { .. } => "MOVE",
            Message::ForceMove { .. } => "FORCE_MOVE",
            Message::Destroy { .. } => "DESTROY",
            Message::Use { .. } => "USE",
            Message::Update { .. } => "UPDATE",
            Message::GameOver { .. } => "GOVER",
            Message::Quit { .. } => "QUIT",
            Message::BadMove => "BADMOVE",
            Message::Ok => "OK",
            Message::Resign => "RESIGN",
            Message::PawnAnimation { .. } => "PAWN_ANIMATION",
            Message::TileAnimation { .. } => "TILE_ANIMATION",
            Message::ParticleAnimation { .. } => "PARTICLE_ANIMATION",
            Message::AddPowerNotification { .. } => "ADD_POWER_NOTIFICATION",
            Message::UsePowerNotification { .. } => "USE_POWER_NOTIFICATION",
            Message::ScoreUpdate { .. } => "SCORE_UPDATE",
        }
    }
}
