//! The client-side state replica.
//!
//! A [`Mirror`] applies authoritative messages in receipt order and never
//! mutates state on its own. In-bounds tiles first sighted through fog
//! are created on arrival; records for coordinates outside the board are
//! logged and ignored rather than tearing the session down. Applying the
//! same UPDATE twice is a no-op.

use hexradius_core::{
    Board, GameSettings, GameState, HexCoord, Message, PawnRecord, Player, PlayerColour,
    TileRecord, VisibilityFilter,
};

/// Where the session currently stands, from the client's point of view.
#[derive(Clone, Debug, PartialEq)]
pub enum MirrorPhase {
    /// Connected, INIT sent, waiting for GINFO.
    Connecting,
    /// In the lobby.
    Lobby,
    /// Game running.
    Game,
    /// Game finished; `None` is a draw.
    Over(Option<PlayerColour>),
    /// The server closed this session.
    Quit(String),
}

/// A replica of the authoritative state plus transient session info.
pub struct Mirror {
    state: GameState,
    phase: MirrorPhase,
    my_id: u16,
    colour: PlayerColour,
    map_name: String,
    /// Id of the player whose turn it is.
    turn: Option<u16>,
    /// Power-use notification lines; ephemeral UI state, never persisted.
    notes: Vec<String>,
}

impl Default for Mirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Mirror {
    pub fn new() -> Self {
        Self {
            state: GameState::new(GameSettings::default(), Board::default(), 0),
            phase: MirrorPhase::Connecting,
            my_id: 0,
            colour: PlayerColour::Spectate,
            map_name: String::new(),
            turn: None,
            notes: Vec::new(),
        }
    }

    pub fn phase(&self) -> &MirrorPhase {
        &self.phase
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn my_id(&self) -> u16 {
        self.my_id
    }

    pub fn colour(&self) -> PlayerColour {
        self.colour
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn turn(&self) -> Option<u16> {
        self.turn
    }

    /// True when it is this client's turn to act.
    pub fn my_turn(&self) -> bool {
        self.phase == MirrorPhase::Game && self.turn == Some(self.my_id)
    }

    /// Drain the accumulated notification lines.
    pub fn take_notes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notes)
    }

    /// The visibility set this client should render with.
    pub fn visibility(&self) -> VisibilityFilter {
        VisibilityFilter::compute(&self.state, self.colour)
    }

    /// Snapshot a replica tile the way the server would send it, for
    /// comparing replica and authoritative state.
    pub fn tile_record(&self, coord: &HexCoord) -> Option<TileRecord> {
        let tile = self.state.board.get(coord)?;
        Some(TileRecord::from_tile(tile, self.state.pawn_at(coord)))
    }

    /// Apply one authoritative message.
    pub fn apply(&mut self, msg: &Message) {
        match msg {
            Message::GameInfo {
                player_id,
                players,
                map_name,
                fog_of_war,
                king_of_the_hill,
            } => {
                self.my_id = *player_id;
                self.map_name = map_name.clone();
                self.state.settings.fog_of_war = *fog_of_war;
                self.state.settings.king_of_the_hill = *king_of_the_hill;
                self.state.players = players
                    .iter()
                    .map(|p| {
                        let mut player = Player::new(p.id, p.name.clone(), p.colour);
                        player.score = p.score;
                        player
                    })
                    .collect();
                if let Some(me) = self.state.player(self.my_id) {
                    self.colour = me.colour;
                }
                self.phase = MirrorPhase::Lobby;
            }
            Message::PlayerJoined { player } => {
                let mut joined = Player::new(player.id, player.name.clone(), player.colour);
                joined.score = player.score;
                self.state.players.push(joined);
            }
            Message::PlayerQuit { player_id, quit_msg } => {
                let colour = self.state.player(*player_id).map(|p| p.colour);
                if let Some(player) = self.state.player(*player_id) {
                    self.notes.push(format!("{} quit ({})", player.name, quit_msg));
                }
                self.state.players.retain(|p| p.id != *player_id);
                if let Some(colour) = colour {
                    let still_claimed =
                        self.state.players.iter().any(|p| p.colour == colour);
                    if colour.is_playing() && !still_claimed {
                        for id in self.state.player_pawns(colour) {
                            self.state.destroy_pawn(id);
                        }
                    }
                }
            }
            Message::ChangeColour { player_id, colour } => {
                if let Some(player) = self.state.player_mut(*player_id) {
                    player.colour = *colour;
                }
                if *player_id == self.my_id {
                    self.colour = *colour;
                }
            }
            Message::ChangeSetting {
                fog_of_war,
                king_of_the_hill,
            } => {
                if let Some(fog) = fog_of_war {
                    self.state.settings.fog_of_war = *fog;
                }
                if let Some(koth) = king_of_the_hill {
                    self.state.settings.king_of_the_hill = *koth;
                }
            }
            Message::ChangeMap { map_name } => {
                self.map_name = map_name.clone();
            }
            Message::Begin {
                cols,
                rows,
                tiles,
                players,
                colour,
            } => {
                self.state.board = Board::new(*cols, *rows);
                self.state.pawns.clear();
                self.state.players = players
                    .iter()
                    .map(|p| {
                        let mut player = Player::new(p.id, p.name.clone(), p.colour);
                        player.score = p.score;
                        player
                    })
                    .collect();
                self.colour = *colour;
                for record in tiles {
                    self.insert_tile(record);
                }
                self.phase = MirrorPhase::Game;
            }
            Message::Turn { player_id } => {
                self.turn = Some(*player_id);
            }
            Message::Move { from, to, .. } => {
                self.apply_relocation(from, to);
            }
            Message::ForceMove { from, to } => {
                self.apply_relocation(from, to);
            }
            Message::Destroy { at } => {
                if let Some(id) = self.state.pawn_id_at(at) {
                    self.state.destroy_pawn(id);
                }
            }
            Message::Update { tiles, pawns } => {
                for record in tiles {
                    self.apply_tile_record(record);
                }
                for record in pawns {
                    self.apply_pawn_record(record);
                }
            }
            Message::GameOver { winner } => {
                self.phase = MirrorPhase::Over(*winner);
                self.turn = None;
                self.notes.clear();
            }
            Message::Quit { quit_msg } => {
                self.phase = MirrorPhase::Quit(quit_msg.clone());
            }
            Message::ScoreUpdate { players } => {
                for info in players {
                    if let Some(player) = self.state.player_mut(info.id) {
                        player.score = info.score;
                    }
                }
            }
            Message::AddPowerNotification { at } => {
                self.notes.push(format!("Pawn at {} picked up a power", at));
            }
            Message::UsePowerNotification { at, power, .. } => {
                let name = hexradius_core::power(*power)
                    .map(|def| def.name)
                    .unwrap_or("unknown power");
                self.notes.push(format!("Pawn at {} used {}", at, name));
            }
            Message::Use { .. }
            | Message::PawnAnimation { .. }
            | Message::TileAnimation { .. }
            | Message::ParticleAnimation { .. } => {
                // Renderer concerns: the USE echo carries the RNG prefix
                // for deterministic animation replay; authoritative state
                // arrives in the accompanying UPDATE
            }
            Message::BadMove | Message::Ok => {}
            // Client-to-server messages have no meaning here
            Message::Init { .. } | Message::AddAi { .. } | Message::Kick { .. } | Message::Resign => {
                log::debug!("ignoring client-bound message {}", msg.tag());
            }
        }
    }

    /// Move a pawn between replica tiles, resolving combat naively; the
    /// accompanying UPDATE corrects any divergence. A destination this
    /// observer cannot see swallows the pawn (fog of war).
    fn apply_relocation(&mut self, from: &HexCoord, to: &HexCoord) {
        let Some(id) = self.state.pawn_id_at(from) else {
            log::debug!("relocation from unknown or empty tile {}", from);
            return;
        };

        let visible = self.visibility().can_see_tile(to);
        if !visible || self.state.board.get(to).is_none() {
            // Moved somewhere we cannot see: gone from our view
            self.state.destroy_pawn(id);
            return;
        }
        if let Some(occupant) = self.state.pawn_id_at(to) {
            self.state.destroy_pawn(occupant);
        }
        if self.state.relocate_pawn(id, *to).is_err() {
            log::warn!("replica failed to apply relocation {} -> {}", from, to);
        }
    }

    /// Create a replica tile from a BEGIN record.
    fn insert_tile(&mut self, record: &TileRecord) {
        let mut tile = hexradius_core::Tile::new(record.coord, record.height);
        tile.smashed = record.smashed;
        tile.power = record.has_power.then_some(0);
        tile.mine = record.mine;
        tile.landing_pad = record.landing_pad;
        tile.black_hole = record.black_hole;
        tile.eye = record.eye;
        tile.wrap = record.wrap;
        tile.hill = record.hill;
        self.state.board.set(tile);
        if let Some(pawn) = &record.pawn {
            self.place_pawn(pawn);
        }
    }

    /// Overwrite one replica tile with an authoritative record.
    ///
    /// Under fog of war a tile inside the declared board extents may be
    /// legitimately unknown until first sighted; such records are
    /// discoveries and create the tile. Coordinates outside the extents
    /// are out-of-sync strays, logged and ignored.
    fn apply_tile_record(&mut self, record: &TileRecord) {
        let coord = record.coord;
        match self.state.board.get_mut(&coord) {
            Some(tile) => {
                tile.height = record.height;
                tile.smashed = record.smashed;
                tile.power = record.has_power.then_some(0);
                tile.mine = record.mine;
                tile.landing_pad = record.landing_pad;
                tile.black_hole = record.black_hole;
                tile.eye = record.eye;
                tile.wrap = record.wrap;
                tile.hill = record.hill;
            }
            None => {
                if self.in_extents(&coord) {
                    self.insert_tile(record);
                } else {
                    // Out-of-sync replica: ignore the stray entry
                    log::warn!("UPDATE for unknown tile {}", coord);
                }
                return;
            }
        }

        match &record.pawn {
            Some(pawn) => self.place_pawn(pawn),
            None => {
                if let Some(id) = self.state.pawn_id_at(&coord) {
                    self.state.destroy_pawn(id);
                }
            }
        }
    }

    fn in_extents(&self, coord: &HexCoord) -> bool {
        coord.col >= 0
            && coord.row >= 0
            && (coord.col as u32) < self.state.board.cols
            && (coord.row as u32) < self.state.board.rows
    }

    /// Overwrite the pawn described by a standalone record.
    fn apply_pawn_record(&mut self, record: &PawnRecord) {
        if self.state.board.get(&record.pos).is_none() {
            log::warn!("UPDATE for pawn on unknown tile {}", record.pos);
            return;
        }
        self.place_pawn(record);
    }

    /// Place or overwrite a pawn so it matches an authoritative record.
    fn place_pawn(&mut self, record: &PawnRecord) {
        if let Some(existing) = self.state.pawn_id_at(&record.pos) {
            if self.state.pawns[&existing].colour != record.colour {
                self.state.destroy_pawn(existing);
            }
        }
        let id = match self.state.pawn_id_at(&record.pos) {
            Some(id) => id,
            None => match self.state.spawn_pawn(record.colour, record.pos) {
                Some(id) => id,
                None => return,
            },
        };
        let pawn = self.state.pawns.get_mut(&id).expect("just placed");
        pawn.colour = record.colour;
        pawn.flags = record.flags;
        pawn.range = record.range;
        pawn.powers = record.powers.clone();
    }
}
