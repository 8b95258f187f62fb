//! Per-observer visibility: fog of war, eyes, infravision, invisibility.
//!
//! The server filters every BEGIN and UPDATE through an observer's filter
//! before sending, so clients never receive information their team cannot
//! see. Clients recompute the same filter over their replica to drive the
//! renderer.

use crate::game_state::GameState;
use crate::hex::{Direction, HexCoord};
use crate::pawn::PawnFlags;
use crate::player::PlayerColour;
use crate::protocol::{Message, PawnRecord, TileRecord};
use std::collections::HashSet;

/// The set of tiles and pawns one observer may see.
#[derive(Clone, Debug)]
pub struct VisibilityFilter {
    observer: PlayerColour,
    /// Fog disabled or observer is a spectator: every tile shows.
    all_tiles: bool,
    /// Tiles within sensing radius of the observer's pawns and eyes.
    visible: HashSet<HexCoord>,
    /// Tiles covered by the observer's infravision lines. Also reveals
    /// invisible pawns standing on them.
    infra: HashSet<HexCoord>,
}

impl VisibilityFilter {
    /// Compute the filter for an observer over the current state.
    pub fn compute(state: &GameState, observer: PlayerColour) -> Self {
        let all_tiles = !state.settings.fog_of_war || observer == PlayerColour::Spectate;

        let mut visible = HashSet::new();
        let mut infra = HashSet::new();

        for id in state.player_pawns(observer) {
            let pawn = &state.pawns[&id];
            let radius = pawn.range as u32 + 1;
            for coord in state.board.radial_coords(&pawn.pos, radius) {
                visible.insert(coord);
            }
            if pawn.has_flag(PawnFlags::INFRAVISION) {
                infra.insert(pawn.pos);
                for dir in Direction::ALL {
                    for coord in state.board.line_coords(&pawn.pos, dir) {
                        infra.insert(coord);
                    }
                }
            }
        }

        // Eyes grant local vision through fog around their own tile
        for tile in state.board.tiles.values() {
            if tile.eye == Some(observer) {
                for coord in state.board.radial_coords(&tile.coord, 1) {
                    visible.insert(coord);
                }
            }
        }

        visible.extend(infra.iter().copied());

        Self {
            observer,
            all_tiles,
            visible,
            infra,
        }
    }

    pub fn observer(&self) -> PlayerColour {
        self.observer
    }

    /// Can the observer see this tile at all?
    pub fn can_see_tile(&self, coord: &HexCoord) -> bool {
        self.all_tiles || self.visible.contains(coord)
    }

    /// Can the observer see a pawn with these attributes?
    ///
    /// Invisibility applies even without fog: an invisible pawn shows only
    /// to its own team, to spectators, and to observers whose infravision
    /// covers its tile.
    pub fn can_see_pawn(&self, pos: &HexCoord, colour: PlayerColour, flags: PawnFlags) -> bool {
        if !self.can_see_tile(pos) {
            return false;
        }
        if flags.contains(PawnFlags::INVISIBLE)
            && colour != self.observer
            && self.observer != PlayerColour::Spectate
            && !self.infra.contains(pos)
        {
            return false;
        }
        true
    }

    /// Filter one tile record, stripping pawns the observer cannot see.
    pub fn filter_tile_record(&self, record: &TileRecord) -> Option<TileRecord> {
        if !self.can_see_tile(&record.coord) {
            return None;
        }
        let mut record = record.clone();
        if let Some(pawn) = &record.pawn {
            if !self.can_see_pawn(&pawn.pos, pawn.colour, pawn.flags) {
                record.pawn = None;
            }
        }
        Some(record)
    }

    /// Filter one standalone pawn record.
    pub fn filter_pawn_record(&self, record: &PawnRecord) -> Option<PawnRecord> {
        self.can_see_pawn(&record.pos, record.colour, record.flags)
            .then(|| record.clone())
    }

    /// Apply this filter to an outbound message.
    ///
    /// `UPDATE` and `BEGIN` payloads are reduced to the visible subset;
    /// every other message passes through unchanged.
    pub fn filter_message(&self, msg: &Message) -> Message {
        match msg {
            Message::Update { tiles, pawns } => Message::Update {
                tiles: tiles
                    .iter()
                    .filter_map(|t| self.filter_tile_record(t))
                    .collect(),
                pawns: pawns
                    .iter()
                    .filter_map(|p| self.filter_pawn_record(p))
                    .collect(),
            },
            Message::Begin {
                cols,
                rows,
                tiles,
                players,
                colour: _,
            } => Message::Begin {
                cols: *cols,
                rows: *rows,
                tiles: tiles
                    .iter()
                    .filter_map(|t| self.filter_tile_record(t))
                    .collect(),
                players: players.clone(),
                colour: self.observer,
            },
            other => other.clone(),
        }
    }
}
