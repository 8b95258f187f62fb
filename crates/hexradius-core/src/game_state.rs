//! Root game state owning the board, pawns and players.
//!
//! The server holds the only authoritative `GameState`; clients hold a
//! mirror that is writable solely by the delta applier. Raw cross-pointers
//! of the original design become arena handles here: a tile owns an
//! optional [`PawnId`] and each pawn keeps its tile's coordinate, and the
//! two must always agree.

use crate::board::Board;
use crate::hex::HexCoord;
use crate::pawn::{Pawn, PawnId};
use crate::player::{Player, PlayerColour};
use crate::rng::GameRng;
use crate::settings::GameSettings;
use crate::tile::MIN_HEIGHT;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// The complete state of a game at any point in time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    /// Game configuration (immutable after start).
    pub settings: GameSettings,
    /// The board.
    pub board: Board,
    /// All pawns ever created, indexed by handle. Destroyed pawns stay in
    /// the arena with `destroyed` set so handles never dangle.
    pub pawns: HashMap<PawnId, Pawn>,
    /// All participants.
    pub players: Vec<Player>,
    /// The single server-owned RNG sequence.
    pub rng: GameRng,
    /// Next handle to allocate.
    next_pawn_id: PawnId,
}

impl GameState {
    /// Create a new state over a board.
    pub fn new(settings: GameSettings, board: Board, seed: u64) -> Self {
        Self {
            settings,
            board,
            pawns: HashMap::new(),
            players: Vec::new(),
            rng: GameRng::from_seed(seed),
            next_pawn_id: 1,
        }
    }

    /// Create a pawn on an empty tile.
    ///
    /// Returns `None` if the tile is missing or occupied.
    pub fn spawn_pawn(&mut self, colour: PlayerColour, pos: HexCoord) -> Option<PawnId> {
        let tile = self.board.get_mut(&pos)?;
        if tile.pawn.is_some() {
            return None;
        }
        let id = self.next_pawn_id;
        self.next_pawn_id += 1;
        tile.pawn = Some(id);
        self.pawns.insert(id, Pawn::new(id, colour, pos));
        Some(id)
    }

    /// The pawn standing at a coordinate, if any.
    pub fn pawn_at(&self, coord: &HexCoord) -> Option<&Pawn> {
        self.pawn_id_at(coord).and_then(|id| self.pawns.get(&id))
    }

    /// Handle of the pawn standing at a coordinate.
    pub fn pawn_id_at(&self, coord: &HexCoord) -> Option<PawnId> {
        self.board.get(coord).and_then(|tile| tile.pawn)
    }

    /// Live pawns of one colour, row-major sorted by position.
    pub fn player_pawns(&self, colour: PlayerColour) -> Vec<PawnId> {
        let mut ids: Vec<PawnId> = self
            .pawns
            .values()
            .filter(|p| !p.destroyed && p.colour == colour)
            .map(|p| p.id)
            .collect();
        ids.sort_by_key(|id| self.pawns[id].pos);
        ids
    }

    /// All live pawns, row-major sorted by position.
    pub fn all_pawns(&self) -> Vec<PawnId> {
        let mut ids: Vec<PawnId> = self
            .pawns
            .values()
            .filter(|p| !p.destroyed)
            .map(|p| p.id)
            .collect();
        ids.sort_by_key(|id| self.pawns[id].pos);
        ids
    }

    /// Colours that still have live pawns.
    pub fn colours_alive(&self) -> BTreeSet<PlayerColour> {
        self.pawns
            .values()
            .filter(|p| !p.destroyed)
            .map(|p| p.colour)
            .collect()
    }

    /// Destroy a pawn. Destruction is final.
    ///
    /// Returns the coordinate it was removed from, or `None` if it was
    /// already destroyed.
    pub fn destroy_pawn(&mut self, id: PawnId) -> Option<HexCoord> {
        let pawn = self.pawns.get_mut(&id)?;
        if pawn.destroyed {
            return None;
        }
        pawn.destroyed = true;
        let pos = pawn.pos;
        if let Some(tile) = self.board.get_mut(&pos) {
            if tile.pawn == Some(id) {
                tile.pawn = None;
            }
        }
        Some(pos)
    }

    /// Move a pawn to an empty tile, relinking both tiles.
    ///
    /// The destination must exist and be free; combat and entry hazards
    /// are the turn engine's responsibility.
    pub fn relocate_pawn(&mut self, id: PawnId, to: HexCoord) -> Result<(), GameError> {
        let from = self
            .pawns
            .get(&id)
            .filter(|p| !p.destroyed)
            .map(|p| p.pos)
            .ok_or(GameError::NoSuchPawn)?;
        match self.board.get(&to) {
            None => return Err(GameError::NoSuchTile),
            Some(tile) if tile.pawn.is_some() => return Err(GameError::TileOccupied),
            Some(_) => {}
        }
        if let Some(tile) = self.board.get_mut(&from) {
            if tile.pawn == Some(id) {
                tile.pawn = None;
            }
        }
        self.board.get_mut(&to).expect("checked above").pawn = Some(id);
        self.pawns.get_mut(&id).expect("checked above").pos = to;
        Ok(())
    }

    /// Get a player by id.
    pub fn player(&self, id: u16) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Get a mutable player by id.
    pub fn player_mut(&mut self, id: u16) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Verify the reachable-state invariants.
    ///
    /// A failure here is fatal for the session: the server terminates the
    /// game with a draw after emitting a diagnostic.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        for pawn in self.pawns.values() {
            if pawn.destroyed {
                continue;
            }
            match self.board.get(&pawn.pos) {
                Some(tile) if tile.pawn == Some(pawn.id) => {}
                _ => return Err(InvariantError::PawnTileMismatch(pawn.id)),
            }
            if pawn.range > 3 {
                return Err(InvariantError::RangeOutOfBounds(pawn.id));
            }
            if pawn.powers.values().any(|&n| n == 0) {
                return Err(InvariantError::EmptyInventoryEntry(pawn.id));
            }
        }
        for tile in self.board.tiles.values() {
            if !(MIN_HEIGHT..=2).contains(&tile.height) {
                return Err(InvariantError::HeightOutOfBounds(tile.coord));
            }
            if tile.smashed && tile.height != MIN_HEIGHT {
                return Err(InvariantError::SmashedAboveFloor(tile.coord));
            }
            if let Some(id) = tile.pawn {
                match self.pawns.get(&id) {
                    Some(pawn) if !pawn.destroyed && pawn.pos == tile.coord => {}
                    _ => return Err(InvariantError::TilePawnMismatch(tile.coord)),
                }
            }
            if tile.hill && !self.settings.king_of_the_hill {
                return Err(InvariantError::HillOutsideKoth(tile.coord));
            }
        }
        Ok(())
    }
}

/// Errors from state-level operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameError {
    NoSuchPawn,
    NoSuchTile,
    TileOccupied,
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::NoSuchPawn => write!(f, "No such pawn"),
            GameError::NoSuchTile => write!(f, "No such tile"),
            GameError::TileOccupied => write!(f, "Tile is already occupied"),
        }
    }
}

impl std::error::Error for GameError {}

/// Internal invariant violations; fatal for the hosting session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantError {
    PawnTileMismatch(PawnId),
    TilePawnMismatch(HexCoord),
    HeightOutOfBounds(HexCoord),
    SmashedAboveFloor(HexCoord),
    RangeOutOfBounds(PawnId),
    EmptyInventoryEntry(PawnId),
    HillOutsideKoth(HexCoord),
}

impl std::fmt::Display for InvariantError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantError::PawnTileMismatch(id) => {
                write!(f, "Pawn {} disagrees with its tile back-link", id)
            }
            InvariantError::TilePawnMismatch(c) => {
                write!(f, "Tile {} references a pawn that is not on it", c)
            }
            InvariantError::HeightOutOfBounds(c) => write!(f, "Tile {} height out of bounds", c),
            InvariantError::SmashedAboveFloor(c) => {
                write!(f, "Tile {} is smashed above the floor height", c)
            }
            InvariantError::RangeOutOfBounds(id) => write!(f, "Pawn {} range out of bounds", id),
            InvariantError::EmptyInventoryEntry(id) => {
                write!(f, "Pawn {} inventory holds a zero count", id)
            }
            InvariantError::HillOutsideKoth(c) => {
                write!(f, "Tile {} is a hill outside King-of-the-Hill mode", c)
            }
        }
    }
}

impl std::error::Error for InvariantError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;

    fn test_state() -> GameState {
        GameState::new(GameSettings::default(), Board::filled(6, 6), 1)
    }

    #[test]
    fn test_spawn_pawn_links_tile() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        let id = state.spawn_pawn(PlayerColour::Red, pos).unwrap();

        assert_eq!(state.board.get(&pos).unwrap().pawn, Some(id));
        assert_eq!(state.pawn_at(&pos).unwrap().id, id);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_spawn_on_occupied_tile_fails() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        state.spawn_pawn(PlayerColour::Red, pos).unwrap();
        assert!(state.spawn_pawn(PlayerColour::Blue, pos).is_none());
    }

    #[test]
    fn test_destroy_is_final() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        let id = state.spawn_pawn(PlayerColour::Red, pos).unwrap();

        assert_eq!(state.destroy_pawn(id), Some(pos));
        assert!(state.board.get(&pos).unwrap().pawn.is_none());
        assert!(state.pawns[&id].destroyed);
        assert_eq!(state.destroy_pawn(id), None);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_relocate() {
        let mut state = test_state();
        let from = HexCoord::new(2, 2);
        let to = HexCoord::new(3, 2);
        let id = state.spawn_pawn(PlayerColour::Red, from).unwrap();

        state.relocate_pawn(id, to).unwrap();
        assert!(state.board.get(&from).unwrap().pawn.is_none());
        assert_eq!(state.board.get(&to).unwrap().pawn, Some(id));
        assert_eq!(state.pawns[&id].pos, to);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_relocate_onto_occupied_fails() {
        let mut state = test_state();
        let a = state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 1)).unwrap();
        state.spawn_pawn(PlayerColour::Blue, HexCoord::new(2, 1)).unwrap();

        assert_eq!(
            state.relocate_pawn(a, HexCoord::new(2, 1)),
            Err(GameError::TileOccupied)
        );
    }

    #[test]
    fn test_player_pawns_sorted() {
        let mut state = test_state();
        state.spawn_pawn(PlayerColour::Red, HexCoord::new(4, 3)).unwrap();
        state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 1)).unwrap();
        state.spawn_pawn(PlayerColour::Blue, HexCoord::new(0, 0)).unwrap();

        let reds = state.player_pawns(PlayerColour::Red);
        assert_eq!(reds.len(), 2);
        assert_eq!(state.pawns[&reds[0]].pos, HexCoord::new(1, 1));
        assert_eq!(state.pawns[&reds[1]].pos, HexCoord::new(4, 3));
    }

    #[test]
    fn test_colours_alive() {
        let mut state = test_state();
        let red = state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 1)).unwrap();
        state.spawn_pawn(PlayerColour::Blue, HexCoord::new(2, 1)).unwrap();

        assert_eq!(state.colours_alive().len(), 2);
        state.destroy_pawn(red);
        let alive = state.colours_alive();
        assert_eq!(alive.len(), 1);
        assert!(alive.contains(&PlayerColour::Blue));
    }

    #[test]
    fn test_invariant_catches_hill_outside_koth() {
        let mut state = test_state();
        state.board.get_mut(&HexCoord::new(0, 0)).unwrap().hill = true;
        assert!(matches!(
            state.check_invariants(),
            Err(InvariantError::HillOutsideKoth(_))
        ));
    }

    #[test]
    fn test_invariant_catches_broken_backlink() {
        let mut state = test_state();
        let id = state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 1)).unwrap();
        // Corrupt the link deliberately
        state.board.get_mut(&HexCoord::new(1, 1)).unwrap().pawn = None;
        assert_eq!(
            state.check_invariants(),
            Err(InvariantError::PawnTileMismatch(id))
        );
    }
}
