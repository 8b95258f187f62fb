//! Board cells and their terrain state.

use crate::hex::{Direction, HexCoord};
use crate::pawn::PawnId;
use crate::player::PlayerColour;
use crate::powers::PowerId;
use serde::{Deserialize, Serialize};

/// Lowest and highest legal tile heights.
pub const MIN_HEIGHT: i8 = -2;
pub const MAX_HEIGHT: i8 = 2;

/// Bitmask over the six hex edges, used for wrap markers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeMask(pub u8);

impl EdgeMask {
    pub const NONE: EdgeMask = EdgeMask(0);

    /// The mask with only this direction's edge set.
    pub const fn of(dir: Direction) -> EdgeMask {
        EdgeMask(1 << dir.edge_index())
    }

    pub const fn has(&self, dir: Direction) -> bool {
        self.0 & (1 << dir.edge_index()) != 0
    }

    pub fn set(&mut self, dir: Direction) {
        self.0 |= 1 << dir.edge_index();
    }
}

/// One hex cell of the board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    /// Position on the board.
    pub coord: HexCoord,
    /// Vertical elevation, [`MIN_HEIGHT`]..=[`MAX_HEIGHT`].
    pub height: i8,
    /// Lowered past the floor; permanently impassable.
    pub smashed: bool,
    /// Power pickup sitting on this tile.
    pub power: Option<PowerId>,
    /// Mine, triggering on entry by another colour.
    pub mine: Option<PlayerColour>,
    /// Landing pad marking a safe teleport destination for its colour.
    pub landing_pad: Option<PlayerColour>,
    /// Black hole consuming entering pawns.
    pub black_hole: bool,
    /// Eye granting its owner local vision through fog.
    pub eye: Option<PlayerColour>,
    /// Edges that teleport a traversing pawn to the matching edge elsewhere.
    pub wrap: EdgeMask,
    /// Scoring tile in King-of-the-Hill mode.
    pub hill: bool,
    /// The pawn standing here, if any (at most one).
    pub pawn: Option<PawnId>,
}

impl Tile {
    /// Create a plain tile at the given height.
    pub fn new(coord: HexCoord, height: i8) -> Self {
        Self {
            coord,
            height,
            smashed: false,
            power: None,
            mine: None,
            landing_pad: None,
            black_hole: false,
            eye: None,
            wrap: EdgeMask::NONE,
            hill: false,
            pawn: None,
        }
    }

    /// Set the height if the new value is in range and different.
    ///
    /// Returns true when the tile changed.
    pub fn set_height(&mut self, height: i8) -> bool {
        if height != self.height && (MIN_HEIGHT..=MAX_HEIGHT).contains(&height) {
            self.height = height;
            true
        } else {
            false
        }
    }

    /// Raise the tile one step. Returns true when the tile changed.
    pub fn raise(&mut self) -> bool {
        self.set_height(self.height + 1)
    }

    /// Lower the tile one step.
    ///
    /// Lowering a tile already at the floor smashes it instead. Returns
    /// true when the tile changed.
    pub fn lower(&mut self) -> bool {
        if self.height == MIN_HEIGHT {
            if self.smashed {
                false
            } else {
                self.smashed = true;
                true
            }
        } else {
            self.set_height(self.height - 1)
        }
    }

    pub fn has_power(&self) -> bool {
        self.power.is_some()
    }

    /// True if a power may spawn here: no pawn, no power, not smashed.
    pub fn is_open_for_spawn(&self) -> bool {
        self.pawn.is_none() && self.power.is_none() && !self.smashed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_at_height(height: i8) -> Tile {
        Tile::new(HexCoord::new(0, 0), height)
    }

    #[test]
    fn test_set_height_bounds() {
        let mut tile = tile_at_height(0);
        assert!(tile.set_height(2));
        assert!(!tile.set_height(3));
        assert!(tile.set_height(-2));
        assert!(!tile.set_height(-3));
        assert!(!tile.set_height(-2)); // unchanged value
    }

    #[test]
    fn test_raise_clamped_at_top() {
        let mut tile = tile_at_height(MAX_HEIGHT);
        assert!(!tile.raise());
        assert_eq!(tile.height, MAX_HEIGHT);
    }

    #[test]
    fn test_lower_at_floor_smashes() {
        let mut tile = tile_at_height(MIN_HEIGHT);
        assert!(!tile.smashed);
        assert!(tile.lower());
        assert!(tile.smashed);
        assert_eq!(tile.height, MIN_HEIGHT);

        // Smashing is final; lowering again is a no-op
        assert!(!tile.lower());
    }

    #[test]
    fn test_raise_then_lower_restores() {
        let mut tile = tile_at_height(0);
        assert!(tile.raise());
        assert!(tile.lower());
        assert_eq!(tile.height, 0);
        assert!(!tile.smashed);
    }

    #[test]
    fn test_open_for_spawn() {
        let mut tile = tile_at_height(0);
        assert!(tile.is_open_for_spawn());

        tile.power = Some(0);
        assert!(!tile.is_open_for_spawn());
        tile.power = None;

        tile.pawn = Some(1);
        assert!(!tile.is_open_for_spawn());
        tile.pawn = None;

        tile.height = MIN_HEIGHT;
        tile.lower();
        assert!(!tile.is_open_for_spawn());
    }

    #[test]
    fn test_edge_mask() {
        let mut mask = EdgeMask::NONE;
        assert!(!mask.has(Direction::East));

        mask.set(Direction::East);
        mask.set(Direction::NorthWest);
        assert!(mask.has(Direction::East));
        assert!(mask.has(Direction::NorthWest));
        assert!(!mask.has(Direction::West));

        assert_eq!(EdgeMask::of(Direction::East).0, 1);
    }
}
