//! The board: tile storage and spatial queries.

use crate::hex::{Direction, DirectionMask, HexCoord};
use crate::rng::GameRng;
use crate::tile::Tile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The set of tiles making up a scenario's board.
///
/// Boards are irregular: any coordinate may be a hole. `cols`/`rows` are
/// the extents declared by the scenario, kept for clients laying out the
/// view.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    /// Declared column extent.
    pub cols: u32,
    /// Declared row extent.
    pub rows: u32,
    /// All tiles indexed by coordinate. No two tiles share a coordinate.
    pub tiles: HashMap<HexCoord, Tile>,
}

impl Board {
    /// Create an empty board with the given extents.
    pub fn new(cols: u32, rows: u32) -> Self {
        Self {
            cols,
            rows,
            tiles: HashMap::new(),
        }
    }

    /// Create a full rectangular board at height 0 (useful for testing).
    pub fn filled(cols: u32, rows: u32) -> Self {
        let mut board = Self::new(cols, rows);
        for row in 0..rows as i32 {
            for col in 0..cols as i32 {
                let coord = HexCoord::new(col, row);
                board.tiles.insert(coord, Tile::new(coord, 0));
            }
        }
        board
    }

    /// Get a tile at the given coordinate.
    pub fn get(&self, coord: &HexCoord) -> Option<&Tile> {
        self.tiles.get(coord)
    }

    /// Get a mutable reference to a tile.
    pub fn get_mut(&mut self, coord: &HexCoord) -> Option<&mut Tile> {
        self.tiles.get_mut(coord)
    }

    /// Insert or replace a tile at its own coordinate.
    pub fn set(&mut self, tile: Tile) {
        self.tiles.insert(tile.coord, tile);
    }

    /// Count total tiles on the board.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// All coordinates, row-major sorted for deterministic iteration.
    pub fn coords_sorted(&self) -> Vec<HexCoord> {
        let mut coords: Vec<HexCoord> = self.tiles.keys().copied().collect();
        coords.sort();
        coords
    }

    /// Existing neighbours of a coordinate, in `Direction::ALL` order.
    pub fn neighbors(&self, coord: &HexCoord) -> Vec<HexCoord> {
        coord
            .neighbors()
            .into_iter()
            .filter(|c| self.tiles.contains_key(c))
            .collect()
    }

    /// Resolve one step from a tile, following a wrap edge if the direct
    /// neighbour is missing and the tile's wrap mask covers that edge.
    ///
    /// A wrap step re-enters the board at the far end of the same line.
    /// Returns `None` when the step leaves the board for good or wraps
    /// back onto the starting tile.
    pub fn resolved_neighbor(&self, from: &HexCoord, dir: Direction) -> Option<HexCoord> {
        let direct = from.neighbor(dir);
        if self.tiles.contains_key(&direct) {
            return Some(direct);
        }
        let tile = self.get(from)?;
        if !tile.wrap.has(dir) {
            return None;
        }
        let target = self.line_end(from, dir.opposite());
        (target != *from).then_some(target)
    }

    /// The last existing tile walking from `from` in `dir`.
    fn line_end(&self, from: &HexCoord, dir: Direction) -> HexCoord {
        let mut cur = *from;
        loop {
            let next = cur.neighbor(dir);
            if !self.tiles.contains_key(&next) {
                return cur;
            }
            cur = next;
        }
    }

    /// Tiles on the infinite line from `from` in one direction, respecting
    /// wrap edges. Excludes `from`; terminates when the walk leaves the
    /// board or loops back to its start.
    pub fn line_coords(&self, from: &HexCoord, dir: Direction) -> Vec<HexCoord> {
        let mut out = Vec::new();
        let mut cur = *from;
        loop {
            let next = match self.resolved_neighbor(&cur, dir) {
                Some(next) => next,
                None => break,
            };
            if next == *from || out.contains(&next) {
                break;
            }
            out.push(next);
            cur = next;
        }
        out
    }

    /// Tiles on the whole line through `through` along a line-axis bit,
    /// including `through` itself, row-major sorted.
    pub fn axis_coords(&self, through: &HexCoord, axis: DirectionMask) -> Vec<HexCoord> {
        let mut out = vec![*through];
        if let Some((fwd, back)) = axis.axis_directions() {
            out.extend(self.line_coords(through, fwd));
            out.extend(self.line_coords(through, back));
        }
        out.retain(|c| self.tiles.contains_key(c));
        out.sort();
        out.dedup();
        out
    }

    /// Existing tiles within hex distance `radius` of `center`, including
    /// the center, row-major sorted.
    pub fn radial_coords(&self, center: &HexCoord, radius: u32) -> Vec<HexCoord> {
        center
            .hexes_in_radius(radius)
            .into_iter()
            .filter(|c| self.tiles.contains_key(c))
            .collect()
    }

    /// Pick `n` coordinates uniformly without replacement.
    ///
    /// `candidates` must already be deterministically ordered; draws come
    /// from the server RNG so the selection replays identically.
    pub fn random_coords(
        &self,
        rng: &mut GameRng,
        mut candidates: Vec<HexCoord>,
        n: usize,
    ) -> Vec<HexCoord> {
        let mut out = Vec::new();
        while !candidates.is_empty() && out.len() < n {
            let idx = rng.next_range(candidates.len() as u32) as usize;
            out.push(candidates.remove(idx));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::EdgeMask;

    #[test]
    fn test_board_creation() {
        let board = Board::filled(6, 6);
        assert_eq!(board.tile_count(), 36);
        assert!(board.get(&HexCoord::new(5, 5)).is_some());
        assert!(board.get(&HexCoord::new(6, 0)).is_none());
    }

    #[test]
    fn test_neighbors_at_edge() {
        let board = Board::filled(6, 6);
        assert_eq!(board.neighbors(&HexCoord::new(3, 3)).len(), 6);
        assert!(board.neighbors(&HexCoord::new(0, 0)).len() < 6);
    }

    #[test]
    fn test_line_coords_east() {
        let board = Board::filled(6, 6);
        let line = board.line_coords(&HexCoord::new(2, 3), Direction::East);
        assert_eq!(
            line,
            vec![HexCoord::new(3, 3), HexCoord::new(4, 3), HexCoord::new(5, 3)]
        );
    }

    #[test]
    fn test_axis_includes_origin_and_is_sorted() {
        let board = Board::filled(6, 6);
        let axis = board.axis_coords(&HexCoord::new(2, 3), DirectionMask::EAST_WEST);
        assert_eq!(axis.len(), 6);
        assert!(axis.contains(&HexCoord::new(2, 3)));
        let mut sorted = axis.clone();
        sorted.sort();
        assert_eq!(axis, sorted);
    }

    #[test]
    fn test_diagonal_axis() {
        let board = Board::filled(6, 6);
        let axis = board.axis_coords(&HexCoord::new(2, 2), DirectionMask::NORTHWEST_SOUTHEAST);
        assert!(axis.contains(&HexCoord::new(2, 2)));
        assert!(axis.len() > 1);
        // Every tile on the axis is reachable by stepping the two directions
        for coord in &axis {
            assert!(board.get(coord).is_some());
        }
    }

    #[test]
    fn test_radial_coords() {
        let board = Board::filled(8, 8);
        let center = HexCoord::new(4, 4);
        let radius_1 = board.radial_coords(&center, 1);
        assert_eq!(radius_1.len(), 7);
        assert!(radius_1.contains(&center));
    }

    #[test]
    fn test_radial_respects_holes() {
        let mut board = Board::filled(8, 8);
        let hole = HexCoord::new(4, 5);
        board.tiles.remove(&hole);

        let radius_1 = board.radial_coords(&HexCoord::new(4, 4), 1);
        assert_eq!(radius_1.len(), 6);
        assert!(!radius_1.contains(&hole));
    }

    #[test]
    fn test_wrap_edge_continues_line() {
        let mut board = Board::filled(6, 1);
        // Wrap the east edge of the last tile back to the west side
        board
            .get_mut(&HexCoord::new(5, 0))
            .unwrap()
            .wrap
            .set(Direction::East);

        let next = board.resolved_neighbor(&HexCoord::new(5, 0), Direction::East);
        assert_eq!(next, Some(HexCoord::new(0, 0)));

        // The line from (2,0) east covers the rest of the row, wraps, and
        // stops before revisiting its start
        let line = board.line_coords(&HexCoord::new(2, 0), Direction::East);
        assert_eq!(
            line,
            vec![
                HexCoord::new(3, 0),
                HexCoord::new(4, 0),
                HexCoord::new(5, 0),
                HexCoord::new(0, 0),
                HexCoord::new(1, 0),
            ]
        );
    }

    #[test]
    fn test_no_wrap_stops_at_edge() {
        let board = Board::filled(6, 1);
        assert_eq!(
            board.resolved_neighbor(&HexCoord::new(5, 0), Direction::East),
            None
        );
    }

    #[test]
    fn test_wrap_to_self_is_none() {
        let mut board = Board::new(1, 1);
        let coord = HexCoord::new(0, 0);
        let mut tile = Tile::new(coord, 0);
        tile.wrap = EdgeMask::of(Direction::East);
        board.set(tile);

        assert_eq!(board.resolved_neighbor(&coord, Direction::East), None);
    }

    #[test]
    fn test_random_coords_unique() {
        let board = Board::filled(4, 4);
        let mut rng = GameRng::from_seed(3);
        let picked = board.random_coords(&mut rng, board.coords_sorted(), 5);
        assert_eq!(picked.len(), 5);
        let mut dedup = picked.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 5);
    }

    #[test]
    fn test_random_coords_exhausts_candidates() {
        let board = Board::filled(2, 1);
        let mut rng = GameRng::from_seed(3);
        let picked = board.random_coords(&mut rng, board.coords_sorted(), 10);
        assert_eq!(picked.len(), 2);
    }
}
