//! Hex coordinate system for the game board.
//!
//! Uses offset "odd-r" coordinates where odd rows are shifted right.
//! This matches pointy-top hexagons laid out row by row.

use serde::{Deserialize, Serialize};

/// Offset coordinates for the hex board (odd-r).
///
/// - `col` is the column (x-axis)
/// - `row` is the row (y-axis)
/// - Odd rows are shifted right by half a hex
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub struct HexCoord {
    /// Column coordinate
    pub col: i32,
    /// Row coordinate
    pub row: i32,
}

impl PartialOrd for HexCoord {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HexCoord {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Row-major ordering for deterministic iteration
        (self.row, self.col).cmp(&(other.row, other.col))
    }
}

impl HexCoord {
    /// Create a new hex coordinate.
    #[inline]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The neighbouring coordinate one step in the given direction.
    pub fn neighbor(&self, dir: Direction) -> HexCoord {
        // Odd rows are shifted right, so the diagonal columns depend on parity
        let shift = self.row & 1;
        match dir {
            Direction::East => HexCoord::new(self.col + 1, self.row),
            Direction::West => HexCoord::new(self.col - 1, self.row),
            Direction::NorthEast => HexCoord::new(self.col + shift, self.row - 1),
            Direction::NorthWest => HexCoord::new(self.col - 1 + shift, self.row - 1),
            Direction::SouthEast => HexCoord::new(self.col + shift, self.row + 1),
            Direction::SouthWest => HexCoord::new(self.col - 1 + shift, self.row + 1),
        }
    }

    /// All 6 neighbouring hexes, in `Direction::ALL` order.
    pub fn neighbors(&self) -> [HexCoord; 6] {
        let mut out = [*self; 6];
        for (i, dir) in Direction::ALL.iter().enumerate() {
            out[i] = self.neighbor(*dir);
        }
        out
    }

    /// Distance to another hex in steps.
    ///
    /// Uses cube coordinate conversion for accurate distance calculation.
    pub fn distance(&self, other: &HexCoord) -> u32 {
        let (x1, y1, z1) = self.to_cube();
        let (x2, y2, z2) = other.to_cube();

        let dx = (x1 - x2).abs();
        let dy = (y1 - y2).abs();
        let dz = (z1 - z2).abs();

        dx.max(dy).max(dz) as u32
    }

    /// Convert offset coordinates to cube coordinates.
    ///
    /// Cube coordinates satisfy x + y + z = 0 and are useful for
    /// distance calculations.
    pub fn to_cube(&self) -> (i32, i32, i32) {
        let x = self.col - (self.row - (self.row & 1)) / 2;
        let z = self.row;
        let y = -x - z;
        (x, y, z)
    }

    /// Create a HexCoord from cube coordinates.
    ///
    /// Note: Input must satisfy x + y + z = 0
    pub fn from_cube(x: i32, _y: i32, z: i32) -> Self {
        let col = x + (z - (z & 1)) / 2;
        Self { col, row: z }
    }

    /// All hexes within a given radius (inclusive), row-major sorted.
    pub fn hexes_in_radius(&self, radius: u32) -> Vec<HexCoord> {
        let mut result = Vec::new();
        let r = radius as i32;

        for drow in -r..=r {
            for dcol in -r..=r {
                let candidate = HexCoord::new(self.col + dcol, self.row + drow);
                if self.distance(&candidate) <= radius {
                    result.push(candidate);
                }
            }
        }

        result.sort();
        result
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// One of the six unit steps on the hex grid.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

impl Direction {
    /// All directions in clockwise order starting from east.
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
    ];

    /// Edge index 0..6, used by tile wrap masks.
    pub const fn edge_index(&self) -> u8 {
        match self {
            Direction::East => 0,
            Direction::SouthEast => 1,
            Direction::SouthWest => 2,
            Direction::West => 3,
            Direction::NorthWest => 4,
            Direction::NorthEast => 5,
        }
    }

    /// The opposite step.
    pub const fn opposite(&self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::SouthEast => Direction::NorthWest,
            Direction::SouthWest => Direction::NorthEast,
            Direction::West => Direction::East,
            Direction::NorthWest => Direction::SouthEast,
            Direction::NorthEast => Direction::SouthWest,
        }
    }

    /// The single-step direction bit in a [`DirectionMask`].
    pub const fn mask_bit(&self) -> DirectionMask {
        match self {
            Direction::East => DirectionMask::EAST,
            Direction::SouthEast => DirectionMask::SOUTHEAST,
            Direction::SouthWest => DirectionMask::SOUTHWEST,
            Direction::West => DirectionMask::WEST,
            Direction::NorthWest => DirectionMask::NORTHWEST,
            Direction::NorthEast => DirectionMask::NORTHEAST,
        }
    }
}

/// Bitmask describing how a power may be aimed.
///
/// A power is "directed" if its mask has more than one bit set, in which
/// case the acting player must choose one bit. `TARGETED` and `POINT`
/// consume an explicit tile argument.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DirectionMask(pub u16);

impl DirectionMask {
    pub const EAST_WEST: DirectionMask = DirectionMask(1 << 0);
    pub const NORTHEAST_SOUTHWEST: DirectionMask = DirectionMask(1 << 1);
    pub const NORTHWEST_SOUTHEAST: DirectionMask = DirectionMask(1 << 2);
    pub const EAST: DirectionMask = DirectionMask(1 << 3);
    pub const SOUTHEAST: DirectionMask = DirectionMask(1 << 4);
    pub const SOUTHWEST: DirectionMask = DirectionMask(1 << 5);
    pub const WEST: DirectionMask = DirectionMask(1 << 6);
    pub const NORTHWEST: DirectionMask = DirectionMask(1 << 7);
    pub const NORTHEAST: DirectionMask = DirectionMask(1 << 8);
    pub const RADIAL: DirectionMask = DirectionMask(1 << 9);
    pub const TARGETED: DirectionMask = DirectionMask(1 << 10);
    pub const POINT: DirectionMask = DirectionMask(1 << 11);
    pub const UNDIRECTED: DirectionMask = DirectionMask(1 << 12);

    /// The three whole-line axes.
    pub const ROWS: DirectionMask = DirectionMask(
        Self::EAST_WEST.0 | Self::NORTHEAST_SOUTHWEST.0 | Self::NORTHWEST_SOUTHEAST.0,
    );

    /// True if any of `other`'s bits are set in this mask.
    pub const fn contains(&self, other: DirectionMask) -> bool {
        self.0 & other.0 != 0
    }

    /// True if `other` is a subset of this mask.
    pub const fn is_subset_of(&self, other: DirectionMask) -> bool {
        self.0 & other.0 == self.0
    }

    /// Number of set bits.
    pub const fn bit_count(&self) -> u32 {
        self.0.count_ones()
    }

    /// True if exactly one bit is set.
    pub const fn is_single(&self) -> bool {
        self.0.count_ones() == 1
    }

    /// True if the acting player must choose between several bits.
    pub const fn is_directed(&self) -> bool {
        self.0.count_ones() > 1
    }

    /// True if this bit requires an explicit tile argument.
    pub const fn needs_target(&self) -> bool {
        self.contains(DirectionMask::TARGETED) || self.contains(DirectionMask::POINT)
    }

    /// Iterate the single-bit masks set in this mask.
    pub fn bits(&self) -> impl Iterator<Item = DirectionMask> + '_ {
        let value = self.0;
        (0..13).filter_map(move |i| {
            let bit = 1u16 << i;
            (value & bit != 0).then_some(DirectionMask(bit))
        })
    }

    /// The pair of unit steps for a line-axis bit, if this is one.
    pub fn axis_directions(&self) -> Option<(Direction, Direction)> {
        match *self {
            DirectionMask::EAST_WEST => Some((Direction::East, Direction::West)),
            DirectionMask::NORTHEAST_SOUTHWEST => {
                Some((Direction::NorthEast, Direction::SouthWest))
            }
            DirectionMask::NORTHWEST_SOUTHEAST => {
                Some((Direction::NorthWest, Direction::SouthEast))
            }
            _ => None,
        }
    }

    /// The unit step for a single-direction bit, if this is one.
    pub fn step_direction(&self) -> Option<Direction> {
        match *self {
            DirectionMask::EAST => Some(Direction::East),
            DirectionMask::SOUTHEAST => Some(Direction::SouthEast),
            DirectionMask::SOUTHWEST => Some(Direction::SouthWest),
            DirectionMask::WEST => Some(Direction::West),
            DirectionMask::NORTHWEST => Some(Direction::NorthWest),
            DirectionMask::NORTHEAST => Some(Direction::NorthEast),
            _ => None,
        }
    }
}

impl std::ops::BitOr for DirectionMask {
    type Output = DirectionMask;

    fn bitor(self, rhs: DirectionMask) -> DirectionMask {
        DirectionMask(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let coord = HexCoord::new(3, 5);
        assert_eq!(coord.col, 3);
        assert_eq!(coord.row, 5);
    }

    #[test]
    fn test_distance_same_hex() {
        let coord = HexCoord::new(5, 5);
        assert_eq!(coord.distance(&coord), 0);
    }

    #[test]
    fn test_distance_neighbors() {
        for start in [HexCoord::new(5, 5), HexCoord::new(4, 4)] {
            for neighbor in start.neighbors() {
                assert_eq!(start.distance(&neighbor), 1);
            }
        }
    }

    #[test]
    fn test_neighbors_distinct() {
        let coord = HexCoord::new(3, 3);
        let neighbors = coord.neighbors();
        for (i, a) in neighbors.iter().enumerate() {
            for b in neighbors.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_opposite_round_trip() {
        let coord = HexCoord::new(7, 4);
        for dir in Direction::ALL {
            let there = coord.neighbor(dir);
            assert_eq!(there.neighbor(dir.opposite()), coord);
        }
    }

    #[test]
    fn test_hexes_in_radius() {
        let center = HexCoord::new(5, 5);
        let radius_0 = center.hexes_in_radius(0);
        assert_eq!(radius_0.len(), 1);
        assert!(radius_0.contains(&center));

        let radius_1 = center.hexes_in_radius(1);
        assert_eq!(radius_1.len(), 7); // center + 6 neighbors
    }

    #[test]
    fn test_hexes_in_radius_sorted() {
        let center = HexCoord::new(5, 5);
        let hexes = center.hexes_in_radius(2);
        let mut sorted = hexes.clone();
        sorted.sort();
        assert_eq!(hexes, sorted);
    }

    #[test]
    fn test_cube_roundtrip() {
        for coord in [HexCoord::new(7, 3), HexCoord::new(0, 0), HexCoord::new(2, 5)] {
            let (x, y, z) = coord.to_cube();
            assert_eq!(x + y + z, 0);
            assert_eq!(HexCoord::from_cube(x, y, z), coord);
        }
    }

    #[test]
    fn test_display() {
        let coord = HexCoord::new(3, 7);
        assert_eq!(format!("{}", coord), "(3, 7)");
    }

    #[test]
    fn test_mask_directed() {
        assert!(DirectionMask::ROWS.is_directed());
        assert!(!DirectionMask::RADIAL.is_directed());
        assert!(DirectionMask::UNDIRECTED.is_single());
    }

    #[test]
    fn test_mask_subset() {
        assert!(DirectionMask::EAST_WEST.is_subset_of(DirectionMask::ROWS));
        assert!(!DirectionMask::RADIAL.is_subset_of(DirectionMask::ROWS));
    }

    #[test]
    fn test_mask_bits_iteration() {
        let bits: Vec<_> = DirectionMask::ROWS.bits().collect();
        assert_eq!(bits.len(), 3);
        assert!(bits.iter().all(|b| b.is_single()));
    }

    #[test]
    fn test_axis_directions() {
        let (a, b) = DirectionMask::EAST_WEST.axis_directions().unwrap();
        assert_eq!(a.opposite(), b);
        assert!(DirectionMask::RADIAL.axis_directions().is_none());
    }

    #[test]
    fn test_edge_index_unique() {
        let mut seen = [false; 6];
        for dir in Direction::ALL {
            let idx = dir.edge_index() as usize;
            assert!(!seen[idx]);
            seen[idx] = true;
        }
    }
}
