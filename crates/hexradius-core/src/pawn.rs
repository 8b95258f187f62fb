//! Pawns: the movable, ownable pieces.

use crate::hex::HexCoord;
use crate::player::PlayerColour;
use crate::powers::PowerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable arena handle for a pawn.
pub type PawnId = u32;

/// Bitmask of per-pawn status flags.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PawnFlags(pub u8);

impl PawnFlags {
    pub const SHIELD: PawnFlags = PawnFlags(1 << 0);
    pub const CLIMB: PawnFlags = PawnFlags(1 << 1);
    pub const INFRAVISION: PawnFlags = PawnFlags(1 << 2);
    pub const CONFUSED: PawnFlags = PawnFlags(1 << 3);
    pub const BOMB: PawnFlags = PawnFlags(1 << 4);
    pub const INVISIBLE: PawnFlags = PawnFlags(1 << 5);
    pub const JUMP: PawnFlags = PawnFlags(1 << 6);
    pub const HAS_POWER: PawnFlags = PawnFlags(1 << 7);

    /// The beneficial subset stripped by purify powers.
    pub const GOOD: PawnFlags = PawnFlags(
        Self::SHIELD.0 | Self::CLIMB.0 | Self::INFRAVISION.0 | Self::INVISIBLE.0 | Self::JUMP.0,
    );

    pub const fn contains(&self, other: PawnFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn set(&mut self, other: PawnFlags) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self, other: PawnFlags) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for PawnFlags {
    type Output = PawnFlags;

    fn bitor(self, rhs: PawnFlags) -> PawnFlags {
        PawnFlags(self.0 | rhs.0)
    }
}

/// A playing piece belonging to a team colour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pawn {
    /// Arena handle.
    pub id: PawnId,
    /// Owning team.
    pub colour: PlayerColour,
    /// Radius used by radial powers and fog-of-war vision, 0..=3.
    pub range: u8,
    /// Status flags.
    pub flags: PawnFlags,
    /// Power inventory: power id -> count, every count > 0.
    pub powers: BTreeMap<PowerId, u32>,
    /// Coordinate of the tile this pawn stands on.
    pub pos: HexCoord,
    /// Terminal: a destroyed pawn may no longer appear on any tile.
    pub destroyed: bool,
}

impl Pawn {
    /// Create a live pawn at a position.
    pub fn new(id: PawnId, colour: PlayerColour, pos: HexCoord) -> Self {
        Self {
            id,
            colour,
            range: 0,
            flags: PawnFlags::default(),
            powers: BTreeMap::new(),
            pos,
            destroyed: false,
        }
    }

    pub fn has_flag(&self, flag: PawnFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Add one use of a power to the inventory and raise `HAS_POWER`.
    pub fn add_power(&mut self, power: PowerId) {
        *self.powers.entry(power).or_insert(0) += 1;
        self.flags.set(PawnFlags::HAS_POWER);
    }

    /// Spend one use of a power.
    ///
    /// Removes the entry when its count reaches zero and clears `HAS_POWER`
    /// once the inventory empties. Returns false if the power is not held.
    pub fn take_power(&mut self, power: PowerId) -> bool {
        match self.powers.get_mut(&power) {
            Some(count) if *count > 1 => {
                *count -= 1;
            }
            Some(_) => {
                self.powers.remove(&power);
            }
            None => return false,
        }
        if self.powers.is_empty() {
            self.flags.clear(PawnFlags::HAS_POWER);
        }
        true
    }

    /// Total number of power uses held.
    pub fn power_count(&self) -> u32 {
        self.powers.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pawn() -> Pawn {
        Pawn::new(1, PlayerColour::Red, HexCoord::new(0, 0))
    }

    #[test]
    fn test_flags_set_clear() {
        let mut flags = PawnFlags::default();
        flags.set(PawnFlags::SHIELD);
        flags.set(PawnFlags::CLIMB);
        assert!(flags.contains(PawnFlags::SHIELD));
        assert!(flags.contains(PawnFlags::CLIMB));

        flags.clear(PawnFlags::SHIELD);
        assert!(!flags.contains(PawnFlags::SHIELD));
        assert!(flags.contains(PawnFlags::CLIMB));
    }

    #[test]
    fn test_good_subset() {
        assert!(PawnFlags::GOOD.contains(PawnFlags::SHIELD));
        assert!(PawnFlags::GOOD.contains(PawnFlags::JUMP));
        assert!(!PawnFlags::GOOD.contains(PawnFlags::CONFUSED));
        assert!(!PawnFlags::GOOD.contains(PawnFlags::BOMB));
        assert!(!PawnFlags::GOOD.contains(PawnFlags::HAS_POWER));
    }

    #[test]
    fn test_add_power_sets_flag() {
        let mut pawn = test_pawn();
        assert!(!pawn.has_flag(PawnFlags::HAS_POWER));

        pawn.add_power(0);
        assert!(pawn.has_flag(PawnFlags::HAS_POWER));
        assert_eq!(pawn.powers.get(&0), Some(&1));

        pawn.add_power(0);
        assert_eq!(pawn.powers.get(&0), Some(&2));
    }

    #[test]
    fn test_take_power_decrements() {
        let mut pawn = test_pawn();
        pawn.add_power(3);
        pawn.add_power(3);

        assert!(pawn.take_power(3));
        assert_eq!(pawn.powers.get(&3), Some(&1));
        assert!(pawn.has_flag(PawnFlags::HAS_POWER));
    }

    #[test]
    fn test_take_last_power_clears_flag() {
        let mut pawn = test_pawn();
        pawn.add_power(3);

        assert!(pawn.take_power(3));
        assert!(pawn.powers.is_empty());
        assert!(!pawn.has_flag(PawnFlags::HAS_POWER));
    }

    #[test]
    fn test_take_missing_power() {
        let mut pawn = test_pawn();
        assert!(!pawn.take_power(5));
    }

    #[test]
    fn test_inventory_never_holds_zero_counts() {
        let mut pawn = test_pawn();
        pawn.add_power(1);
        pawn.add_power(2);
        pawn.take_power(1);

        assert!(pawn.powers.values().all(|&n| n > 0));
        assert_eq!(pawn.power_count(), 1);
    }
}
