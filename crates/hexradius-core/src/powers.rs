//! The power catalogue and its effects on game state.
//!
//! Powers are a closed variant set dispatched through [`apply_power`];
//! adding a power means extending [`PowerKind`] and the static [`POWERS`]
//! table. Every effect is a pure function over `(GameState, actor,
//! direction, target)` returning [`EffectOutcome`], and records which tiles
//! and pawns it mutated so the validator can build a minimal update.

use crate::game_state::GameState;
use crate::hex::{DirectionMask, HexCoord};
use crate::pawn::{PawnFlags, PawnId};
use crate::rng::GameRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Index into the [`POWERS`] table.
pub type PowerId = u8;

/// The closed set of power behaviours.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PowerKind {
    DestroyRow,
    DestroyRadial,
    RaiseTile,
    LowerTile,
    Elevate,
    Dig,
    ElevateRadial,
    DigRadial,
    IncreaseRange,
    Climb,
    Shield,
    Infravision,
    Bomb,
    Confuse,
    Invisible,
    Jump,
    PurifyRow,
    PurifyRadial,
    Teleport,
}

/// One catalogue entry.
pub struct PowerDef {
    /// Menu name.
    pub name: &'static str,
    /// How this power may be aimed.
    pub directions: DirectionMask,
    /// Relative weight when spawning pickups.
    pub spawn_weight: u32,
    /// Effect behaviour.
    pub kind: PowerKind,
}

/// The static power catalogue, keyed by [`PowerId`].
pub const POWERS: &[PowerDef] = &[
    PowerDef {
        name: "Destroy row",
        directions: DirectionMask::ROWS,
        spawn_weight: 50,
        kind: PowerKind::DestroyRow,
    },
    PowerDef {
        name: "Destroy radial",
        directions: DirectionMask::RADIAL,
        spawn_weight: 35,
        kind: PowerKind::DestroyRadial,
    },
    PowerDef {
        name: "Raise tile",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 70,
        kind: PowerKind::RaiseTile,
    },
    PowerDef {
        name: "Lower tile",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 70,
        kind: PowerKind::LowerTile,
    },
    PowerDef {
        name: "Elevate row",
        directions: DirectionMask::ROWS,
        spawn_weight: 35,
        kind: PowerKind::Elevate,
    },
    PowerDef {
        name: "Dig row",
        directions: DirectionMask::ROWS,
        spawn_weight: 35,
        kind: PowerKind::Dig,
    },
    PowerDef {
        name: "Elevate radial",
        directions: DirectionMask::RADIAL,
        spawn_weight: 20,
        kind: PowerKind::ElevateRadial,
    },
    PowerDef {
        name: "Dig radial",
        directions: DirectionMask::RADIAL,
        spawn_weight: 20,
        kind: PowerKind::DigRadial,
    },
    PowerDef {
        name: "Increase range",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 40,
        kind: PowerKind::IncreaseRange,
    },
    PowerDef {
        name: "Hover",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 35,
        kind: PowerKind::Climb,
    },
    PowerDef {
        name: "Shield",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 40,
        kind: PowerKind::Shield,
    },
    PowerDef {
        name: "Infravision",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 20,
        kind: PowerKind::Infravision,
    },
    PowerDef {
        name: "Bomb",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 20,
        kind: PowerKind::Bomb,
    },
    PowerDef {
        name: "Confuse",
        directions: DirectionMask::TARGETED,
        spawn_weight: 20,
        kind: PowerKind::Confuse,
    },
    PowerDef {
        name: "Invisibility",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 20,
        kind: PowerKind::Invisible,
    },
    PowerDef {
        name: "Jump",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 25,
        kind: PowerKind::Jump,
    },
    PowerDef {
        name: "Purify row",
        directions: DirectionMask::ROWS,
        spawn_weight: 20,
        kind: PowerKind::PurifyRow,
    },
    PowerDef {
        name: "Purify radial",
        directions: DirectionMask::RADIAL,
        spawn_weight: 15,
        kind: PowerKind::PurifyRadial,
    },
    PowerDef {
        name: "Teleport",
        directions: DirectionMask::UNDIRECTED,
        spawn_weight: 25,
        kind: PowerKind::Teleport,
    },
];

/// Look up a catalogue entry.
pub fn power(id: PowerId) -> Option<&'static PowerDef> {
    POWERS.get(id as usize)
}

/// Draw a power id weighted by `spawn_weight`.
pub fn random_power(rng: &mut GameRng) -> PowerId {
    let total: u32 = POWERS.iter().map(|p| p.spawn_weight).sum();
    let mut roll = rng.next_range(total);
    for (id, def) in POWERS.iter().enumerate() {
        if roll < def.spawn_weight {
            return id as PowerId;
        }
        roll -= def.spawn_weight;
    }
    (POWERS.len() - 1) as PowerId
}

/// Animation and notification triggers requested by an effect.
///
/// Pure data; the renderer is a collaborator that consumes them and the
/// core never blocks on animation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectEvent {
    TileAnimation {
        name: String,
        tiles: Vec<HexCoord>,
        center: HexCoord,
        /// Per-tile start delay scales with hex distance from `center`.
        delay_factor: f32,
    },
    PawnAnimation {
        name: String,
        at: HexCoord,
    },
    Particle {
        name: String,
        at: HexCoord,
    },
    /// Server-initiated relocation (teleport, wrap traversal).
    ForceMove {
        from: HexCoord,
        to: HexCoord,
    },
    PowerPickedUp {
        at: HexCoord,
    },
}

/// Everything one effect changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectDelta {
    /// Coordinates of mutated tiles, deterministically ordered.
    pub tiles: BTreeSet<HexCoord>,
    /// Handles of mutated (or destroyed) pawns.
    pub pawns: BTreeSet<PawnId>,
    /// Requested animation events, in emission order.
    pub events: Vec<EffectEvent>,
}

impl EffectDelta {
    pub fn mark_tile(&mut self, coord: HexCoord) {
        self.tiles.insert(coord);
    }

    pub fn mark_pawn(&mut self, id: PawnId) {
        self.pawns.insert(id);
    }

    /// Fold another delta into this one.
    pub fn merge(&mut self, other: EffectDelta) {
        self.tiles.extend(other.tiles);
        self.pawns.extend(other.pawns);
        self.events.extend(other.events);
    }
}

/// Result of applying a power.
#[derive(Clone, Debug, PartialEq)]
pub enum EffectOutcome {
    Applied(EffectDelta),
    Illegal,
}

/// The radius a pawn's radial powers (and bomb detonation) cover.
fn radial_radius(range: u8) -> u32 {
    range as u32 + 1
}

/// Apply a power's effect.
///
/// `dir` must be a single bit; ownership and inventory checks are the turn
/// validator's job, while aim validity is checked here. Mutation follows
/// the row-major order of affected tiles; on one tile, pawn destruction
/// precedes terrain change.
pub fn apply_power(
    state: &mut GameState,
    actor: PawnId,
    power_id: PowerId,
    dir: DirectionMask,
    target: Option<HexCoord>,
) -> EffectOutcome {
    let def = match power(power_id) {
        Some(def) => def,
        None => return EffectOutcome::Illegal,
    };
    if !dir.is_single() || !dir.is_subset_of(def.directions) {
        return EffectOutcome::Illegal;
    }
    if dir.needs_target() && target.is_none() {
        return EffectOutcome::Illegal;
    }
    let (pos, colour, range) = match state.pawns.get(&actor) {
        Some(pawn) if !pawn.destroyed => (pawn.pos, pawn.colour, pawn.range),
        _ => return EffectOutcome::Illegal,
    };

    let mut delta = EffectDelta::default();
    let changed = match def.kind {
        PowerKind::DestroyRow => {
            let coords = state.board.axis_coords(&pos, dir);
            destroy_enemies(state, colour, &coords, &mut delta)
        }
        PowerKind::DestroyRadial => {
            let coords = state.board.radial_coords(&pos, radial_radius(range));
            destroy_enemies(state, colour, &coords, &mut delta)
        }
        PowerKind::RaiseTile => raise_tiles(state, &[pos], &mut delta),
        PowerKind::LowerTile => lower_tiles(state, &[pos], &mut delta),
        PowerKind::Elevate => {
            let coords = state.board.axis_coords(&pos, dir);
            let changed = raise_tiles(state, &coords, &mut delta);
            if changed {
                delta.events.push(tile_animation("elevate", &coords, pos));
            }
            changed
        }
        PowerKind::Dig => {
            let coords = state.board.axis_coords(&pos, dir);
            let changed = lower_tiles(state, &coords, &mut delta);
            if changed {
                delta.events.push(tile_animation("dig", &coords, pos));
            }
            changed
        }
        PowerKind::ElevateRadial => {
            let coords = state.board.radial_coords(&pos, radial_radius(range));
            let changed = raise_tiles(state, &coords, &mut delta);
            if changed {
                delta.events.push(tile_animation("elevate", &coords, pos));
            }
            changed
        }
        PowerKind::DigRadial => {
            let coords = state.board.radial_coords(&pos, radial_radius(range));
            let changed = lower_tiles(state, &coords, &mut delta);
            if changed {
                delta.events.push(tile_animation("dig", &coords, pos));
            }
            changed
        }
        PowerKind::IncreaseRange => {
            let pawn = state.pawns.get_mut(&actor).expect("actor checked");
            if pawn.range < 3 {
                pawn.range += 1;
                delta.mark_pawn(actor);
                true
            } else {
                false
            }
        }
        PowerKind::Climb => set_flag(state, actor, PawnFlags::CLIMB, &mut delta),
        PowerKind::Shield => set_flag(state, actor, PawnFlags::SHIELD, &mut delta),
        PowerKind::Infravision => set_flag(state, actor, PawnFlags::INFRAVISION, &mut delta),
        PowerKind::Bomb => set_flag(state, actor, PawnFlags::BOMB, &mut delta),
        PowerKind::Invisible => set_flag(state, actor, PawnFlags::INVISIBLE, &mut delta),
        PowerKind::Jump => set_flag(state, actor, PawnFlags::JUMP, &mut delta),
        PowerKind::Confuse => {
            let target = target.expect("targeted bit checked");
            match state.pawn_id_at(&target) {
                Some(victim) => {
                    let pawn = state.pawns.get_mut(&victim).expect("tile link");
                    if pawn.colour == colour || pawn.has_flag(PawnFlags::CONFUSED) {
                        false
                    } else {
                        pawn.flags.set(PawnFlags::CONFUSED);
                        delta.mark_pawn(victim);
                        delta.events.push(EffectEvent::PawnAnimation {
                            name: "confuse".to_string(),
                            at: target,
                        });
                        true
                    }
                }
                None => false,
            }
        }
        PowerKind::PurifyRow => {
            let coords = state.board.axis_coords(&pos, dir);
            purify(state, colour, &coords, &mut delta)
        }
        PowerKind::PurifyRadial => {
            let coords = state.board.radial_coords(&pos, radial_radius(range));
            purify(state, colour, &coords, &mut delta)
        }
        PowerKind::Teleport => teleport(state, actor, &mut delta),
    };

    if changed {
        EffectOutcome::Applied(delta)
    } else {
        EffectOutcome::Illegal
    }
}

fn tile_animation(name: &str, coords: &[HexCoord], center: HexCoord) -> EffectEvent {
    EffectEvent::TileAnimation {
        name: name.to_string(),
        tiles: coords.to_vec(),
        center,
        delay_factor: 0.2,
    }
}

/// Set a flag on the actor; re-using an already-set flag is illegal.
fn set_flag(state: &mut GameState, actor: PawnId, flag: PawnFlags, delta: &mut EffectDelta) -> bool {
    let pawn = state.pawns.get_mut(&actor).expect("actor checked");
    if pawn.has_flag(flag) {
        false
    } else {
        pawn.flags.set(flag);
        delta.mark_pawn(actor);
        true
    }
}

/// Destroy every enemy pawn on the given tiles. A shielded enemy loses
/// its shield instead of dying.
fn destroy_enemies(
    state: &mut GameState,
    colour: crate::player::PlayerColour,
    coords: &[HexCoord],
    delta: &mut EffectDelta,
) -> bool {
    let mut changed = false;
    for coord in coords {
        if let Some(victim) = state.pawn_id_at(coord) {
            if state.pawns[&victim].colour != colour {
                hit_pawn(state, victim, delta);
                changed = true;
            }
        }
    }
    changed
}

/// Apply a destroying hit: shield absorbs, otherwise the pawn dies (with
/// bomb cascade).
pub(crate) fn hit_pawn(state: &mut GameState, victim: PawnId, delta: &mut EffectDelta) {
    let pawn = state.pawns.get_mut(&victim).expect("victim exists");
    if pawn.has_flag(PawnFlags::SHIELD) {
        pawn.flags.clear(PawnFlags::SHIELD);
        delta.mark_pawn(victim);
        delta.events.push(EffectEvent::Particle {
            name: "shield_break".to_string(),
            at: pawn.pos,
        });
    } else {
        destroy_with_cascade(state, victim, delta);
    }
}

/// Destroy a pawn outright; a carried bomb detonates, radially hitting
/// enemies of the bomb's owner. Resolved breadth-first so chained bombs
/// terminate.
pub(crate) fn destroy_with_cascade(state: &mut GameState, id: PawnId, delta: &mut EffectDelta) {
    let mut queue = VecDeque::from([id]);
    while let Some(victim) = queue.pop_front() {
        let (flags, range, colour) = match state.pawns.get(&victim) {
            Some(p) if !p.destroyed => (p.flags, p.range, p.colour),
            _ => continue,
        };
        let pos = match state.destroy_pawn(victim) {
            Some(pos) => pos,
            None => continue,
        };
        delta.mark_pawn(victim);
        delta.mark_tile(pos);

        if flags.contains(PawnFlags::BOMB) {
            delta.events.push(EffectEvent::Particle {
                name: "explosion".to_string(),
                at: pos,
            });
            for coord in state.board.radial_coords(&pos, radial_radius(range)) {
                if let Some(other) = state.pawn_id_at(&coord) {
                    if state.pawns[&other].colour == colour {
                        continue;
                    }
                    let other_pawn = state.pawns.get_mut(&other).expect("tile link");
                    if other_pawn.has_flag(PawnFlags::SHIELD) {
                        other_pawn.flags.clear(PawnFlags::SHIELD);
                        delta.mark_pawn(other);
                        delta.events.push(EffectEvent::Particle {
                            name: "shield_break".to_string(),
                            at: coord,
                        });
                    } else {
                        queue.push_back(other);
                    }
                }
            }
        }
    }
}

/// Raise each tile one step. Smashing and raising follow the row-major
/// order of `coords`.
fn raise_tiles(state: &mut GameState, coords: &[HexCoord], delta: &mut EffectDelta) -> bool {
    let mut changed = false;
    for coord in coords {
        if let Some(tile) = state.board.get_mut(coord) {
            if tile.raise() {
                delta.mark_tile(*coord);
                changed = true;
            }
        }
    }
    changed
}

/// Lower each tile one step. A tile smashed under a pawn destroys the
/// pawn first, then the terrain collapses (a shield does not help against
/// the floor giving way).
fn lower_tiles(state: &mut GameState, coords: &[HexCoord], delta: &mut EffectDelta) -> bool {
    let mut changed = false;
    for coord in coords {
        let will_smash = match state.board.get(coord) {
            Some(tile) => tile.height == crate::tile::MIN_HEIGHT && !tile.smashed,
            None => continue,
        };
        if will_smash {
            if let Some(victim) = state.pawn_id_at(coord) {
                destroy_with_cascade(state, victim, delta);
            }
        }
        if let Some(tile) = state.board.get_mut(coord) {
            if tile.lower() {
                delta.mark_tile(*coord);
                changed = true;
            }
        }
    }
    changed
}

/// Strip the good-flag subset from enemy pawns on the given tiles.
fn purify(
    state: &mut GameState,
    colour: crate::player::PlayerColour,
    coords: &[HexCoord],
    delta: &mut EffectDelta,
) -> bool {
    let mut changed = false;
    for coord in coords {
        if let Some(victim) = state.pawn_id_at(coord) {
            let pawn = state.pawns.get_mut(&victim).expect("tile link");
            if pawn.colour != colour && pawn.flags.contains(PawnFlags::GOOD) {
                pawn.flags.clear(PawnFlags::GOOD);
                delta.mark_pawn(victim);
                delta.events.push(EffectEvent::Particle {
                    name: "purify".to_string(),
                    at: *coord,
                });
                changed = true;
            }
        }
    }
    changed
}

/// Teleport the actor to a random same-colour landing pad, or to a
/// uniformly random empty tile when no pad is free.
fn teleport(state: &mut GameState, actor: PawnId, delta: &mut EffectDelta) -> bool {
    let (from, colour) = {
        let pawn = &state.pawns[&actor];
        (pawn.pos, pawn.colour)
    };

    let mut pads: Vec<HexCoord> = state
        .board
        .tiles
        .values()
        .filter(|t| t.landing_pad == Some(colour) && t.pawn.is_none() && !t.smashed)
        .map(|t| t.coord)
        .collect();
    pads.sort();

    let candidates = if pads.is_empty() {
        let mut open: Vec<HexCoord> = state
            .board
            .tiles
            .values()
            .filter(|t| t.pawn.is_none() && !t.smashed)
            .map(|t| t.coord)
            .collect();
        open.sort();
        open
    } else {
        pads
    };

    if candidates.is_empty() {
        return false;
    }
    let dest = candidates[state.rng.next_range(candidates.len() as u32) as usize];
    if state.relocate_pawn(actor, dest).is_err() {
        return false;
    }
    delta.mark_tile(from);
    delta.mark_tile(dest);
    delta.mark_pawn(actor);
    delta.events.push(EffectEvent::ForceMove { from, to: dest });
    delta.events.push(EffectEvent::PawnAnimation {
        name: "teleport".to_string(),
        at: dest,
    });

    // Arriving by teleport triggers the same entry hazards as a move
    resolve_entry(state, actor, delta);
    true
}

/// What happened to a pawn entering a tile.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntryOutcome {
    Survived,
    Destroyed,
}

/// Resolve the hazards and pickups of the tile a pawn just entered:
/// enemy mines (shield absorbs), black holes, then power pickups.
pub fn resolve_entry(state: &mut GameState, id: PawnId, delta: &mut EffectDelta) -> EntryOutcome {
    let (pos, colour) = match state.pawns.get(&id) {
        Some(p) if !p.destroyed => (p.pos, p.colour),
        _ => return EntryOutcome::Destroyed,
    };

    let mine = state.board.get(&pos).and_then(|t| t.mine);
    if let Some(mine_colour) = mine {
        if mine_colour != colour {
            let tile = state.board.get_mut(&pos).expect("pawn stands here");
            tile.mine = None;
            delta.mark_tile(pos);
            delta.events.push(EffectEvent::Particle {
                name: "mine".to_string(),
                at: pos,
            });
            hit_pawn(state, id, delta);
            if state.pawns[&id].destroyed {
                return EntryOutcome::Destroyed;
            }
        }
    }

    let black_hole = state.board.get(&pos).map(|t| t.black_hole).unwrap_or(false);
    if black_hole {
        delta.events.push(EffectEvent::PawnAnimation {
            name: "black_hole".to_string(),
            at: pos,
        });
        destroy_with_cascade(state, id, delta);
        return EntryOutcome::Destroyed;
    }

    let has_power = state.board.get(&pos).map(|t| t.has_power()).unwrap_or(false);
    if has_power {
        let drawn = random_power(&mut state.rng);
        let tile = state.board.get_mut(&pos).expect("pawn stands here");
        tile.power = None;
        delta.mark_tile(pos);
        let pawn = state.pawns.get_mut(&id).expect("pawn alive");
        pawn.add_power(drawn);
        delta.mark_pawn(id);
        delta.events.push(EffectEvent::PowerPickedUp { at: pos });
    }

    EntryOutcome::Survived
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::player::PlayerColour;
    use crate::settings::GameSettings;
    use crate::tile::{MAX_HEIGHT, MIN_HEIGHT};

    fn test_state() -> GameState {
        GameState::new(GameSettings::default(), Board::filled(8, 8), 5)
    }

    fn undirected() -> DirectionMask {
        DirectionMask::UNDIRECTED
    }

    #[test]
    fn test_catalogue_direction_masks() {
        for def in POWERS {
            assert!(def.directions.bit_count() >= 1, "{} has no aim", def.name);
            assert!(def.spawn_weight > 0, "{} cannot spawn", def.name);
        }
    }

    #[test]
    fn test_random_power_in_range() {
        let mut rng = GameRng::from_seed(17);
        for _ in 0..200 {
            let id = random_power(&mut rng);
            assert!((id as usize) < POWERS.len());
        }
    }

    #[test]
    fn test_destroy_row_spares_own_and_shields() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 3)).unwrap();
        let friend = state.spawn_pawn(PlayerColour::Red, HexCoord::new(3, 3)).unwrap();
        let enemy = state.spawn_pawn(PlayerColour::Blue, HexCoord::new(4, 3)).unwrap();
        let shielded = state.spawn_pawn(PlayerColour::Blue, HexCoord::new(6, 3)).unwrap();
        state.pawns.get_mut(&shielded).unwrap().flags.set(PawnFlags::SHIELD);

        let outcome = apply_power(&mut state, actor, 0, DirectionMask::EAST_WEST, None);
        let delta = match outcome {
            EffectOutcome::Applied(delta) => delta,
            EffectOutcome::Illegal => panic!("destroy row should apply"),
        };

        assert!(!state.pawns[&friend].destroyed);
        assert!(state.pawns[&enemy].destroyed);
        assert!(!state.pawns[&shielded].destroyed);
        assert!(!state.pawns[&shielded].has_flag(PawnFlags::SHIELD));
        assert!(delta.pawns.contains(&enemy));
        assert!(delta.pawns.contains(&shielded));
    }

    #[test]
    fn test_destroy_row_with_no_enemies_is_illegal() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 3)).unwrap();
        assert_eq!(
            apply_power(&mut state, actor, 0, DirectionMask::EAST_WEST, None),
            EffectOutcome::Illegal
        );
    }

    #[test]
    fn test_destroy_row_rejects_radial_aim() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 3)).unwrap();
        state.spawn_pawn(PlayerColour::Blue, HexCoord::new(4, 3)).unwrap();
        assert_eq!(
            apply_power(&mut state, actor, 0, DirectionMask::RADIAL, None),
            EffectOutcome::Illegal
        );
    }

    #[test]
    fn test_raise_at_top_is_illegal() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        let actor = state.spawn_pawn(PlayerColour::Red, pos).unwrap();
        state.board.get_mut(&pos).unwrap().height = MAX_HEIGHT;

        assert_eq!(
            apply_power(&mut state, actor, 2, undirected(), None),
            EffectOutcome::Illegal
        );
    }

    #[test]
    fn test_lower_at_floor_smashes_and_applies() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        let actor = state.spawn_pawn(PlayerColour::Red, pos).unwrap();
        state.board.get_mut(&pos).unwrap().height = MIN_HEIGHT;

        let outcome = apply_power(&mut state, actor, 3, undirected(), None);
        assert!(matches!(outcome, EffectOutcome::Applied(_)));
        assert!(state.board.get(&pos).unwrap().smashed);
        // The floor gave way under the actor
        assert!(state.pawns[&actor].destroyed);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_increase_range_caps_at_three() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(2, 2)).unwrap();

        for expect in 1..=3u8 {
            assert!(matches!(
                apply_power(&mut state, actor, 8, undirected(), None),
                EffectOutcome::Applied(_)
            ));
            assert_eq!(state.pawns[&actor].range, expect);
        }
        assert_eq!(
            apply_power(&mut state, actor, 8, undirected(), None),
            EffectOutcome::Illegal
        );
    }

    #[test]
    fn test_flag_powers_idempotence() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(2, 2)).unwrap();

        // Hover twice: second use is illegal
        assert!(matches!(
            apply_power(&mut state, actor, 9, undirected(), None),
            EffectOutcome::Applied(_)
        ));
        assert!(state.pawns[&actor].has_flag(PawnFlags::CLIMB));
        assert_eq!(
            apply_power(&mut state, actor, 9, undirected(), None),
            EffectOutcome::Illegal
        );
    }

    #[test]
    fn test_confuse_requires_enemy_target() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(2, 2)).unwrap();
        let friend_pos = HexCoord::new(3, 2);
        let enemy_pos = HexCoord::new(4, 2);
        state.spawn_pawn(PlayerColour::Red, friend_pos).unwrap();
        let enemy = state.spawn_pawn(PlayerColour::Blue, enemy_pos).unwrap();

        assert_eq!(
            apply_power(&mut state, actor, 13, DirectionMask::TARGETED, None),
            EffectOutcome::Illegal
        );
        assert_eq!(
            apply_power(&mut state, actor, 13, DirectionMask::TARGETED, Some(friend_pos)),
            EffectOutcome::Illegal
        );
        assert!(matches!(
            apply_power(&mut state, actor, 13, DirectionMask::TARGETED, Some(enemy_pos)),
            EffectOutcome::Applied(_)
        ));
        assert!(state.pawns[&enemy].has_flag(PawnFlags::CONFUSED));
    }

    #[test]
    fn test_purify_strips_good_flags_only() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 3)).unwrap();
        let enemy = state.spawn_pawn(PlayerColour::Blue, HexCoord::new(4, 3)).unwrap();
        {
            let pawn = state.pawns.get_mut(&enemy).unwrap();
            pawn.flags.set(PawnFlags::SHIELD);
            pawn.flags.set(PawnFlags::CLIMB);
            pawn.flags.set(PawnFlags::CONFUSED);
        }

        assert!(matches!(
            apply_power(&mut state, actor, 16, DirectionMask::EAST_WEST, None),
            EffectOutcome::Applied(_)
        ));
        let pawn = &state.pawns[&enemy];
        assert!(!pawn.has_flag(PawnFlags::SHIELD));
        assert!(!pawn.has_flag(PawnFlags::CLIMB));
        assert!(pawn.has_flag(PawnFlags::CONFUSED));
    }

    #[test]
    fn test_teleport_prefers_landing_pads() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(0, 0)).unwrap();
        let pad = HexCoord::new(5, 5);
        state.board.get_mut(&pad).unwrap().landing_pad = Some(PlayerColour::Red);
        // An enemy pad must not attract the teleport
        state.board.get_mut(&HexCoord::new(6, 6)).unwrap().landing_pad = Some(PlayerColour::Blue);

        let outcome = apply_power(&mut state, actor, 18, undirected(), None);
        assert!(matches!(outcome, EffectOutcome::Applied(_)));
        assert_eq!(state.pawns[&actor].pos, pad);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_teleport_without_pads_lands_somewhere_open() {
        let mut state = test_state();
        let start = HexCoord::new(0, 0);
        let actor = state.spawn_pawn(PlayerColour::Red, start).unwrap();

        let outcome = apply_power(&mut state, actor, 18, undirected(), None);
        assert!(matches!(outcome, EffectOutcome::Applied(_)));
        let pos = state.pawns[&actor].pos;
        assert_ne!(pos, start);
        assert!(!state.board.get(&pos).unwrap().smashed);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_bomb_cascade() {
        let mut state = test_state();
        let actor = state.spawn_pawn(PlayerColour::Red, HexCoord::new(1, 3)).unwrap();
        let bomber = state.spawn_pawn(PlayerColour::Blue, HexCoord::new(3, 3)).unwrap();
        // Red bystander adjacent to the bomber dies to the blast
        let bystander = state.spawn_pawn(PlayerColour::Red, HexCoord::new(3, 2)).unwrap();
        state.pawns.get_mut(&bomber).unwrap().flags.set(PawnFlags::BOMB);

        let outcome = apply_power(&mut state, actor, 0, DirectionMask::EAST_WEST, None);
        assert!(matches!(outcome, EffectOutcome::Applied(_)));
        assert!(state.pawns[&bomber].destroyed);
        assert!(state.pawns[&bystander].destroyed);
        assert!(!state.pawns[&actor].destroyed);
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_entry_mine_consumes_shield() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        let id = state.spawn_pawn(PlayerColour::Red, pos).unwrap();
        state.pawns.get_mut(&id).unwrap().flags.set(PawnFlags::SHIELD);
        state.board.get_mut(&pos).unwrap().mine = Some(PlayerColour::Blue);

        let mut delta = EffectDelta::default();
        assert_eq!(resolve_entry(&mut state, id, &mut delta), EntryOutcome::Survived);
        assert!(!state.pawns[&id].has_flag(PawnFlags::SHIELD));
        assert!(state.board.get(&pos).unwrap().mine.is_none());
    }

    #[test]
    fn test_entry_own_mine_is_safe() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        let id = state.spawn_pawn(PlayerColour::Red, pos).unwrap();
        state.board.get_mut(&pos).unwrap().mine = Some(PlayerColour::Red);

        let mut delta = EffectDelta::default();
        assert_eq!(resolve_entry(&mut state, id, &mut delta), EntryOutcome::Survived);
        assert!(state.board.get(&pos).unwrap().mine.is_some());
    }

    #[test]
    fn test_entry_black_hole_destroys() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        let id = state.spawn_pawn(PlayerColour::Red, pos).unwrap();
        state.board.get_mut(&pos).unwrap().black_hole = true;

        let mut delta = EffectDelta::default();
        assert_eq!(resolve_entry(&mut state, id, &mut delta), EntryOutcome::Destroyed);
        assert!(state.pawns[&id].destroyed);
    }

    #[test]
    fn test_entry_pickup_adds_power() {
        let mut state = test_state();
        let pos = HexCoord::new(2, 2);
        let id = state.spawn_pawn(PlayerColour::Red, pos).unwrap();
        state.board.get_mut(&pos).unwrap().power = Some(0);

        let mut delta = EffectDelta::default();
        assert_eq!(resolve_entry(&mut state, id, &mut delta), EntryOutcome::Survived);
        let pawn = &state.pawns[&id];
        assert_eq!(pawn.power_count(), 1);
        assert!(pawn.has_flag(PawnFlags::HAS_POWER));
        assert!(!state.board.get(&pos).unwrap().has_power());
        // The draw is recorded for replay
        assert!(state.rng.recorded_len() > 0);
    }
}
