//! The authoritative turn engine and action validator.
//!
//! All state mutation funnels through [`GameEngine::handle_action`]. For a
//! legal action the engine produces the canonical outbound sequence:
//! action echo, one minimal UPDATE, the effect's animation messages, then
//! end-of-game bookkeeping and the next TURN. An illegal action produces
//! [`ActionError::BadMove`] and leaves the state untouched.

use crate::game_state::{GameState, InvariantError};
use crate::hex::{Direction, DirectionMask, HexCoord};
use crate::pawn::{PawnFlags, PawnId};
use crate::player::{Player, PlayerColour};
use crate::powers::{
    self, apply_power, EffectDelta, EffectEvent, EffectOutcome, PowerId,
};
use crate::protocol::{Message, PawnRecord, PlayerInfo, TileRecord};
use crate::scenario::Scenario;
use std::collections::BTreeSet;

/// An action proposed by a player, already decoded from the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerAction {
    Move {
        from: HexCoord,
        to: HexCoord,
    },
    Use {
        at: HexCoord,
        power: PowerId,
        direction: DirectionMask,
        target: Option<HexCoord>,
    },
    Resign,
}

/// Routing for one outbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// Broadcast verbatim to every client.
    All(Message),
    /// Broadcast after per-client visibility filtering (UPDATE, BEGIN).
    Filtered(Message),
}

/// Why an action was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionError {
    /// The game has not started or is already over.
    NotInProgress,
    /// Only the current player may act.
    NotYourTurn,
    /// The action failed validation; no state changed.
    BadMove,
    /// An internal invariant broke; the session must end with a draw.
    Fatal(InvariantError),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::NotInProgress => write!(f, "Game is not in progress"),
            ActionError::NotYourTurn => write!(f, "It is not this player's turn"),
            ActionError::BadMove => write!(f, "Illegal action"),
            ActionError::Fatal(err) => write!(f, "Internal invariant violation: {}", err),
        }
    }
}

impl std::error::Error for ActionError {}

/// The server-side turn engine.
pub struct GameEngine {
    state: GameState,
    map_name: String,
    /// Player ids in seat order.
    turn_order: Vec<u16>,
    /// Index of the current player in `turn_order`.
    current: usize,
    /// Turns until the next power spawn.
    pspawn_countdown: u32,
    /// Tiles receiving powers at the next spawn.
    pspawn_batch: u32,
    started: bool,
    over: bool,
}

impl GameEngine {
    /// Build an engine from a scenario and the seated players.
    ///
    /// Pawns of colours no player claimed are removed before the game
    /// starts, as are seats for spectators.
    pub fn new(scenario: &Scenario, players: Vec<Player>, seed: u64) -> Self {
        let mut state = scenario.into_state(seed);
        let claimed: BTreeSet<PlayerColour> = players
            .iter()
            .filter(|p| p.colour.is_playing())
            .map(|p| p.colour)
            .collect();
        let orphans: Vec<PawnId> = state
            .pawns
            .values()
            .filter(|p| !claimed.contains(&p.colour))
            .map(|p| p.id)
            .collect();
        for id in orphans {
            state.destroy_pawn(id);
        }

        let mut turn_order: Vec<u16> = players
            .iter()
            .filter(|p| p.colour.is_playing())
            .map(|p| p.id)
            .collect();
        turn_order.sort_unstable();
        state.players = players;

        Self {
            state,
            map_name: scenario.name.clone(),
            turn_order,
            current: 0,
            pspawn_countdown: 1,
            pspawn_batch: 1,
            started: false,
            over: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Direct state access for scenario setup and tests.
    ///
    /// Gameplay must go through [`Self::handle_action`]; mutating state
    /// underneath a running session forfeits the replication guarantees.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn map_name(&self) -> &str {
        &self.map_name
    }

    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Id of the player whose turn it is, if the game is running.
    pub fn current_player(&self) -> Option<u16> {
        (self.started && !self.over)
            .then(|| self.turn_order.get(self.current).copied())
            .flatten()
    }

    /// Start the game: BEGIN (to be visibility-filtered per client)
    /// followed by the first TURN.
    pub fn begin(&mut self) -> Vec<Outbound> {
        self.started = true;
        let mut out = vec![Outbound::Filtered(self.begin_message())];
        out.extend(self.next_turn(false));
        out
    }

    /// The unfiltered BEGIN payload.
    pub fn begin_message(&self) -> Message {
        let tiles = self
            .state
            .board
            .coords_sorted()
            .into_iter()
            .map(|coord| {
                let tile = self.state.board.get(&coord).expect("listed coord");
                TileRecord::from_tile(tile, self.state.pawn_at(&coord))
            })
            .collect();
        Message::Begin {
            cols: self.state.board.cols,
            rows: self.state.board.rows,
            tiles,
            players: self.player_infos(),
            colour: PlayerColour::Spectate,
        }
    }

    /// Validate and apply one action from `player_id`.
    pub fn handle_action(
        &mut self,
        player_id: u16,
        action: PlayerAction,
    ) -> Result<Vec<Outbound>, ActionError> {
        if !self.started || self.over {
            return Err(ActionError::NotInProgress);
        }
        if let PlayerAction::Resign = action {
            return Ok(self.resign(player_id, "resigned", false));
        }
        if self.current_player() != Some(player_id) {
            return Err(ActionError::NotYourTurn);
        }
        let colour = self
            .state
            .player(player_id)
            .map(|p| p.colour)
            .ok_or(ActionError::BadMove)?;

        let out = match action {
            PlayerAction::Move { from, to } => self.handle_move(colour, from, to)?,
            PlayerAction::Use {
                at,
                power,
                direction,
                target,
            } => self.handle_use(colour, at, power, direction, target)?,
            PlayerAction::Resign => unreachable!("handled above"),
        };

        if let Err(err) = self.state.check_invariants() {
            log::error!("invariant violation after action: {}", err);
            return Err(ActionError::Fatal(err));
        }
        Ok(out)
    }

    /// Forfeit a player's pawns; `announce_quit` also broadcasts PQUIT
    /// (used for disconnects and kicks, which are equivalent to RESIGN).
    pub fn resign(&mut self, player_id: u16, quit_msg: &str, announce_quit: bool) -> Vec<Outbound> {
        let mut out = Vec::new();
        let colour = match self.state.player(player_id) {
            Some(p) => p.colour,
            None => return out,
        };
        if announce_quit {
            out.push(Outbound::All(Message::PlayerQuit {
                player_id,
                quit_msg: quit_msg.to_string(),
            }));
        }

        let was_turn = self.current_player() == Some(player_id);
        if let Some(idx) = self.turn_order.iter().position(|&id| id == player_id) {
            self.turn_order.remove(idx);
            if idx < self.current {
                self.current -= 1;
            } else if self.current >= self.turn_order.len() {
                self.current = 0;
            }
        }
        self.state.players.retain(|p| p.id != player_id);

        // A shared colour keeps its pawns while a teammate remains
        let colour_still_claimed = self.state.players.iter().any(|p| p.colour == colour);
        if colour.is_playing() && !colour_still_claimed {
            for id in self.state.player_pawns(colour) {
                if let Some(at) = self.state.destroy_pawn(id) {
                    out.push(Outbound::All(Message::Destroy { at }));
                }
            }
        }

        if !self.started || self.over {
            return out;
        }
        let ended = self.check_end(&mut out);
        if !ended && was_turn {
            let turn_msgs = self.next_turn(false);
            out.extend(turn_msgs);
        }
        out
    }

    // ------------------------------------------------------------------
    // MOVE
    // ------------------------------------------------------------------

    fn handle_move(
        &mut self,
        colour: PlayerColour,
        from: HexCoord,
        to: HexCoord,
    ) -> Result<Vec<Outbound>, ActionError> {
        let (actor, jump) = self.validate_move(colour, &from, &to)?;

        let mut delta = EffectDelta::default();
        let mut absorbed = false;

        if let Some(defender) = self.state.pawn_id_at(&to) {
            // validate_move guarantees the defender is an enemy
            delta.mark_tile(from);
            delta.mark_tile(to);
            if self.state.pawns[&defender].has_flag(PawnFlags::SHIELD) {
                // The shield absorbs the attack; the attacker stays put
                let pawn = self.state.pawns.get_mut(&defender).expect("defender");
                pawn.flags.clear(PawnFlags::SHIELD);
                delta.mark_pawn(defender);
                delta.events.push(EffectEvent::Particle {
                    name: "shield_break".to_string(),
                    at: to,
                });
                absorbed = true;
            } else {
                powers::destroy_with_cascade(&mut self.state, defender, &mut delta);
            }
        }

        let actor_alive = !self.state.pawns[&actor].destroyed;
        if !absorbed && actor_alive {
            if jump {
                let pawn = self.state.pawns.get_mut(&actor).expect("actor");
                pawn.flags.clear(PawnFlags::JUMP);
                delta.mark_pawn(actor);
            }
            self.state
                .relocate_pawn(actor, to)
                .map_err(|_| ActionError::BadMove)?;
            powers::resolve_entry(&mut self.state, actor, &mut delta);
        }

        let rand_vals = self.state.rng.take_recorded();
        let mut out = vec![Outbound::All(Message::Move {
            from,
            to,
            power_rand_vals: rand_vals,
        })];

        // Under fog the endpoints ride in the UPDATE so observers gaining
        // or losing sight of the mover stay consistent
        let extra: Vec<HexCoord> = if self.state.settings.fog_of_war {
            vec![from, to]
        } else {
            Vec::new()
        };
        out.push(Outbound::Filtered(self.update_from_delta(&delta, &extra)));
        out.extend(self.event_messages(&delta));
        self.finish_turn(&mut out);
        Ok(out)
    }

    /// Check move legality without mutating anything.
    ///
    /// Returns the acting pawn and whether this is a jump move.
    fn validate_move(
        &self,
        colour: PlayerColour,
        from: &HexCoord,
        to: &HexCoord,
    ) -> Result<(PawnId, bool), ActionError> {
        let actor = self
            .state
            .pawn_id_at(from)
            .ok_or(ActionError::BadMove)?;
        let pawn = &self.state.pawns[&actor];
        if pawn.colour != colour || pawn.destroyed {
            return Err(ActionError::BadMove);
        }
        let from_tile = self.state.board.get(from).ok_or(ActionError::BadMove)?;
        let to_tile = self.state.board.get(to).ok_or(ActionError::BadMove)?;
        if to_tile.smashed || *to == *from {
            return Err(ActionError::BadMove);
        }

        let adjacent = Direction::ALL
            .iter()
            .any(|&dir| self.state.board.resolved_neighbor(from, dir) == Some(*to));
        let jump = if adjacent {
            let climb = pawn.has_flag(PawnFlags::CLIMB);
            if !climb && (to_tile.height - from_tile.height).abs() > 1 {
                return Err(ActionError::BadMove);
            }
            false
        } else if pawn.has_flag(PawnFlags::JUMP) && from.distance(to) == 2 {
            true
        } else {
            return Err(ActionError::BadMove);
        };

        if let Some(occupant) = to_tile.pawn {
            if self.state.pawns[&occupant].colour == colour {
                return Err(ActionError::BadMove);
            }
        }
        Ok((actor, jump))
    }

    // ------------------------------------------------------------------
    // USE
    // ------------------------------------------------------------------

    fn handle_use(
        &mut self,
        colour: PlayerColour,
        at: HexCoord,
        power: PowerId,
        direction: DirectionMask,
        target: Option<HexCoord>,
    ) -> Result<Vec<Outbound>, ActionError> {
        let actor = self.state.pawn_id_at(&at).ok_or(ActionError::BadMove)?;
        {
            let pawn = &self.state.pawns[&actor];
            if pawn.colour != colour || pawn.destroyed {
                return Err(ActionError::BadMove);
            }
            if pawn.powers.get(&power).copied().unwrap_or(0) == 0 {
                return Err(ActionError::BadMove);
            }
        }
        let def = powers::power(power).ok_or(ActionError::BadMove)?;
        if !direction.is_single() || !direction.is_subset_of(def.directions) {
            return Err(ActionError::BadMove);
        }
        if direction.needs_target() && target.is_none() {
            return Err(ActionError::BadMove);
        }

        // A confused pawn has its next directional action scrambled: the
        // direction bit is re-rolled from the power's mask, the target is
        // left unchanged.
        let mut direction = direction;
        let mut unconfused = false;
        if def.directions.is_directed() && self.state.pawns[&actor].has_flag(PawnFlags::CONFUSED) {
            let bits: Vec<DirectionMask> = def.directions.bits().collect();
            let pick = self.state.rng.next_range(bits.len() as u32) as usize;
            direction = bits[pick];
            let pawn = self.state.pawns.get_mut(&actor).expect("actor");
            pawn.flags.clear(PawnFlags::CONFUSED);
            unconfused = true;
        }

        let mut delta = match apply_power(&mut self.state, actor, power, direction, target) {
            EffectOutcome::Applied(delta) => delta,
            EffectOutcome::Illegal => {
                if unconfused {
                    // The scramble never took effect
                    if let Some(pawn) = self.state.pawns.get_mut(&actor) {
                        pawn.flags.set(PawnFlags::CONFUSED);
                    }
                }
                self.state.rng.take_recorded();
                return Err(ActionError::BadMove);
            }
        };

        if let Some(pawn) = self.state.pawns.get_mut(&actor) {
            pawn.take_power(power);
        }
        delta.mark_pawn(actor);
        if unconfused {
            delta.mark_pawn(actor);
        }

        let rand_vals = self.state.rng.take_recorded();
        let mut out = vec![
            Outbound::All(Message::Use {
                at,
                power,
                power_direction: direction,
                target,
                power_rand_vals: rand_vals,
            }),
            Outbound::All(Message::UsePowerNotification {
                at,
                power,
                power_direction: direction,
            }),
        ];
        out.push(Outbound::Filtered(self.update_from_delta(&delta, &[])));
        out.extend(self.event_messages(&delta));
        self.finish_turn(&mut out);
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Turn bookkeeping
    // ------------------------------------------------------------------

    /// Shared tail of every successful action: scoring, end-of-game,
    /// turn advance.
    fn finish_turn(&mut self, out: &mut Vec<Outbound>) {
        self.score_hills(out);
        if self.check_end(out) {
            return;
        }
        let msgs = self.next_turn(true);
        out.extend(msgs);
    }

    /// Accrue King-of-the-Hill points for colours holding hill tiles.
    fn score_hills(&mut self, out: &mut Vec<Outbound>) {
        if !self.state.settings.king_of_the_hill {
            return;
        }
        let holders: Vec<PlayerColour> = self
            .state
            .board
            .coords_sorted()
            .into_iter()
            .filter_map(|coord| {
                let tile = self.state.board.get(&coord)?;
                if !tile.hill {
                    return None;
                }
                self.state.pawn_at(&coord).map(|p| p.colour)
            })
            .collect();
        if holders.is_empty() {
            return;
        }
        for colour in holders {
            for player in self.state.players.iter_mut() {
                if player.colour == colour {
                    player.score += 1;
                }
            }
        }
        out.push(Outbound::All(Message::ScoreUpdate {
            players: self.player_infos(),
        }));
    }

    /// End-of-game check: last team standing, total wipeout, or a
    /// King-of-the-Hill score reaching the target. Returns true if the
    /// game ended.
    fn check_end(&mut self, out: &mut Vec<Outbound>) -> bool {
        if self.over {
            return true;
        }
        let alive = self.state.colours_alive();

        let winner = if alive.is_empty() {
            Some(None)
        } else if alive.len() == 1 {
            Some(Some(*alive.iter().next().expect("one colour")))
        } else if self.state.settings.king_of_the_hill {
            let target = self.state.settings.hill_score_target;
            self.state
                .players
                .iter()
                .find(|p| p.colour.is_playing() && p.score >= target)
                .map(|p| Some(p.colour))
        } else {
            None
        };

        match winner {
            Some(winner) => {
                self.over = true;
                out.push(Outbound::All(Message::GameOver { winner }));
                true
            }
            None => false,
        }
    }

    /// Pass the turn to the next player with live pawns, running the
    /// power spawn when its countdown reaches zero, then broadcast TURN.
    fn next_turn(&mut self, advance: bool) -> Vec<Outbound> {
        let mut out = Vec::new();
        let n = self.turn_order.len();
        if n == 0 {
            return out;
        }
        let mut idx = if advance {
            (self.current + 1) % n
        } else {
            self.current % n
        };
        for _ in 0..n {
            let id = self.turn_order[idx];
            let has_pawns = self
                .state
                .player(id)
                .map(|p| p.colour.is_playing() && !self.state.player_pawns(p.colour).is_empty())
                .unwrap_or(false);
            if has_pawns {
                break;
            }
            idx = (idx + 1) % n;
        }
        self.current = idx;

        self.pspawn_countdown = self.pspawn_countdown.saturating_sub(1);
        if self.pspawn_countdown == 0 {
            if let Some(update) = self.spawn_powers() {
                out.push(Outbound::Filtered(update));
            }
        }

        out.push(Outbound::All(Message::Turn {
            player_id: self.turn_order[self.current],
        }));
        out
    }

    /// Place freshly spawned powers on open tiles and reset the spawn
    /// counters.
    fn spawn_powers(&mut self) -> Option<Message> {
        let candidates: Vec<HexCoord> = self
            .state
            .board
            .coords_sorted()
            .into_iter()
            .filter(|c| {
                self.state
                    .board
                    .get(c)
                    .map(|t| t.is_open_for_spawn())
                    .unwrap_or(false)
            })
            .collect();
        let chosen = self.state.board.random_coords(
            &mut self.state.rng,
            candidates,
            self.pspawn_batch as usize,
        );

        self.pspawn_countdown = self.state.rng.next_range(4) + 1;
        self.pspawn_batch = self.state.rng.next_range(2) + 1;

        let mut tiles = Vec::new();
        for coord in &chosen {
            let id = powers::random_power(&mut self.state.rng);
            let tile = self.state.board.get_mut(coord).expect("candidate exists");
            tile.power = Some(id);
            tiles.push(TileRecord::from_tile(
                self.state.board.get(coord).expect("candidate exists"),
                None,
            ));
        }
        // Spawn draws are server bookkeeping, not part of any action echo
        self.state.rng.take_recorded();

        if tiles.is_empty() {
            None
        } else {
            tiles.sort_by_key(|t| t.coord);
            Some(Message::Update {
                tiles,
                pawns: Vec::new(),
            })
        }
    }

    // ------------------------------------------------------------------
    // Outbound assembly
    // ------------------------------------------------------------------

    /// Build the minimal UPDATE for an effect delta. `extra` coordinates
    /// are included as full tile records as well.
    fn update_from_delta(&self, delta: &EffectDelta, extra: &[HexCoord]) -> Message {
        let mut coords: BTreeSet<HexCoord> = delta.tiles.clone();
        coords.extend(extra.iter().copied());

        let tiles: Vec<TileRecord> = coords
            .iter()
            .filter_map(|coord| {
                let tile = self.state.board.get(coord)?;
                Some(TileRecord::from_tile(tile, self.state.pawn_at(coord)))
            })
            .collect();

        let mut pawns: Vec<PawnRecord> = delta
            .pawns
            .iter()
            .filter_map(|id| {
                let pawn = self.state.pawns.get(id)?;
                if pawn.destroyed || coords.contains(&pawn.pos) {
                    return None;
                }
                Some(PawnRecord::from_pawn(pawn))
            })
            .collect();
        pawns.sort_by_key(|p| p.pos);

        Message::Update { tiles, pawns }
    }

    /// Convert effect events into their animation/notification messages.
    fn event_messages(&self, delta: &EffectDelta) -> Vec<Outbound> {
        delta
            .events
            .iter()
            .map(|event| {
                let msg = match event {
                    EffectEvent::TileAnimation {
                        name,
                        tiles,
                        center,
                        delay_factor,
                    } => Message::TileAnimation {
                        animation_name: name.clone(),
                        tiles: tiles.clone(),
                        center: *center,
                        delay_factor: *delay_factor,
                        misc: Vec::new(),
                    },
                    EffectEvent::PawnAnimation { name, at } => Message::PawnAnimation {
                        animation_name: name.clone(),
                        at: *at,
                        misc: Vec::new(),
                    },
                    EffectEvent::Particle { name, at } => Message::ParticleAnimation {
                        animation_name: name.clone(),
                        at: *at,
                        misc: Vec::new(),
                    },
                    EffectEvent::ForceMove { from, to } => Message::ForceMove {
                        from: *from,
                        to: *to,
                    },
                    EffectEvent::PowerPickedUp { at } => {
                        Message::AddPowerNotification { at: *at }
                    }
                };
                Outbound::All(msg)
            })
            .collect()
    }

    fn player_infos(&self) -> Vec<PlayerInfo> {
        self.state.players.iter().map(PlayerInfo::from).collect()
    }

    /// Pick a legal action for a server-local AI seat: the first legal
    /// move of its first movable pawn, avoiding obvious hazards when it
    /// can. Returns `None` when the seat has no legal move left.
    pub fn ai_action(&self, player_id: u16) -> Option<PlayerAction> {
        let colour = self.state.player(player_id)?.colour;
        let mut fallback = None;
        for id in self.state.player_pawns(colour) {
            let from = self.state.pawns[&id].pos;
            for dir in Direction::ALL {
                let to = match self.state.board.resolved_neighbor(&from, dir) {
                    Some(to) => to,
                    None => continue,
                };
                if self.validate_move(colour, &from, &to).is_err() {
                    continue;
                }
                let tile = self.state.board.get(&to).expect("resolved tile");
                let hazardous =
                    tile.black_hole || tile.mine.map(|m| m != colour).unwrap_or(false);
                if hazardous {
                    fallback.get_or_insert(PlayerAction::Move { from, to });
                } else {
                    return Some(PlayerAction::Move { from, to });
                }
            }
        }
        fallback
    }
}
