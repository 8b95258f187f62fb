//! HexRadius Core Library
//!
//! This crate contains the authoritative game core for HexRadius, a
//! turn-based multiplayer game on a hexagonal board: pawns move, pick up
//! randomly spawned powers, and spend them to reshape the board or remove
//! each other.
//!
//! # Design Principles
//!
//! - **No I/O dependencies**: This crate is purely game logic; transports
//!   and renderers are collaborators
//! - **Deterministic**: one server-owned RNG whose consumed prefix is
//!   replayed to clients
//! - **Serializable**: all state and wire messages travel via serde
//! - **Server-authoritative**: clients mirror state and never mutate it
//!   except by applying received deltas

// Board geometry
pub mod board;
pub mod hex;
pub mod tile;

// Pieces and participants
pub mod pawn;
pub mod player;

// Game state and configuration
pub mod game_state;
pub mod rng;
pub mod settings;

// Scenarios
pub mod scenario;

// The power system
pub mod powers;

// Turn protocol and validation
pub mod engine;

// Wire messages
pub mod protocol;

// Fog of war
pub mod visibility;

// Re-exports for convenience
pub use board::Board;
pub use engine::{ActionError, GameEngine, Outbound, PlayerAction};
pub use game_state::{GameError, GameState, InvariantError};
pub use hex::{Direction, DirectionMask, HexCoord};
pub use pawn::{Pawn, PawnFlags, PawnId};
pub use player::{Player, PlayerColour, ADMIN_ID};
pub use powers::{
    apply_power, power, random_power, EffectDelta, EffectEvent, EffectOutcome, EntryOutcome,
    PowerDef, PowerId, PowerKind, POWERS,
};
pub use protocol::{AnimArg, AnimValue, Message, PawnRecord, PlayerInfo, TileRecord};
pub use rng::GameRng;
pub use scenario::{Scenario, ScenarioError};
pub use settings::{GameSettings, SettingsError};
pub use tile::{EdgeMask, Tile, MAX_HEIGHT, MIN_HEIGHT};
pub use visibility::VisibilityFilter;
