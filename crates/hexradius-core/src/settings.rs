//! Game settings negotiated in the lobby.

use serde::{Deserialize, Serialize};

/// Configuration for a game session.
///
/// Lobby admin actions mutate these before BEGIN; they are immutable once
/// the game starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// Hide tiles and pawns outside each observer's sensing radius.
    pub fog_of_war: bool,
    /// King-of-the-Hill scoring mode.
    pub king_of_the_hill: bool,
    /// Score a colour must reach to win in King-of-the-Hill mode.
    pub hill_score_target: u32,
    /// Maximum participants, spectators included.
    pub max_players: u8,
}

impl GameSettings {
    /// Validate settings and return any errors.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_players < 2 {
            return Err(SettingsError::TooFewPlayers);
        }
        if self.king_of_the_hill && self.hill_score_target == 0 {
            return Err(SettingsError::ZeroHillTarget);
        }
        Ok(())
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            fog_of_war: false,
            king_of_the_hill: false,
            hill_score_target: 15,
            max_players: 8,
        }
    }
}

/// Errors from invalid game settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingsError {
    TooFewPlayers,
    ZeroHillTarget,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::TooFewPlayers => write!(f, "Need room for at least 2 players"),
            SettingsError::ZeroHillTarget => {
                write!(f, "King-of-the-Hill score target must be positive")
            }
        }
    }
}

impl std::error::Error for SettingsError {}
