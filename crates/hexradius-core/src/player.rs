//! Players and team colours.

use serde::{Deserialize, Serialize};

/// Player id of the admin: the first joiner, authorised for lobby commands.
pub const ADMIN_ID: u16 = 1;

/// Team colours. `Spectate` marks a non-playing observer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum PlayerColour {
    Red,
    Blue,
    Green,
    Yellow,
    Orange,
    Purple,
    Spectate,
}

impl PlayerColour {
    /// The six playable colours, in join-assignment order.
    pub const TEAMS: [PlayerColour; 6] = [
        PlayerColour::Red,
        PlayerColour::Blue,
        PlayerColour::Green,
        PlayerColour::Yellow,
        PlayerColour::Orange,
        PlayerColour::Purple,
    ];

    /// True for every colour that owns pawns and takes turns.
    pub const fn is_playing(&self) -> bool {
        !matches!(self, PlayerColour::Spectate)
    }
}

impl std::fmt::Display for PlayerColour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerColour::Red => write!(f, "Red"),
            PlayerColour::Blue => write!(f, "Blue"),
            PlayerColour::Green => write!(f, "Green"),
            PlayerColour::Yellow => write!(f, "Yellow"),
            PlayerColour::Orange => write!(f, "Orange"),
            PlayerColour::Purple => write!(f, "Purple"),
            PlayerColour::Spectate => write!(f, "Spectator"),
        }
    }
}

/// A participant in the session.
///
/// Each active player has a distinct `id`; multiple players may share a
/// colour only when the scenario admits it (shared-team play).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Session-unique id, assigned in join order starting at [`ADMIN_ID`].
    pub id: u16,
    /// Display name.
    pub name: String,
    /// Team colour.
    pub colour: PlayerColour,
    /// King-of-the-Hill score.
    pub score: u32,
}

impl Player {
    /// Create a new player with zero score.
    pub fn new(id: u16, name: impl Into<String>, colour: PlayerColour) -> Self {
        Self {
            id,
            name: name.into(),
            colour,
            score: 0,
        }
    }

    /// True if this player holds lobby admin rights.
    pub fn is_admin(&self) -> bool {
        self.id == ADMIN_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_colours() {
        for colour in PlayerColour::TEAMS {
            assert!(colour.is_playing());
        }
        assert!(!PlayerColour::Spectate.is_playing());
    }

    #[test]
    fn test_admin() {
        let admin = Player::new(ADMIN_ID, "alice", PlayerColour::Red);
        let other = Player::new(2, "bob", PlayerColour::Blue);
        assert!(admin.is_admin());
        assert!(!other.is_admin());
    }

    #[test]
    fn test_display() {
        assert_eq!(PlayerColour::Red.to_string(), "Red");
        assert_eq!(PlayerColour::Spectate.to_string(), "Spectator");
    }
}
