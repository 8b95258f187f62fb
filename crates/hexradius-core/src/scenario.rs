//! Scenario files: the human-editable board descriptions in `scenario/`.
//!
//! A scenario is a line-oriented keyword list. `#` starts a comment and
//! blank lines are ignored:
//!
//! ```text
//! GRID 6 6
//! TILE 0 0 0
//! SPAWN 0 0 red
//! HEIGHT 3 3 2
//! POWER 2 2
//! MINE 4 4 blue
//! PAD 5 5 red
//! HOLE 3 1
//! EYE 1 4 red
//! WRAP 0 3 8
//! HILL 3 3
//! MODE fog on
//! ```

use crate::board::Board;
use crate::game_state::GameState;
use crate::hex::HexCoord;
use crate::player::PlayerColour;
use crate::settings::GameSettings;
use crate::tile::{EdgeMask, Tile, MAX_HEIGHT, MIN_HEIGHT};
use std::collections::BTreeSet;
use std::path::Path;

/// A parsed scenario: the initial board plus the team colours it admits.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    /// Map name (the file stem).
    pub name: String,
    /// Mode flags declared by the scenario.
    pub settings: GameSettings,
    /// The initial board, without pawns.
    pub board: Board,
    /// Pawn placements, in file order.
    pub spawns: Vec<(HexCoord, PlayerColour)>,
}

impl Scenario {
    /// Parse a scenario from text.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Scenario, ScenarioError> {
        let mut board: Option<Board> = None;
        let mut settings = GameSettings::default();
        let mut spawns: Vec<(HexCoord, PlayerColour)> = Vec::new();
        let mut has_hill = false;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let fields: Vec<&str> = content.split_whitespace().collect();
            let key = fields[0].to_ascii_uppercase();

            match key.as_str() {
                "GRID" => {
                    let cols = parse_num::<u32>(&fields, 1, line)?;
                    let rows = parse_num::<u32>(&fields, 2, line)?;
                    if board.is_some() {
                        return Err(ScenarioError::DuplicateGrid { line });
                    }
                    board = Some(Board::new(cols, rows));
                }
                "TILE" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    let height = parse_num::<i8>(&fields, 3, line)?;
                    if !(MIN_HEIGHT..=MAX_HEIGHT).contains(&height) {
                        return Err(ScenarioError::HeightOutOfRange { line, height });
                    }
                    if board.get(&coord).is_some() {
                        return Err(ScenarioError::DuplicateTile { line, coord });
                    }
                    board.set(Tile::new(coord, height));
                }
                "SPAWN" => {
                    let board = board.as_ref().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    let colour = parse_colour(&fields, 3, line)?;
                    if board.get(&coord).is_none() {
                        return Err(ScenarioError::PawnOffBoard { line, coord });
                    }
                    if spawns.iter().any(|(c, _)| *c == coord) {
                        return Err(ScenarioError::DuplicatePawn { line, coord });
                    }
                    spawns.push((coord, colour));
                }
                "HEIGHT" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    let height = parse_num::<i8>(&fields, 3, line)?;
                    if !(MIN_HEIGHT..=MAX_HEIGHT).contains(&height) {
                        return Err(ScenarioError::HeightOutOfRange { line, height });
                    }
                    tile_mut(board, coord, line)?.height = height;
                }
                "POWER" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    // Identity is drawn at pickup; mark presence only
                    tile_mut(board, coord, line)?.power = Some(0);
                }
                "MINE" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    let colour = parse_colour(&fields, 3, line)?;
                    tile_mut(board, coord, line)?.mine = Some(colour);
                }
                "PAD" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    let colour = parse_colour(&fields, 3, line)?;
                    tile_mut(board, coord, line)?.landing_pad = Some(colour);
                }
                "HOLE" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    tile_mut(board, coord, line)?.black_hole = true;
                }
                "EYE" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    let colour = parse_colour(&fields, 3, line)?;
                    tile_mut(board, coord, line)?.eye = Some(colour);
                }
                "WRAP" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    let mask = parse_num::<u8>(&fields, 3, line)?;
                    if mask >= 1 << 6 {
                        return Err(ScenarioError::Syntax { line });
                    }
                    tile_mut(board, coord, line)?.wrap = EdgeMask(mask);
                }
                "HILL" => {
                    let board = board.as_mut().ok_or(ScenarioError::MissingGrid)?;
                    let coord = parse_coord(&fields, line)?;
                    tile_mut(board, coord, line)?.hill = true;
                    has_hill = true;
                }
                "MODE" => {
                    let mode = fields.get(1).ok_or(ScenarioError::Syntax { line })?;
                    let value = match fields.get(2).copied() {
                        Some("on") => true,
                        Some("off") => false,
                        _ => return Err(ScenarioError::Syntax { line }),
                    };
                    match mode.to_ascii_lowercase().as_str() {
                        "fog" => settings.fog_of_war = value,
                        "koth" => settings.king_of_the_hill = value,
                        _ => {
                            return Err(ScenarioError::UnknownKey {
                                line,
                                key: mode.to_string(),
                            })
                        }
                    }
                }
                _ => return Err(ScenarioError::UnknownKey { line, key }),
            }
        }

        let board = board.ok_or(ScenarioError::MissingGrid)?;
        if has_hill && !settings.king_of_the_hill {
            return Err(ScenarioError::HillWithoutKoth);
        }
        if spawns.is_empty() {
            return Err(ScenarioError::NoPawns);
        }

        Ok(Scenario {
            name: name.into(),
            settings,
            board,
            spawns,
        })
    }

    /// Load a scenario file; the map name is the file stem.
    pub fn load(path: impl AsRef<Path>) -> Result<Scenario, ScenarioError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|err| ScenarioError::Io(err.to_string()))?;
        Scenario::parse(name, &text)
    }

    /// The team colours this scenario admits.
    pub fn colours(&self) -> BTreeSet<PlayerColour> {
        self.spawns.iter().map(|(_, colour)| *colour).collect()
    }

    /// Build the initial authoritative state.
    pub fn into_state(&self, seed: u64) -> GameState {
        let mut state = GameState::new(self.settings.clone(), self.board.clone(), seed);
        for (coord, colour) in &self.spawns {
            // Placements were validated during parsing
            let _ = state.spawn_pawn(*colour, *coord);
        }
        state
    }
}

fn tile_mut<'a>(
    board: &'a mut Board,
    coord: HexCoord,
    line: usize,
) -> Result<&'a mut Tile, ScenarioError> {
    board
        .get_mut(&coord)
        .ok_or(ScenarioError::NoSuchTile { line, coord })
}

fn parse_num<T: std::str::FromStr>(
    fields: &[&str],
    idx: usize,
    line: usize,
) -> Result<T, ScenarioError> {
    fields
        .get(idx)
        .and_then(|s| s.parse().ok())
        .ok_or(ScenarioError::Syntax { line })
}

fn parse_coord(fields: &[&str], line: usize) -> Result<HexCoord, ScenarioError> {
    let col = parse_num::<i32>(fields, 1, line)?;
    let row = parse_num::<i32>(fields, 2, line)?;
    Ok(HexCoord::new(col, row))
}

fn parse_colour(fields: &[&str], idx: usize, line: usize) -> Result<PlayerColour, ScenarioError> {
    let name = fields.get(idx).ok_or(ScenarioError::Syntax { line })?;
    match name.to_ascii_lowercase().as_str() {
        "red" => Ok(PlayerColour::Red),
        "blue" => Ok(PlayerColour::Blue),
        "green" => Ok(PlayerColour::Green),
        "yellow" => Ok(PlayerColour::Yellow),
        "orange" => Ok(PlayerColour::Orange),
        "purple" => Ok(PlayerColour::Purple),
        _ => Err(ScenarioError::BadColour {
            line,
            name: name.to_string(),
        }),
    }
}

/// Errors from malformed scenario files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScenarioError {
    Io(String),
    MissingGrid,
    DuplicateGrid { line: usize },
    Syntax { line: usize },
    UnknownKey { line: usize, key: String },
    HeightOutOfRange { line: usize, height: i8 },
    DuplicateTile { line: usize, coord: HexCoord },
    NoSuchTile { line: usize, coord: HexCoord },
    PawnOffBoard { line: usize, coord: HexCoord },
    DuplicatePawn { line: usize, coord: HexCoord },
    BadColour { line: usize, name: String },
    HillWithoutKoth,
    NoPawns,
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::Io(err) => write!(f, "Could not read scenario: {}", err),
            ScenarioError::MissingGrid => write!(f, "Scenario has no GRID declaration"),
            ScenarioError::DuplicateGrid { line } => {
                write!(f, "Line {}: GRID declared twice", line)
            }
            ScenarioError::Syntax { line } => write!(f, "Line {}: malformed fields", line),
            ScenarioError::UnknownKey { line, key } => {
                write!(f, "Line {}: unknown key '{}'", line, key)
            }
            ScenarioError::HeightOutOfRange { line, height } => {
                write!(f, "Line {}: height {} out of range", line, height)
            }
            ScenarioError::DuplicateTile { line, coord } => {
                write!(f, "Line {}: duplicate tile at {}", line, coord)
            }
            ScenarioError::NoSuchTile { line, coord } => {
                write!(f, "Line {}: no tile at {}", line, coord)
            }
            ScenarioError::PawnOffBoard { line, coord } => {
                write!(f, "Line {}: pawn placed on nonexistent tile {}", line, coord)
            }
            ScenarioError::DuplicatePawn { line, coord } => {
                write!(f, "Line {}: second pawn on tile {}", line, coord)
            }
            ScenarioError::BadColour { line, name } => {
                write!(f, "Line {}: unknown colour '{}'", line, name)
            }
            ScenarioError::HillWithoutKoth => {
                write!(f, "Scenario declares HILL tiles without MODE koth on")
            }
            ScenarioError::NoPawns => write!(f, "Scenario places no pawns"),
        }
    }
}

impl std::error::Error for ScenarioError {}
