use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileParseError {
    #[error("string is the wrong length")]
    WrongLength,
    #[error("string starts with an invalid letter")]
    InvalidLetter,
    #[error("string end with an invalid number")]
    InvalidNumber,
}

/// A board coordinate. `x` is the numeric column, `y` is the lettered row,
/// both zero-based. Adjacency is orthogonal only.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i8,
    pub y: i8,
}

impl Position {
    pub fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    /// The four orthogonal neighbours, without bounds filtering.
    /// Positions off the board are never placed, so callers that only
    /// look at placed tiles need no extra check.
    pub fn neighbours(&self) -> [Position; 4] {
        [
            Position { x: self.x, y: self.y + 1 },
            Position { x: self.x + 1, y: self.y },
            Position { x: self.x, y: self.y - 1 },
            Position { x: self.x - 1, y: self.y },
        ]
    }
}

impl Debug for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&Tile(*self), f)
    }
}

/// A tile is identified purely by the position it occupies.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Tile(pub Position);

impl Tile {
    pub fn new(x: i8, y: i8) -> Self {
        Self(Position { x, y })
    }

    pub fn position(&self) -> Position {
        self.0
    }
}

impl TryFrom<&str> for Tile {
    type Error = TileParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.len() < 2 || value.len() > 3 {
            return Err(TileParseError::WrongLength);
        }

        let Ok(y) = map_letter_to_i8(value.chars().next().unwrap()) else {
            return Err(TileParseError::InvalidLetter);
        };

        let Ok(x) = i8::from_str(&value[1..]) else {
            return Err(TileParseError::InvalidNumber);
        };

        Ok(Tile::new(x - 1, y - 1))
    }
}

impl TryFrom<&str> for Position {
    type Error = TileParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let tile: Tile = value.try_into()?;
        Ok(tile.0)
    }
}

impl From<Tile> for Position {
    fn from(value: Tile) -> Self {
        value.0
    }
}

impl Debug for Tile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_string().as_str())
    }
}

impl Display for Tile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Ok(y) = map_i8_to_letter(self.0.y + 1) {
            f.write_fmt(format_args!("{}{}", y, self.0.x + 1))
        } else {
            f.write_fmt(format_args!("?{}", self.0.x + 1))
        }
    }
}

pub fn map_letter_to_i8(letter: char) -> Result<i8, String> {
    match letter {
        'A'..='Z' => {
            Ok((letter as u8 - b'A') as i8 + 1)
        }
        _ => Err(format!("'{letter}' is not a supported letter (must be uppercase A-Z)"))
    }
}

pub fn map_i8_to_letter(value: i8) -> Result<char, String> {
    match value {
        1..=26 => {
            Ok(char::from_u32('A' as u32 + ((value - 1) as u32)).unwrap())
        }
        _ => Err(format!("'{value}' is not in the correct range"))
    }
}


#[macro_export]
macro_rules! tile {
    ($tile:expr) => {
        $tile.try_into().expect("a valid tile string")
    };
}
