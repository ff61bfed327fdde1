//! Board coordinates and algebraic notation
//!
//! The grid is stored top-down from Black's back rank:
//!
//! ```text
//!      a     b     c     d     e     f     g     h
//! 8  (0,0) (1,0) (2,0) (3,0) (4,0) (5,0) (6,0) (7,0)
//! 7  (0,1) (1,1) ...
//! ...
//! 1  (0,7) (1,7) (2,7) (3,7) (4,7) (5,7) (6,7) (7,7)
//! ```

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const BOARD_SIZE: u8 = 8;

const FILES: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("notation must be exactly two characters, got {0:?}")]
    Length(String),
    #[error("invalid file {0:?}, expected a..h")]
    File(char),
    #[error("invalid rank {0:?}, expected 1..8")]
    Rank(char),
}

/// A square on the 8x8 grid; `x` is the file, `y` counts down from rank 8
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    x: u8,
    y: u8,
}

impl Position {
    /// White's queen-side corner
    pub const A1: Position = Position { x: 0, y: 7 };
    /// Black's queen-side corner
    pub const A8: Position = Position { x: 0, y: 0 };

    /// Returns None if either coordinate is outside 0..=7
    pub fn new(x: u8, y: u8) -> Option<Self> {
        if x < BOARD_SIZE && y < BOARD_SIZE {
            Some(Self { x, y })
        } else {
            None
        }
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    /// Moves by the given deltas, clamping each axis to the board
    pub fn offset(&self, dx: i8, dy: i8) -> Self {
        let clamp = |v: u8, d: i8| (v as i8 + d).clamp(0, BOARD_SIZE as i8 - 1) as u8;
        Self {
            x: clamp(self.x, dx),
            y: clamp(self.y, dy),
        }
    }

    pub fn to_notation(&self) -> String {
        let file = FILES[self.x as usize];
        let rank = char::from(b'8' - self.y);
        format!("{}{}", file, rank)
    }

    pub fn from_notation(notation: &str) -> Result<Self, PositionError> {
        let mut chars = notation.chars();
        let (file, rank) = match (chars.next(), chars.next(), chars.next()) {
            (Some(file), Some(rank), None) => (file, rank),
            _ => return Err(PositionError::Length(notation.to_string())),
        };

        let x = FILES
            .iter()
            .position(|&f| f == file)
            .ok_or(PositionError::File(file))? as u8;

        if !('1'..='8').contains(&rank) {
            return Err(PositionError::Rank(rank));
        }
        let y = b'8' - rank as u8;

        Ok(Self { x, y })
    }

    /// All 64 squares, rank 8 first
    pub fn all() -> impl Iterator<Item = Position> {
        (0..BOARD_SIZE).flat_map(|y| (0..BOARD_SIZE).map(move |x| Position { x, y }))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_notation())
    }
}

impl FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_notation(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(x: u8, y: u8) -> Position {
        Position::new(x, y).unwrap()
    }

    #[test]
    fn test_corner_notation() {
        assert_eq!(pos(0, 0).to_notation(), "a8");
        assert_eq!(pos(0, 7).to_notation(), "a1");
        assert_eq!(pos(7, 0).to_notation(), "h8");
        assert_eq!(pos(7, 7).to_notation(), "h1");
    }

    #[test]
    fn test_diagonal_notation() {
        let expected = ["a8", "b7", "c6", "d5", "e4", "f3", "g2", "h1"];
        for (i, notation) in expected.iter().enumerate() {
            assert_eq!(pos(i as u8, i as u8).to_notation(), *notation);
            assert_eq!(Position::from_notation(notation), Ok(pos(i as u8, i as u8)));
        }
    }

    #[test]
    fn test_round_trip_all_squares() {
        for p in Position::all() {
            assert_eq!(Position::from_notation(&p.to_notation()), Ok(p));
        }
        assert_eq!(Position::all().count(), 64);
    }

    #[test]
    fn test_round_trip_all_notations() {
        for file in 'a'..='h' {
            for rank in '1'..='8' {
                let notation = format!("{}{}", file, rank);
                let p: Position = notation.parse().unwrap();
                assert_eq!(p.to_notation(), notation);
            }
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(Position::from_notation("i1"), Err(PositionError::File('i')));
        assert_eq!(Position::from_notation("A1"), Err(PositionError::File('A')));
        assert_eq!(Position::from_notation("a9"), Err(PositionError::Rank('9')));
        assert_eq!(Position::from_notation("a0"), Err(PositionError::Rank('0')));
        assert!(matches!(
            Position::from_notation("a"),
            Err(PositionError::Length(_))
        ));
        assert!(matches!(
            Position::from_notation("a1b"),
            Err(PositionError::Length(_))
        ));
        assert!(matches!(
            Position::from_notation(""),
            Err(PositionError::Length(_))
        ));
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(Position::new(8, 0).is_none());
        assert!(Position::new(0, 8).is_none());
        assert!(Position::new(7, 7).is_some());
    }

    #[test]
    fn test_offset_clamps() {
        assert_eq!(pos(0, 0).offset(-1, -1), pos(0, 0));
        assert_eq!(pos(7, 7).offset(1, 1), pos(7, 7));
        assert_eq!(pos(3, 3).offset(1, -1), pos(4, 2));
    }
}
