//! Chess legality and outcome, delegated to an external rules engine
//!
//! The game never decides legality on its own. Everything the players do on
//! the board is checked against a `RulesEngine`, and the UI board is only
//! mutated after the engine has accepted the move.

use shakmaty::san::San;
use shakmaty::{Chess, File, Move, Rank, Role, Square};
use shared::{Cell, Color, Piece, PieceKind, Position};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

// Both crates call it Position
use shakmaty::Position as _;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("malformed move string {0:?}")]
    Malformed(String),
    #[error("illegal move {0}")]
    Illegal(String),
}

/// A legal move as reported by the engine, in `<from><to>[promotion]` form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineMove {
    pub from: Position,
    pub to: Position,
    pub promotion: Option<PieceKind>,
}

impl fmt::Display for EngineMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(kind) = self.promotion {
            f.write_str(match kind {
                PieceKind::Knight => "n",
                PieceKind::Bishop => "b",
                PieceKind::Rook => "r",
                _ => "q",
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    SeventyFiveMoveRule,
    FivefoldRepetition,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Checkmate => "checkmate",
            Method::Stalemate => "stalemate",
            Method::InsufficientMaterial => "insufficient material",
            Method::SeventyFiveMoveRule => "seventy-five move rule",
            Method::FivefoldRepetition => "fivefold repetition",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoOutcome,
    Decisive { winner: Color, method: Method },
    Draw { method: Method },
}

impl Outcome {
    pub fn is_over(&self) -> bool {
        !matches!(self, Outcome::NoOutcome)
    }

    pub fn method(&self) -> Option<Method> {
        match self {
            Outcome::NoOutcome => None,
            Outcome::Decisive { method, .. } | Outcome::Draw { method } => Some(*method),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NoOutcome => f.write_str("*"),
            Outcome::Decisive {
                winner: Color::White,
                ..
            } => f.write_str("1-0"),
            Outcome::Decisive {
                winner: Color::Black,
                ..
            } => f.write_str("0-1"),
            Outcome::Draw { .. } => f.write_str("1/2-1/2"),
        }
    }
}

pub trait RulesEngine: Send + Sync {
    fn valid_moves(&self) -> Vec<EngineMove>;

    /// Applies a move written as `<from><to>[promotion]`
    fn submit_move(&mut self, mv: &str) -> Result<(), RulesError>;

    fn outcome(&self) -> Outcome;

    /// Human readable list of every move played so far
    fn move_record(&self) -> String;

    fn cell_at(&self, pos: Position) -> Cell;

    /// Side to move
    fn turn(&self) -> Color;
}

/// Standard chess backed by shakmaty
pub struct ShakmatyEngine {
    position: Chess,
    san_moves: Vec<String>,
    repetitions: HashMap<String, u32>,
}

impl ShakmatyEngine {
    pub fn new() -> Self {
        let position = Chess::default();
        let mut repetitions = HashMap::new();
        repetitions.insert(repetition_key(&position), 1);
        Self {
            position,
            san_moves: Vec::new(),
            repetitions,
        }
    }

    fn find_legal(&self, from: Position, to: Position, promotion: Option<PieceKind>) -> Option<Move> {
        self.position.legal_moves().into_iter().find(|m| {
            engine_move(m).is_some_and(|em| {
                em.from == from
                    && em.to == to
                    && em.promotion == promotion.or(em.promotion.map(|_| PieceKind::Queen))
            })
        })
    }
}

impl Default for ShakmatyEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesEngine for ShakmatyEngine {
    fn valid_moves(&self) -> Vec<EngineMove> {
        self.position
            .legal_moves()
            .iter()
            .filter_map(engine_move)
            .collect()
    }

    fn submit_move(&mut self, mv: &str) -> Result<(), RulesError> {
        let (from, to, promotion) = parse_move(mv)?;
        let m = self
            .find_legal(from, to, promotion)
            .ok_or_else(|| RulesError::Illegal(mv.to_string()))?;

        let san = San::from_move(&self.position, m.clone()).to_string();
        self.position = self
            .position
            .clone()
            .play(m)
            .map_err(|_| RulesError::Illegal(mv.to_string()))?;

        self.san_moves.push(san);
        *self
            .repetitions
            .entry(repetition_key(&self.position))
            .or_insert(0) += 1;
        Ok(())
    }

    fn outcome(&self) -> Outcome {
        let pos = &self.position;
        if pos.is_checkmate() {
            Outcome::Decisive {
                winner: to_color(pos.turn()).opponent(),
                method: Method::Checkmate,
            }
        } else if pos.is_stalemate() {
            Outcome::Draw {
                method: Method::Stalemate,
            }
        } else if pos.is_insufficient_material() {
            Outcome::Draw {
                method: Method::InsufficientMaterial,
            }
        } else if pos.halfmoves() >= 150 {
            Outcome::Draw {
                method: Method::SeventyFiveMoveRule,
            }
        } else if self.repetitions.values().any(|&count| count >= 5) {
            Outcome::Draw {
                method: Method::FivefoldRepetition,
            }
        } else {
            Outcome::NoOutcome
        }
    }

    fn move_record(&self) -> String {
        self.san_moves
            .chunks(2)
            .enumerate()
            .map(|(i, pair)| format!("{}. {}", i + 1, pair.join(" ")))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn turn(&self) -> Color {
        to_color(self.position.turn())
    }

    fn cell_at(&self, pos: Position) -> Cell {
        match self.position.board().piece_at(to_square(pos)) {
            Some(piece) => Cell::Occupied(Piece::new(
                to_color(piece.color),
                to_kind(piece.role),
            )),
            None => Cell::Empty,
        }
    }
}

fn parse_move(mv: &str) -> Result<(Position, Position, Option<PieceKind>), RulesError> {
    let malformed = || RulesError::Malformed(mv.to_string());
    if !mv.is_ascii() || !(4..=5).contains(&mv.len()) {
        return Err(malformed());
    }

    let from = Position::from_notation(&mv[0..2]).map_err(|_| malformed())?;
    let to = Position::from_notation(&mv[2..4]).map_err(|_| malformed())?;
    let promotion = match mv.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(PieceKind::Queen),
        Some(b'r') => Some(PieceKind::Rook),
        Some(b'b') => Some(PieceKind::Bishop),
        Some(b'n') => Some(PieceKind::Knight),
        Some(_) => return Err(malformed()),
    };
    Ok((from, to, promotion))
}

fn engine_move(m: &Move) -> Option<EngineMove> {
    let (from, to) = match m {
        Move::Normal { from, to, .. } | Move::EnPassant { from, to } => (*from, *to),
        // Reported as the king's two-square hop rather than king-takes-rook
        Move::Castle { king, rook } => {
            let file = if rook.file() == File::H { File::G } else { File::C };
            (*king, Square::from_coords(file, king.rank()))
        }
        Move::Put { .. } => return None,
    };

    Some(EngineMove {
        from: from_square(from)?,
        to: from_square(to)?,
        promotion: m.promotion().map(to_kind),
    })
}

fn repetition_key(position: &Chess) -> String {
    format!(
        "{:?}|{:?}|{:?}",
        position.board(),
        position.turn(),
        position.castles()
    )
}

fn to_square(pos: Position) -> Square {
    Square::from_coords(
        File::new(pos.x() as u32),
        Rank::new(7 - pos.y() as u32),
    )
}

fn from_square(square: Square) -> Option<Position> {
    Position::from_notation(&square.to_string()).ok()
}

fn to_color(color: shakmaty::Color) -> Color {
    match color {
        shakmaty::Color::White => Color::White,
        shakmaty::Color::Black => Color::Black,
    }
}

fn to_kind(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::BoardState;

    fn pos(notation: &str) -> Position {
        Position::from_notation(notation).unwrap()
    }

    fn play(engine: &mut ShakmatyEngine, moves: &[&str]) {
        for mv in moves {
            engine.submit_move(mv).unwrap();
        }
    }

    #[test]
    fn test_starting_moves() {
        let engine = ShakmatyEngine::new();
        let moves = engine.valid_moves();
        assert_eq!(moves.len(), 20);
        assert!(moves.iter().any(|m| m.to_string() == "e2e4"));
        assert!(moves.iter().any(|m| m.to_string() == "g1f3"));
        assert_eq!(engine.turn(), Color::White);
        assert_eq!(engine.outcome(), Outcome::NoOutcome);
    }

    #[test]
    fn test_engine_board_matches_standard_board() {
        let engine = ShakmatyEngine::new();
        let board = BoardState::standard();
        for p in Position::all() {
            assert_eq!(engine.cell_at(p), board.get(p), "mismatch at {}", p);
        }
    }

    #[test]
    fn test_submit_legal_and_illegal() {
        let mut engine = ShakmatyEngine::new();
        assert!(engine.submit_move("e2e4").is_ok());
        assert_eq!(engine.turn(), Color::Black);
        assert_eq!(
            engine.submit_move("e2e4"),
            Err(RulesError::Illegal("e2e4".to_string()))
        );
        assert!(matches!(
            engine.submit_move("e7"),
            Err(RulesError::Malformed(_))
        ));
        assert!(matches!(
            engine.submit_move("e7e5x"),
            Err(RulesError::Malformed(_))
        ));
        assert_eq!(engine.move_record(), "1. e4");
    }

    #[test]
    fn test_fools_mate() {
        let mut engine = ShakmatyEngine::new();
        play(&mut engine, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(
            engine.outcome(),
            Outcome::Decisive {
                winner: Color::Black,
                method: Method::Checkmate
            }
        );
        assert_eq!(engine.outcome().to_string(), "0-1");
        assert_eq!(engine.move_record(), "1. f3 e5 2. g4 Qh4");
        assert!(engine.valid_moves().is_empty());
    }

    #[test]
    fn test_fastest_stalemate() {
        let mut engine = ShakmatyEngine::new();
        play(
            &mut engine,
            &[
                "e2e3", "a7a5", "d1h5", "a8a6", "h5a5", "h7h5", "h2h4", "a6h6", "a5c7", "f7f6",
                "c7d7", "e8f7", "d7b7", "d8d3", "b7b8", "d3h7", "b8c8", "f7g6", "c8e6",
            ],
        );
        assert_eq!(
            engine.outcome(),
            Outcome::Draw {
                method: Method::Stalemate
            }
        );
    }

    #[test]
    fn test_castling_reported_as_king_hop() {
        let mut engine = ShakmatyEngine::new();
        play(
            &mut engine,
            &["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "g8f6"],
        );
        assert!(engine
            .valid_moves()
            .iter()
            .any(|m| m.to_string() == "e1g1"));

        engine.submit_move("e1g1").unwrap();
        assert_eq!(
            engine.cell_at(pos("f1")),
            Cell::Occupied(Piece::new(Color::White, PieceKind::Rook))
        );
        assert_eq!(
            engine.cell_at(pos("g1")),
            Cell::Occupied(Piece::new(Color::White, PieceKind::King))
        );
        assert_eq!(engine.cell_at(pos("h1")), Cell::Empty);
    }

    #[test]
    fn test_fivefold_repetition() {
        let mut engine = ShakmatyEngine::new();
        for _ in 0..4 {
            play(&mut engine, &["g1f3", "g8f6", "f3g1", "f6g8"]);
        }
        assert_eq!(
            engine.outcome(),
            Outcome::Draw {
                method: Method::FivefoldRepetition
            }
        );
    }

    #[test]
    fn test_engine_move_display() {
        let mv = EngineMove {
            from: pos("e7"),
            to: pos("e8"),
            promotion: Some(PieceKind::Queen),
        };
        assert_eq!(mv.to_string(), "e7e8q");
    }
}
