//! UI-facing board grid and the per-square highlight overlay

use crate::{can_move, Cell, Color, Piece, PieceKind, Position, BOARD_SIZE};
use std::collections::HashMap;

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

/// The 8x8 piece grid rendered to players, indexed as `cells[y][x]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    cells: [[Cell; BOARD_SIZE as usize]; BOARD_SIZE as usize],
}

impl BoardState {
    pub fn empty() -> Self {
        Self {
            cells: [[Cell::Empty; BOARD_SIZE as usize]; BOARD_SIZE as usize],
        }
    }

    /// Standard starting setup with Black on ranks 8/7 (y = 0/1)
    pub fn standard() -> Self {
        let mut board = Self::empty();
        for (x, &kind) in BACK_RANK.iter().enumerate() {
            board.cells[0][x] = Cell::Occupied(Piece::new(Color::Black, kind));
            board.cells[1][x] = Cell::Occupied(Piece::new(Color::Black, PieceKind::Pawn));
            board.cells[6][x] = Cell::Occupied(Piece::new(Color::White, PieceKind::Pawn));
            board.cells[7][x] = Cell::Occupied(Piece::new(Color::White, kind));
        }
        board
    }

    pub fn get(&self, pos: Position) -> Cell {
        self.cells[pos.y() as usize][pos.x() as usize]
    }

    pub fn set(&mut self, pos: Position, cell: Cell) {
        self.cells[pos.y() as usize][pos.x() as usize] = cell;
    }

    /// Copies the piece at `from` onto `to`, clears `from`, and returns what was on `to`
    pub fn move_piece(&mut self, from: Position, to: Position) -> Cell {
        let moving = self.get(from);
        let captured = self.get(to);
        self.set(to, moving);
        self.set(from, Cell::Empty);
        captured
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    Neutral,
    Valid,
    Invalid,
}

/// Sparse per-square highlight map; squares not present are Neutral
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    cells: HashMap<Position, Highlight>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.cells.clear();
    }

    pub fn mark(&mut self, pos: Position, highlight: Highlight) {
        if highlight == Highlight::Neutral {
            self.cells.remove(&pos);
        } else {
            self.cells.insert(pos, highlight);
        }
    }

    pub fn highlight_at(&self, pos: Position) -> Highlight {
        self.cells.get(&pos).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Resets, then marks the cursor Valid if `color` owns the piece under it
    pub fn show_selectable(&mut self, board: &BoardState, cursor: Position, color: Color) {
        let highlight = if can_move(color, board.get(cursor)) {
            Highlight::Valid
        } else {
            Highlight::Invalid
        };
        self.show_single(cursor, highlight);
    }

    /// Resets, then marks only `pos`
    pub fn show_single(&mut self, pos: Position, highlight: Highlight) {
        self.reset();
        self.mark(pos, highlight);
    }
}
