pub mod board;
pub mod position;

pub use board::{BoardState, Highlight, Overlay};
pub use position::{Position, PositionError, BOARD_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// The king glyph used to tag a player's name
    pub fn symbol(self) -> &'static str {
        Piece::new(self, PieceKind::King).symbol()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    // White uses the filled glyphs so it reads as the light side on a dark terminal
    pub fn symbol(&self) -> &'static str {
        match (self.color, self.kind) {
            (Color::White, PieceKind::Pawn) => "♟",
            (Color::White, PieceKind::Knight) => "♞",
            (Color::White, PieceKind::Bishop) => "♝",
            (Color::White, PieceKind::Rook) => "♜",
            (Color::White, PieceKind::Queen) => "♛",
            (Color::White, PieceKind::King) => "♚",
            (Color::Black, PieceKind::Pawn) => "♙",
            (Color::Black, PieceKind::Knight) => "♘",
            (Color::Black, PieceKind::Bishop) => "♗",
            (Color::Black, PieceKind::Rook) => "♖",
            (Color::Black, PieceKind::Queen) => "♕",
            (Color::Black, PieceKind::King) => "♔",
        }
    }
}

/// Contents of one board square
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Occupied(Piece),
}

impl Cell {
    pub fn piece(&self) -> Option<Piece> {
        match self {
            Cell::Empty => None,
            Cell::Occupied(piece) => Some(*piece),
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Cell::Empty => " ",
            Cell::Occupied(piece) => piece.symbol(),
        }
    }
}

/// True if a player of `color` may pick up whatever is in `cell`
pub fn can_move(color: Color, cell: Cell) -> bool {
    matches!(cell, Cell::Occupied(piece) if piece.color == color)
}

/// True if a player of `color` may capture whatever is in `cell`
pub fn can_capture(color: Color, cell: Cell) -> bool {
    matches!(cell, Cell::Occupied(piece) if piece.color == color.opponent())
}
