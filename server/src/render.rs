//! Full-frame text rendering of a game as seen by one session

use crate::game::Status;
use crate::player::PlayerView;
use shared::{BoardState, Highlight, Overlay, Piece, Position, BOARD_SIZE};
use std::fmt::Write;

pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

const RESET: &str = "\x1b[0m";
const VALID_BG: &str = "\x1b[42m";
const INVALID_BG: &str = "\x1b[41m";
const DARK_BG: &str = "\x1b[100m";

const FILES: &str = "    a  b  c  d  e  f  g  h";
const TRAY_WIDTH: usize = 8;
const HELP: &str = "move: w a s d / h j k l   select: f / space   quit: ctrl-c";

/// Everything a frame shows, copied out from under the game lock
#[derive(Debug, Clone)]
pub struct FrameView {
    pub title: String,
    pub board: BoardState,
    pub overlay: Overlay,
    pub status: Status,
    pub viewer: PlayerView,
    pub opponents: Vec<PlayerView>,
}

/// `♚alice`, plus the selected square while placing; bracketed on the active player
pub fn annotation(player: &PlayerView) -> String {
    let mut label = format!("{}{}", player.color.symbol(), player.name);
    if let Some(selected) = player.selected {
        label.push(' ');
        label.push_str(&selected.to_notation());
    }
    if player.active {
        format!("[ {} ]", label)
    } else {
        format!("  {}  ", label)
    }
}

/// Composes the whole frame, clear-screen prefix included
pub fn compose_frame(view: &FrameView) -> String {
    let mut out = String::with_capacity(2048);
    out.push_str(CLEAR_SCREEN);

    let _ = write!(out, "  {}\r\n\r\n", view.title);

    let opponents: Vec<String> = view.opponents.iter().map(annotation).collect();
    let _ = write!(out, "  {}\r\n", opponents.join("  "));

    let opponent_captures: Vec<Piece> = view
        .opponents
        .iter()
        .flat_map(|p| p.captured.iter().copied())
        .collect();

    out.push_str(FILES);
    out.push_str("\r\n");
    for y in 0..BOARD_SIZE {
        let rank = BOARD_SIZE - y;
        let _ = write!(out, "  {}", rank);
        for x in 0..BOARD_SIZE {
            if let Some(pos) = Position::new(x, y) {
                push_cell(&mut out, view, pos);
            }
        }
        let _ = write!(out, " {}", rank);

        // Opponent trays run down from the top, ours up from the bottom
        let tray = match y {
            0 | 1 => tray_row(&opponent_captures, y as usize),
            6 | 7 => tray_row(&view.viewer.captured, (7 - y) as usize),
            _ => String::new(),
        };
        if !tray.is_empty() {
            let _ = write!(out, "   {}", tray);
        }
        out.push_str("\r\n");
    }
    out.push_str(FILES);
    out.push_str("\r\n");

    let _ = write!(out, "  {}\r\n\r\n", annotation(&view.viewer));
    let _ = write!(out, "  {}\r\n", status_line(view));
    let _ = write!(out, "  {}\r\n", HELP);
    out
}

fn push_cell(out: &mut String, view: &FrameView, pos: Position) {
    let background = match view.overlay.highlight_at(pos) {
        Highlight::Valid => VALID_BG,
        Highlight::Invalid => INVALID_BG,
        Highlight::Neutral if (pos.x() + pos.y()) % 2 == 1 => DARK_BG,
        Highlight::Neutral => "",
    };
    let symbol = view.board.get(pos).symbol();
    if background.is_empty() {
        let _ = write!(out, " {} ", symbol);
    } else {
        let _ = write!(out, "{} {} {}", background, symbol, RESET);
    }
}

fn tray_row(captured: &[Piece], row: usize) -> String {
    captured
        .chunks(TRAY_WIDTH)
        .nth(row)
        .map(|chunk| {
            chunk
                .iter()
                .map(|piece| piece.symbol())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

fn status_line(view: &FrameView) -> &'static str {
    match view.status {
        Status::Waiting => "waiting for an opponent...",
        Status::Active if view.viewer.active => "your move",
        Status::Active => "opponent's move",
        Status::Over => "game over",
    }
}
