//! Per-session chess identity and its selection state machine

use crate::game::GameState;
use crate::input::{KeyEvent, KeyHistory};
use crate::rules::EngineMove;
use log::{debug, warn};
use shared::{can_capture, can_move, Cell, Color, Highlight, Piece, PieceKind, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    SelectingPiece,
    PlacingPiece,
}

/// Read-only copy of what the renderer needs from a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub name: String,
    pub color: Color,
    pub active: bool,
    pub selected: Option<Position>,
    pub captured: Vec<Piece>,
}

#[derive(Debug)]
pub struct Player {
    name: String,
    color: Color,
    /// Owning session, by id only
    session_id: u64,
    cursor: Position,
    selected: Option<Position>,
    state: InputState,
    active: bool,
    captured: Vec<Piece>,
    keys: KeyHistory,
}

impl Player {
    pub fn new(name: impl Into<String>, color: Color, session_id: u64) -> Self {
        Self {
            name: name.into(),
            color,
            session_id,
            cursor: home_square(color),
            selected: None,
            state: InputState::SelectingPiece,
            active: false,
            captured: Vec::new(),
            keys: KeyHistory::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn cursor(&self) -> Position {
        self.cursor
    }

    pub fn selected(&self) -> Option<Position> {
        self.selected
    }

    pub fn state(&self) -> InputState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn captured(&self) -> &[Piece] {
        &self.captured
    }

    /// Reassigns the color and moves the cursor back to that side's corner
    pub fn assign_color(&mut self, color: Color) {
        self.color = color;
        self.cursor = home_square(color);
        self.selected = None;
        self.state = InputState::SelectingPiece;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    /// Latches the latest key; consumed on the next update
    pub fn press(&mut self, event: KeyEvent) {
        self.keys.press(event);
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            name: self.name.clone(),
            color: self.color,
            active: self.active,
            selected: self.selected,
            captured: self.captured.clone(),
        }
    }

    /// Advances the state machine by one tick
    ///
    /// Returns the move when this tick committed one. The caller owns the
    /// turn switch that follows.
    pub fn update(&mut self, state: &mut GameState) -> Option<EngineMove> {
        let event = self.keys.take();
        if !self.active || event == KeyEvent::None {
            return None;
        }

        match event {
            KeyEvent::Up => self.cursor = self.cursor.offset(0, -1),
            KeyEvent::Down => self.cursor = self.cursor.offset(0, 1),
            KeyEvent::Left => self.cursor = self.cursor.offset(-1, 0),
            KeyEvent::Right => self.cursor = self.cursor.offset(1, 0),
            KeyEvent::Action => {
                if let Some(mv) = self.act(state) {
                    return Some(mv);
                }
            }
            KeyEvent::None => {}
        }

        self.refresh_overlay(state);
        None
    }

    /// Recomputes the overlay for this player's cursor
    pub fn refresh_overlay(&self, state: &mut GameState) {
        match self.state {
            InputState::SelectingPiece => {
                state
                    .overlay
                    .show_selectable(&state.board, self.cursor, self.color);
            }
            InputState::PlacingPiece => {
                let highlight = match self.legal_move_to(state, self.cursor) {
                    Some(_) => Highlight::Valid,
                    None => Highlight::Invalid,
                };
                state.overlay.show_single(self.cursor, highlight);
            }
        }
    }

    fn act(&mut self, state: &mut GameState) -> Option<EngineMove> {
        match (self.state, self.selected) {
            (InputState::SelectingPiece, _) => {
                if can_move(self.color, state.board.get(self.cursor)) {
                    self.selected = Some(self.cursor);
                    self.state = InputState::PlacingPiece;
                }
                None
            }
            (InputState::PlacingPiece, Some(from)) if from == self.cursor => {
                self.cancel();
                None
            }
            (InputState::PlacingPiece, Some(_)) => {
                let mv = self.legal_move_to(state, self.cursor)?;
                self.commit(state, mv)
            }
            (InputState::PlacingPiece, None) => {
                self.cancel();
                None
            }
        }
    }

    fn cancel(&mut self) {
        self.selected = None;
        self.state = InputState::SelectingPiece;
    }

    /// Promotions always pick the queen
    fn legal_move_to(&self, state: &GameState, to: Position) -> Option<EngineMove> {
        let from = self.selected?;
        state
            .engine
            .valid_moves()
            .into_iter()
            .filter(|mv| mv.from == from && mv.to == to)
            .find(|mv| matches!(mv.promotion, None | Some(PieceKind::Queen)))
    }

    fn commit(&mut self, state: &mut GameState, mv: EngineMove) -> Option<EngineMove> {
        if let Err(e) = state.engine.submit_move(&mv.to_string()) {
            warn!("Engine rejected {} from {}: {}", mv, self.name, e);
            return None;
        }

        let target = state.board.get(mv.to);
        if can_capture(self.color, target) {
            if let Some(piece) = target.piece() {
                self.captured.push(piece);
            }
        }
        state.board.move_piece(mv.from, mv.to);
        self.reconcile(state);

        debug!("{} ({:?}) played {}", self.name, self.color, mv);
        self.cancel();
        Some(mv)
    }

    /// Copies any square the engine disagrees on, for castling, en passant and promotion
    fn reconcile(&mut self, state: &mut GameState) {
        for pos in Position::all() {
            let expected = state.engine.cell_at(pos);
            let current = state.board.get(pos);
            if expected == current {
                continue;
            }
            if expected == Cell::Empty && can_capture(self.color, current) {
                if let Some(piece) = current.piece() {
                    self.captured.push(piece);
                }
            }
            state.board.set(pos, expected);
        }
    }
}

/// a1 for White, a8 for Black
pub fn home_square(color: Color) -> Position {
    match color {
        Color::White => Position::A1,
        Color::Black => Position::A8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ShakmatyEngine;
    use shared::{BoardState, PieceKind};

    fn pos(notation: &str) -> Position {
        Position::from_notation(notation).unwrap()
    }

    fn fresh_state() -> GameState {
        GameState::new(Box::new(ShakmatyEngine::new()))
    }

    fn active_player(color: Color) -> Player {
        let mut player = Player::new("tester", color, 1);
        player.set_active(true);
        player
    }

    /// Presses each key then runs one update, so repeats are separate presses
    fn tap(player: &mut Player, state: &mut GameState, events: &[KeyEvent]) -> Option<EngineMove> {
        let mut last = None;
        for &event in events {
            player.press(event);
            last = player.update(state);
            // Let the edge detector see a release
            player.update(state);
        }
        last
    }

    fn walk(player: &mut Player, state: &mut GameState, to: Position) {
        while player.cursor().x() < to.x() {
            tap(player, state, &[KeyEvent::Right]);
        }
        while player.cursor().x() > to.x() {
            tap(player, state, &[KeyEvent::Left]);
        }
        while player.cursor().y() < to.y() {
            tap(player, state, &[KeyEvent::Down]);
        }
        while player.cursor().y() > to.y() {
            tap(player, state, &[KeyEvent::Up]);
        }
    }

    fn play(player: &mut Player, state: &mut GameState, from: &str, to: &str) -> Option<EngineMove> {
        walk(player, state, pos(from));
        tap(player, state, &[KeyEvent::Action]);
        walk(player, state, pos(to));
        tap(player, state, &[KeyEvent::Action])
    }

    #[test]
    fn test_home_squares() {
        assert_eq!(home_square(Color::White), Position::new(0, 7).unwrap());
        assert_eq!(home_square(Color::Black), Position::new(0, 0).unwrap());
    }

    #[test]
    fn test_held_key_moves_cursor_once() {
        let mut state = fresh_state();
        let mut player = active_player(Color::White);

        player.press(KeyEvent::Up);
        player.update(&mut state);
        player.update(&mut state);

        assert_eq!(player.cursor(), pos("a2"));
    }

    #[test]
    fn test_inactive_player_ignores_input() {
        let mut state = fresh_state();
        let mut player = Player::new("idle", Color::White, 1);

        player.press(KeyEvent::Up);
        player.update(&mut state);
        assert_eq!(player.cursor(), pos("a1"));

        // The press was consumed, so activation does not replay it
        player.set_active(true);
        player.update(&mut state);
        assert_eq!(player.cursor(), pos("a1"));
    }

    #[test]
    fn test_cursor_clamps_at_edges() {
        let mut state = fresh_state();
        let mut player = active_player(Color::White);

        tap(&mut player, &mut state, &[KeyEvent::Left, KeyEvent::Down]);
        assert_eq!(player.cursor(), pos("a1"));

        let mut black = active_player(Color::Black);
        tap(&mut black, &mut state, &[KeyEvent::Up, KeyEvent::Left]);
        assert_eq!(black.cursor(), pos("a8"));
    }

    #[test]
    fn test_select_own_piece_at_home_square() {
        let mut state = fresh_state();
        let mut player = active_player(Color::White);

        // a1 holds the white rook in this board's orientation
        assert_eq!(player.cursor(), Position::new(0, 7).unwrap());
        tap(&mut player, &mut state, &[KeyEvent::Action]);

        assert_eq!(player.state(), InputState::PlacingPiece);
        assert_eq!(player.selected(), Some(Position::new(0, 7).unwrap()));
    }

    #[test]
    fn test_select_king_square() {
        let mut board = BoardState::empty();
        board.set(
            Position::new(0, 7).unwrap(),
            Cell::Occupied(Piece::new(Color::White, PieceKind::King)),
        );
        let mut state = fresh_state();
        state.board = board;
        let mut player = active_player(Color::White);

        tap(&mut player, &mut state, &[KeyEvent::Action]);

        assert_eq!(player.state(), InputState::PlacingPiece);
        assert_eq!(player.selected(), Some(Position::new(0, 7).unwrap()));
    }

    #[test]
    fn test_cannot_select_opponent_or_empty() {
        let mut state = fresh_state();
        let mut player = active_player(Color::Black);

        walk(&mut player, &mut state, pos("a1"));
        tap(&mut player, &mut state, &[KeyEvent::Action]);
        assert_eq!(player.state(), InputState::SelectingPiece);
        assert_eq!(state.overlay.highlight_at(pos("a1")), Highlight::Invalid);

        walk(&mut player, &mut state, pos("d4"));
        tap(&mut player, &mut state, &[KeyEvent::Action]);
        assert_eq!(player.state(), InputState::SelectingPiece);
        assert_eq!(player.selected(), None);
    }

    #[test]
    fn test_action_on_selected_square_cancels() {
        let mut state = fresh_state();
        let mut player = active_player(Color::White);

        tap(&mut player, &mut state, &[KeyEvent::Action, KeyEvent::Action]);

        assert_eq!(player.state(), InputState::SelectingPiece);
        assert_eq!(player.selected(), None);
        assert_eq!(state.overlay.highlight_at(pos("a1")), Highlight::Valid);
    }

    #[test]
    fn test_illegal_destination_is_noop() {
        let mut state = fresh_state();
        let mut player = active_player(Color::White);

        walk(&mut player, &mut state, pos("e2"));
        tap(&mut player, &mut state, &[KeyEvent::Action]);
        walk(&mut player, &mut state, pos("e5"));
        assert_eq!(state.overlay.highlight_at(pos("e5")), Highlight::Invalid);

        let committed = tap(&mut player, &mut state, &[KeyEvent::Action]);

        assert!(committed.is_none());
        assert_eq!(player.state(), InputState::PlacingPiece);
        assert_eq!(player.selected(), Some(pos("e2")));
        assert_eq!(state.board, BoardState::standard());
        assert_eq!(state.engine.move_record(), "");
    }

    #[test]
    fn test_commit_moves_piece() {
        let mut state = fresh_state();
        let mut player = active_player(Color::White);

        walk(&mut player, &mut state, pos("e2"));
        tap(&mut player, &mut state, &[KeyEvent::Action]);
        walk(&mut player, &mut state, pos("e4"));
        assert_eq!(state.overlay.highlight_at(pos("e4")), Highlight::Valid);

        let committed = tap(&mut player, &mut state, &[KeyEvent::Action]);

        assert_eq!(committed.map(|mv| mv.to_string()), Some("e2e4".to_string()));
        assert_eq!(player.state(), InputState::SelectingPiece);
        assert_eq!(player.selected(), None);
        assert_eq!(state.board.get(pos("e2")), Cell::Empty);
        assert_eq!(
            state.board.get(pos("e4")),
            Cell::Occupied(Piece::new(Color::White, PieceKind::Pawn))
        );
        assert_eq!(state.engine.move_record(), "1. e4");
    }

    #[test]
    fn test_capture_goes_to_tray() {
        let mut state = fresh_state();
        let mut white = active_player(Color::White);
        let mut black = active_player(Color::Black);

        assert!(play(&mut white, &mut state, "e2", "e4").is_some());
        assert!(play(&mut black, &mut state, "d7", "d5").is_some());
        assert!(play(&mut white, &mut state, "e4", "d5").is_some());

        assert_eq!(
            white.captured(),
            &[Piece::new(Color::Black, PieceKind::Pawn)]
        );
        assert!(black.captured().is_empty());
    }

    #[test]
    fn test_en_passant_reconciles_board() {
        let mut state = fresh_state();
        let mut white = active_player(Color::White);
        let mut black = active_player(Color::Black);

        play(&mut white, &mut state, "e2", "e4");
        play(&mut black, &mut state, "a7", "a6");
        play(&mut white, &mut state, "e4", "e5");
        play(&mut black, &mut state, "d7", "d5");
        assert!(play(&mut white, &mut state, "e5", "d6").is_some());

        assert_eq!(state.board.get(pos("d5")), Cell::Empty);
        assert_eq!(
            white.captured(),
            &[Piece::new(Color::Black, PieceKind::Pawn)]
        );
        for square in Position::all() {
            assert_eq!(state.board.get(square), state.engine.cell_at(square));
        }
    }

    #[test]
    fn test_promotion_reconciles_board() {
        let mut state = fresh_state();
        let mut white = active_player(Color::White);
        let mut black = active_player(Color::Black);

        play(&mut white, &mut state, "a2", "a4");
        play(&mut black, &mut state, "b7", "b5");
        play(&mut white, &mut state, "a4", "b5");
        play(&mut black, &mut state, "a7", "a6");
        play(&mut white, &mut state, "b5", "a6");
        play(&mut black, &mut state, "c8", "b7");
        play(&mut white, &mut state, "a6", "b7");
        play(&mut black, &mut state, "b8", "c6");
        let promoted = play(&mut white, &mut state, "b7", "a8");

        assert_eq!(promoted.map(|mv| mv.to_string()), Some("b7a8q".to_string()));
        assert_eq!(
            state.board.get(pos("a8")),
            Cell::Occupied(Piece::new(Color::White, PieceKind::Queen))
        );
        assert_eq!(state.board.get(pos("b7")), Cell::Empty);
        for square in Position::all() {
            assert_eq!(state.board.get(square), state.engine.cell_at(square));
        }
        assert_eq!(
            white.captured().last(),
            Some(&Piece::new(Color::Black, PieceKind::Rook))
        );
        assert!(state.engine.move_record().ends_with("bxa8=Q"));
    }

    #[test]
    fn test_castling_moves_rook() {
        let mut state = fresh_state();
        let mut white = active_player(Color::White);
        let mut black = active_player(Color::Black);

        play(&mut white, &mut state, "e2", "e4");
        play(&mut black, &mut state, "e7", "e5");
        play(&mut white, &mut state, "g1", "f3");
        play(&mut black, &mut state, "b8", "c6");
        play(&mut white, &mut state, "f1", "c4");
        play(&mut black, &mut state, "g8", "f6");
        assert!(play(&mut white, &mut state, "e1", "g1").is_some());

        assert_eq!(
            state.board.get(pos("f1")),
            Cell::Occupied(Piece::new(Color::White, PieceKind::Rook))
        );
        assert_eq!(state.board.get(pos("h1")), Cell::Empty);
        assert!(white.captured().is_empty());
    }

    #[test]
    fn test_assign_color_resets_cursor() {
        let mut player = Player::new("p", Color::White, 7);
        player.assign_color(Color::Black);
        assert_eq!(player.color(), Color::Black);
        assert_eq!(player.cursor(), pos("a8"));
        assert_eq!(player.session_id(), 7);
    }
}
