//! One chess match: board, rules engine, hub and the loops that drive them

use crate::config::GameConfig;
use crate::hub::Hub;
use crate::player::home_square;
use crate::recorder::{GameRecord, Recorder};
use crate::render::{compose_frame, FrameView};
use crate::rules::{Outcome, RulesEngine, ShakmatyEngine};
use crate::session::Session;
use crate::utils::timestamp_ms;
use log::{debug, info};
use shared::{BoardState, Color, Overlay};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Waiting,
    Active,
    Over,
}

/// Everything the update loop writes and render reads
pub struct GameState {
    pub board: BoardState,
    pub overlay: Overlay,
    pub engine: Box<dyn RulesEngine>,
    pub status: Status,
    /// Unix ms, set on Waiting -> Active
    pub started_at: Option<u64>,
}

impl GameState {
    pub fn new(engine: Box<dyn RulesEngine>) -> Self {
        let board = BoardState::standard();
        let mut overlay = Overlay::new();
        overlay.show_selectable(&board, home_square(Color::White), Color::White);
        Self {
            board,
            overlay,
            engine,
            status: Status::Waiting,
            started_at: None,
        }
    }
}

pub struct Game {
    id: Uuid,
    name: String,
    named: bool,
    config: GameConfig,
    state: RwLock<GameState>,
    hub: Arc<Hub>,
    /// Seats handed out by the game manager, ahead of hub registration
    seats: AtomicUsize,
    running: AtomicBool,
    /// Set once an outcome is decided; finished games take no new players
    finished: AtomicBool,
    redraw_tx: mpsc::Sender<()>,
    redraw_rx: Mutex<Option<mpsc::Receiver<()>>>,
    shutdown: watch::Sender<bool>,
    recorder: Arc<dyn Recorder>,
}

impl Game {
    pub fn new(
        name: impl Into<String>,
        named: bool,
        config: GameConfig,
        recorder: Arc<dyn Recorder>,
    ) -> Arc<Self> {
        let (redraw_tx, redraw_rx) = mpsc::channel(1);
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            named,
            config,
            state: RwLock::new(GameState::new(Box::new(ShakmatyEngine::new()))),
            hub: Arc::new(Hub::new()),
            seats: AtomicUsize::new(0),
            running: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            redraw_tx,
            redraw_rx: Mutex::new(Some(redraw_rx)),
            shutdown,
            recorder,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for games created under a client-chosen name
    pub fn is_named(&self) -> bool {
        self.named
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    pub async fn status(&self) -> Status {
        self.state.read().await.status
    }

    pub fn session_count(&self) -> usize {
        self.hub.len()
    }

    pub fn seats(&self) -> usize {
        self.seats.load(Ordering::SeqCst)
    }

    pub(crate) fn reserve_seat(&self) -> usize {
        self.seats.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the seats still taken
    pub(crate) fn release_seat(&self) -> usize {
        let previous = self
            .seats
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    /// Starts the hub, redraw proxy, update and redraw loops once
    pub fn ensure_running(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Starting game {} ({})", self.name, self.id);
        self.spawn_hub();
        self.spawn_redraw_proxy();
        self.spawn_update_loop();
        self.spawn_redraw_loop();
    }

    /// Signals every loop of this game to exit
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
        debug!("Stopping game {}", self.name);
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub async fn add_session(&self, session: Arc<Session>) -> bool {
        let added = self.hub.register(Arc::clone(&session)).await;
        if added {
            self.seat_late_joiner(&session).await;
            self.request_redraw();
        }
        added
    }

    /// Gives a player joining a running game the free color, and the turn if it is theirs
    async fn seat_late_joiner(&self, session: &Session) {
        let mut state = self.state.write().await;
        if state.status != Status::Active {
            return;
        }

        let mut taken = Vec::new();
        for other in self.hub.sessions() {
            if other.id() != session.id() {
                taken.push(other.player.lock().await.color());
            }
        }
        let Some(color) = [Color::White, Color::Black]
            .into_iter()
            .find(|color| !taken.contains(color))
        else {
            return;
        };

        let mut player = session.player.lock().await;
        player.assign_color(color);
        let active = state.engine.turn() == color;
        player.set_active(active);
        if active {
            player.refresh_overlay(&mut state);
        }
        info!(
            "{} took the free {:?} seat in game {}{}",
            player.name(),
            color,
            self.name,
            if active { " and has the move" } else { "" }
        );
    }

    /// Evicts a session, showing it `message` before its stream closes
    pub async fn remove_session(&self, session_id: u64, message: &str) -> bool {
        let removed = self
            .hub
            .unregister(session_id, format!("\r\n\r\n{}\r\n\r\n", message))
            .await;
        if removed {
            self.request_redraw();
        }
        removed
    }

    /// Queues a redraw of every session; repeated requests coalesce
    pub fn request_redraw(&self) {
        let _ = self.redraw_tx.try_send(());
    }

    /// Writes one full frame for `session`
    pub async fn render(&self, session: &Session) {
        let frame = {
            let state = self.state.read().await;
            let viewer = session.player.lock().await.view();
            let mut opponents = Vec::new();
            for other in self.hub.sessions() {
                if other.id() != session.id() {
                    opponents.push(other.player.lock().await.view());
                }
            }
            compose_frame(&FrameView {
                title: self.name.clone(),
                board: state.board.clone(),
                overlay: state.overlay.clone(),
                status: state.status,
                viewer,
                opponents,
            })
        };
        if let Err(e) = session.write(frame.as_bytes()).await {
            debug!("Render to session {} failed: {}", session.id(), e);
        }
    }

    /// One update tick: every player consumes its latest key
    pub(crate) async fn update(&self) {
        let sessions = self.hub.sessions();
        let mut game_over = None;
        {
            let mut state = self.state.write().await;
            for session in &sessions {
                let committed = session.player.lock().await.update(&mut state);
                if committed.is_some() {
                    game_over = self.after_move(&mut state, &sessions).await;
                    if game_over.is_some() {
                        break;
                    }
                }
            }
        }

        if let Some(message) = game_over {
            for session in &sessions {
                self.remove_session(session.id(), &message).await;
            }
        }
    }

    /// Outcome check and turn switch; returns the eviction message once the game ends
    async fn after_move(&self, state: &mut GameState, sessions: &[Arc<Session>]) -> Option<String> {
        let outcome = state.engine.outcome();
        self.push_record(state, sessions, outcome).await;
        self.request_redraw();

        if let Some(method) = outcome.method() {
            self.mark_finished();
            state.status = Status::Over;
            state.overlay.reset();
            for session in sessions {
                session.player.lock().await.set_active(false);
            }
            let record = state.engine.move_record();
            info!("Game {} over: {} by {} ({})", self.name, outcome, method, record);
            return Some(format!(
                "game is over. {} by {}\r\nmoves: {}",
                outcome, method, record
            ));
        }

        for session in sessions {
            let mut player = session.player.lock().await;
            let active = !player.is_active();
            player.set_active(active);
            if active {
                player.refresh_overlay(state);
            }
        }
        None
    }

    /// Waiting -> Active once two sessions are in; happens at most once
    pub(crate) async fn check_start(&self) {
        if self.hub.len() < 2 {
            return;
        }
        let sessions = self.hub.sessions();
        let mut state = self.state.write().await;
        if state.status != Status::Waiting {
            return;
        }

        let mut color = if rand::random::<bool>() {
            Color::White
        } else {
            Color::Black
        };
        for session in &sessions {
            let mut player = session.player.lock().await;
            player.assign_color(color);
            player.set_active(color == Color::White);
            if color == Color::White {
                player.refresh_overlay(&mut state);
            }
            color = color.opponent();
        }
        state.status = Status::Active;
        state.started_at = Some(timestamp_ms());
        info!("Game {} started with {} players", self.name, sessions.len());

        self.push_record(&state, &sessions, Outcome::NoOutcome).await;
        self.request_redraw();
    }

    async fn push_record(&self, state: &GameState, sessions: &[Arc<Session>], outcome: Outcome) {
        let mut white_player = String::new();
        let mut black_player = String::new();
        for session in sessions {
            let player = session.player.lock().await;
            match player.color() {
                Color::White => white_player = player.name().to_string(),
                Color::Black => black_player = player.name().to_string(),
            }
        }
        let over = outcome.is_over();
        self.recorder.push(GameRecord {
            id: self.id,
            name: self.name.clone(),
            white_player,
            black_player,
            start_time: state.started_at.unwrap_or(0),
            end_time: over.then(timestamp_ms),
            outcome: if over { outcome.to_string() } else { String::new() },
            moves: state.engine.move_record(),
        });
    }

    fn spawn_hub(self: &Arc<Self>) {
        let hub = Arc::clone(&self.hub);
        let game: Weak<Game> = Arc::downgrade(self);
        let shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            hub.run(
                move |session| {
                    let game = game.clone();
                    async move {
                        if let Some(game) = game.upgrade() {
                            game.render(&session).await;
                        }
                    }
                },
                shutdown,
            )
            .await;
        });
    }

    fn spawn_redraw_proxy(self: &Arc<Self>) {
        let game = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let Some(mut redraw_rx) = game.redraw_rx.lock().await.take() else {
                return;
            };
            loop {
                tokio::select! {
                    Some(()) = redraw_rx.recv() => game.hub.redraw(),
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    fn spawn_update_loop(self: &Arc<Self>) {
        let game = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = interval(game.config.tick_duration());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => game.update().await,
                    _ = shutdown.changed() => break,
                }
            }
            debug!("Update loop for {} stopped", game.name);
        });
    }

    fn spawn_redraw_loop(self: &Arc<Self>) {
        let game = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = interval(game.config.redraw_duration());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        game.check_start().await;
                        game.hub.redraw();
                    }
                    _ = shutdown.changed() => break,
                }
            }
        });
    }
}
