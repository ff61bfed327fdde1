//! Matchmaking, admission and eviction across all games
//!
//! Games live in one of two registries, decided when they are created:
//! - named games, keyed by the name a client asked for
//! - public games, keyed by a generated name
//!
//! Each admitted connection gets a Session and an input task. When the last
//! seat of a game is released the game is dropped from its registry and its
//! loops are stopped.

use crate::config::GameConfig;
use crate::game::Game;
use crate::input::{Key, KeyDecoder};
use crate::player::Player;
use crate::recorder::Recorder;
use crate::session::{next_session_id, Session};
use crate::utils::silly_name;
use log::{debug, info, warn};
use shared::Color;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;

pub const MAX_NAME_LEN: usize = 20;
pub const GOODBYE: &str = "Goodbye!";

#[derive(Debug, Error)]
pub enum AdmitError {
    #[error("game {0} stopped before the player could join")]
    GameClosed(String),
}

/// Player name and optional requested game, split out of a raw identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub player: String,
    pub game: Option<String>,
}

/// Splits `name#game` on `separator`
///
/// Never fails: a missing or empty game part means no game was requested, and
/// an empty player name gets a generated one.
pub fn parse_identity(raw: &str, separator: char) -> Identity {
    let raw = raw.trim();
    let (player, game) = match raw.split_once(separator) {
        Some((player, game)) => (player.trim(), Some(game.trim())),
        None => (raw, None),
    };

    let player = clean_name(player).unwrap_or_else(silly_name);
    let game = game.and_then(clean_name);
    Identity { player, game }
}

fn clean_name(name: &str) -> Option<String> {
    let name: String = name
        .chars()
        .filter(|c| !c.is_control())
        .take(MAX_NAME_LEN)
        .collect();
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// A player who has been seated
pub struct Admission {
    pub game: Arc<Game>,
    pub session: Arc<Session>,
    /// The input task; finishes once the session is evicted
    pub task: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    named: HashMap<String, Arc<Game>>,
    public: HashMap<String, Arc<Game>>,
}

impl Registry {
    fn name_taken(&self, name: &str) -> bool {
        self.named.contains_key(name) || self.public.contains_key(name)
    }

    fn fresh_name(&self) -> String {
        loop {
            let name = silly_name();
            if !self.name_taken(&name) {
                return name;
            }
        }
    }
}

pub struct GameManager {
    config: GameConfig,
    recorder: Arc<dyn Recorder>,
    registry: Mutex<Registry>,
}

impl GameManager {
    pub fn new(config: GameConfig, recorder: Arc<dyn Recorder>) -> Arc<Self> {
        Arc::new(Self {
            config,
            recorder,
            registry: Mutex::new(Registry::default()),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Seats a new connection and spawns its input task
    pub async fn admit<R, W>(
        self: &Arc<Self>,
        reader: R,
        writer: W,
        raw_identity: &str,
    ) -> Result<Admission, AdmitError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let identity = parse_identity(raw_identity, self.config.separator);
        let game = self.choose_game(&identity);
        game.ensure_running();

        let id = next_session_id();
        let player = Player::new(identity.player.clone(), Color::White, id);
        let session = Arc::new(Session::new(id, Box::new(writer), player));

        if !game.add_session(Arc::clone(&session)).await {
            self.release(&game);
            session.close().await;
            return Err(AdmitError::GameClosed(game.name().to_string()));
        }

        info!(
            "Player {} connected to game {} ({})",
            identity.player,
            game.name(),
            game.id()
        );
        self.log_stats("Player joined");

        let task = tokio::spawn(Arc::clone(self).serve_input(
            Arc::clone(&game),
            Arc::clone(&session),
            reader,
        ));

        Ok(Admission {
            game,
            session,
            task,
        })
    }

    /// Picks or creates a game and reserves a seat in it, all under the registry lock
    fn choose_game(&self, identity: &Identity) -> Arc<Game> {
        let mut registry = match self.registry.lock() {
            Ok(registry) => registry,
            Err(poisoned) => poisoned.into_inner(),
        };

        let game = match &identity.game {
            // A finished room counts as free; its entry is replaced
            Some(requested) => match registry
                .named
                .get(requested)
                .filter(|game| !game.is_finished())
                .cloned()
            {
                Some(game) if game.seats() == 1 => game,
                Some(_) => {
                    // Requested room is full; open a private one under a new name
                    let name = registry.fresh_name();
                    debug!("Game {} is full, creating {} instead", requested, name);
                    let game = self.create_game(name.clone(), true);
                    registry.named.insert(name, Arc::clone(&game));
                    game
                }
                None => {
                    let game = self.create_game(requested.clone(), true);
                    registry.named.insert(requested.clone(), Arc::clone(&game));
                    game
                }
            },
            None => {
                let open = registry
                    .public
                    .values()
                    .find(|game| game.seats() == 1 && !game.is_finished())
                    .cloned();
                match open {
                    Some(game) => game,
                    None => {
                        let name = registry.fresh_name();
                        let game = self.create_game(name.clone(), false);
                        registry.public.insert(name, Arc::clone(&game));
                        game
                    }
                }
            }
        };

        game.reserve_seat();
        game
    }

    fn create_game(&self, name: String, named: bool) -> Arc<Game> {
        debug!("Creating {} game {}", if named { "named" } else { "public" }, name);
        Game::new(name, named, self.config.clone(), Arc::clone(&self.recorder))
    }

    /// Feeds decoded keys to the player until quit, end of stream or eviction
    async fn serve_input<R>(self: Arc<Self>, game: Arc<Game>, session: Arc<Session>, mut reader: R)
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let mut decoder = KeyDecoder::new();
        loop {
            tokio::select! {
                key = decoder.next_key(&mut reader) => match key {
                    Ok(Some(Key::Event(event))) => {
                        session.touch();
                        session.player.lock().await.press(event);
                    }
                    Ok(Some(Key::Quit)) => {
                        debug!("Session {} quit", session.id());
                        break;
                    }
                    Ok(None) => {
                        debug!("Session {} reached end of stream", session.id());
                        break;
                    }
                    Err(e) => {
                        warn!("Read error on session {}: {}", session.id(), e);
                        break;
                    }
                },
                _ = session.closed() => break,
            }
        }
        self.evict(&game, &session, GOODBYE).await;
    }

    /// Removes a session from its game and drops the game once it is empty
    pub async fn evict(&self, game: &Arc<Game>, session: &Session, message: &str) {
        game.remove_session(session.id(), message).await;
        debug!(
            "Session {} left game {} after {:?}, idle for {:?}",
            session.id(),
            game.name(),
            session.age(),
            session.idle_for()
        );
        self.release(game);
        self.log_stats("Player left");
    }

    fn release(&self, game: &Arc<Game>) {
        let mut registry = match self.registry.lock() {
            Ok(registry) => registry,
            Err(poisoned) => poisoned.into_inner(),
        };
        if game.release_seat() > 0 {
            return;
        }

        let map = if game.is_named() {
            &mut registry.named
        } else {
            &mut registry.public
        };
        if map
            .get(game.name())
            .map_or(false, |entry| Arc::ptr_eq(entry, game))
        {
            map.remove(game.name());
        }
        drop(registry);

        game.stop();
        info!("Removed empty game {}", game.name());
    }

    pub fn session_count(&self) -> usize {
        self.with_games(|game| game.session_count()).into_iter().sum()
    }

    pub fn game_count(&self) -> usize {
        self.registry
            .lock()
            .map(|r| r.named.len() + r.public.len())
            .unwrap_or(0)
    }

    pub fn named_game(&self, name: &str) -> Option<Arc<Game>> {
        self.registry.lock().ok()?.named.get(name).cloned()
    }

    pub fn public_game(&self, name: &str) -> Option<Arc<Game>> {
        self.registry.lock().ok()?.public.get(name).cloned()
    }

    fn with_games<T>(&self, f: impl Fn(&Arc<Game>) -> T) -> Vec<T> {
        self.registry
            .lock()
            .map(|r| r.named.values().chain(r.public.values()).map(&f).collect())
            .unwrap_or_default()
    }

    fn log_stats(&self, event: &str) {
        info!(
            "{}. Current stats: {} users, {} games",
            event,
            self.session_count(),
            self.game_count()
        );
    }
}
