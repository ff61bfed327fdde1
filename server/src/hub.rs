//! Serialized owner of one game's live session set
//!
//! Register, unregister and redraw requests arrive on channels and are handled
//! one at a time by `Hub::run`. Only that loop mutates the set; everything else
//! reads snapshots.

use crate::session::Session;
use log::{debug, warn};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::time::timeout;

pub const HIDE_CURSOR: &[u8] = b"\x1b[?25l";
pub const SHOW_CURSOR: &[u8] = b"\x1b[?25h";

/// Upper bound on a control write so one stalled client cannot hold up the loop
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

struct Register {
    session: Arc<Session>,
    ack: oneshot::Sender<()>,
}

struct Unregister {
    session_id: u64,
    message: String,
    ack: oneshot::Sender<bool>,
}

struct HubReceivers {
    register: mpsc::UnboundedReceiver<Register>,
    unregister: mpsc::UnboundedReceiver<Unregister>,
    redraw: mpsc::Receiver<()>,
}

pub struct Hub {
    sessions: RwLock<HashMap<u64, Arc<Session>>>,
    register_tx: mpsc::UnboundedSender<Register>,
    unregister_tx: mpsc::UnboundedSender<Unregister>,
    redraw_tx: mpsc::Sender<()>,
    receivers: Mutex<Option<HubReceivers>>,
}

impl Hub {
    pub fn new() -> Self {
        let (register_tx, register) = mpsc::unbounded_channel();
        let (unregister_tx, unregister) = mpsc::unbounded_channel();
        // One pending redraw is enough; extra requests coalesce into it
        let (redraw_tx, redraw) = mpsc::channel(1);
        Self {
            sessions: RwLock::new(HashMap::new()),
            register_tx,
            unregister_tx,
            redraw_tx,
            receivers: Mutex::new(Some(HubReceivers {
                register,
                unregister,
                redraw,
            })),
        }
    }

    /// Adds a session and waits until the loop has hidden its cursor
    ///
    /// Returns false if the loop is not running.
    pub async fn register(&self, session: Arc<Session>) -> bool {
        let (ack, done) = oneshot::channel();
        if self.register_tx.send(Register { session, ack }).is_err() {
            return false;
        }
        done.await.is_ok()
    }

    /// Says goodbye to a session, drops it from the set and closes its stream
    ///
    /// Returns true if the session was registered.
    pub async fn unregister(&self, session_id: u64, message: impl Into<String>) -> bool {
        let (ack, done) = oneshot::channel();
        let request = Unregister {
            session_id,
            message: message.into(),
            ack,
        };
        if self.unregister_tx.send(request).is_err() {
            return false;
        }
        done.await.unwrap_or(false)
    }

    /// Asks the loop to render every session; coalesces with a pending request
    pub fn redraw(&self) {
        let _ = self.redraw_tx.try_send(());
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sessions ordered by id, so iteration matches join order
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        let mut sessions: Vec<Arc<Session>> = self
            .sessions
            .read()
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default();
        sessions.sort_by_key(|s| s.id());
        sessions
    }

    /// Drains the three channels until `shutdown` flips
    ///
    /// `render` is spawned once per session on every redraw. Calling this a
    /// second time returns immediately.
    pub async fn run<F, Fut>(&self, render: F, mut shutdown: watch::Receiver<bool>)
    where
        F: Fn(Arc<Session>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Some(mut rx) = self.receivers.lock().await.take() else {
            warn!("Hub loop already started");
            return;
        };

        loop {
            tokio::select! {
                Some(Register { session, ack }) = rx.register.recv() => {
                    self.insert(Arc::clone(&session));
                    if !matches!(timeout(WRITE_TIMEOUT, session.write(HIDE_CURSOR)).await, Ok(Ok(()))) {
                        debug!("Could not hide cursor for session {}", session.id());
                    }
                    let _ = ack.send(());
                }
                Some(request) = rx.unregister.recv() => {
                    let removed = self.remove(request.session_id);
                    if let Some(session) = &removed {
                        let mut goodbye = request.message.into_bytes();
                        goodbye.extend_from_slice(SHOW_CURSOR);
                        if !matches!(timeout(WRITE_TIMEOUT, session.close_with(&goodbye)).await, Ok(Ok(()))) {
                            debug!("Could not send goodbye to session {}", session.id());
                        }
                        // Covers a timed out farewell
                        session.close().await;
                    }
                    let _ = request.ack.send(removed.is_some());
                }
                Some(()) = rx.redraw.recv() => {
                    for session in self.sessions() {
                        tokio::spawn(render(session));
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("Hub loop stopped with {} sessions", self.len());
    }

    fn insert(&self, session: Arc<Session>) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session.id(), session);
        }
    }

    fn remove(&self, session_id: u64) -> Option<Arc<Session>> {
        self.sessions
            .write()
            .ok()
            .and_then(|mut sessions| sessions.remove(&session_id))
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
