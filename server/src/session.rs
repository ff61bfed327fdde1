//! One connected client: its output stream and its Player

use crate::player::Player;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex};

pub type SessionWriter = Box<dyn AsyncWrite + Send + Unpin>;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_session_id() -> u64 {
    NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

pub struct Session {
    id: u64,
    created_at: Instant,
    last_action: std::sync::Mutex<Instant>,
    writer: Mutex<Option<SessionWriter>>,
    pub player: Mutex<Player>,
    closed_tx: watch::Sender<bool>,
}

impl Session {
    pub fn new(id: u64, writer: SessionWriter, player: Player) -> Self {
        let now = Instant::now();
        let (closed_tx, _) = watch::channel(false);
        Self {
            id,
            created_at: now,
            last_action: std::sync::Mutex::new(now),
            writer: Mutex::new(Some(writer)),
            player: Mutex::new(player),
            closed_tx,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Marks input activity
    pub fn touch(&self) {
        if let Ok(mut last) = self.last_action.lock() {
            *last = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_action
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }

    /// Writes and flushes one buffer; fails once the session has been closed
    pub async fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            Some(w) => {
                w.write_all(bytes).await?;
                w.flush().await
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "session closed",
            )),
        }
    }

    /// Writes a last message and closes, with no other write in between
    pub async fn close_with(&self, farewell: &[u8]) -> std::io::Result<()> {
        let taken = self.writer.lock().await.take();
        let result = match taken {
            Some(mut w) => {
                let written = w.write_all(farewell).await;
                let _ = w.flush().await;
                let _ = w.shutdown().await;
                written
            }
            None => Ok(()),
        };
        self.closed_tx.send_replace(true);
        result
    }

    /// Shuts the stream down; later writes fail and `closed()` resolves
    pub async fn close(&self) {
        if let Some(mut w) = self.writer.lock().await.take() {
            let _ = w.shutdown().await;
        }
        self.closed_tx.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_tx.borrow()
    }

    /// Resolves once `close` has run
    pub async fn closed(&self) {
        let mut rx = self.closed_tx.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
