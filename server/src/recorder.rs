//! Best-effort game history sink
//!
//! Games push a full `GameRecord` on start, after every move and at the end.
//! Pushing never blocks and never fails the game; a full queue or a broken
//! file only costs the record.

use crate::config::RecorderConfig;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use uuid::Uuid;

const QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameRecord {
    pub id: Uuid,
    pub name: String,
    pub white_player: String,
    pub black_player: String,
    /// Unix ms
    pub start_time: u64,
    /// Unix ms, set once the game is over
    pub end_time: Option<u64>,
    /// Result such as "1-0", empty while in progress
    pub outcome: String,
    pub moves: String,
}

pub trait Recorder: Send + Sync {
    fn push(&self, record: GameRecord);
}

/// Drops everything
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn push(&self, _record: GameRecord) {}
}

#[derive(Debug, Clone)]
enum Sink {
    Log,
    File(PathBuf),
}

/// Queues records for a background writer task
pub struct ChannelRecorder {
    tx: mpsc::Sender<GameRecord>,
}

impl ChannelRecorder {
    /// Spawns the writer; must be called inside a tokio runtime
    pub fn log() -> Self {
        Self::spawn(Sink::Log)
    }

    pub fn file(path: PathBuf) -> Self {
        Self::spawn(Sink::File(path))
    }

    fn spawn(sink: Sink) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        tokio::spawn(drain(rx, sink));
        Self { tx }
    }
}

impl Recorder for ChannelRecorder {
    fn push(&self, record: GameRecord) {
        if let Err(e) = self.tx.try_send(record) {
            warn!("Dropping game record: {}", e);
        }
    }
}

/// Builds the recorder the config asks for
pub fn from_config(config: &RecorderConfig) -> Box<dyn Recorder> {
    match config {
        RecorderConfig::Disabled => Box::new(NoopRecorder),
        RecorderConfig::Log => Box::new(ChannelRecorder::log()),
        RecorderConfig::File(path) => Box::new(ChannelRecorder::file(path.clone())),
    }
}

async fn drain(mut rx: mpsc::Receiver<GameRecord>, sink: Sink) {
    while let Some(record) = rx.recv().await {
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize game record {}: {}", record.id, e);
                continue;
            }
        };
        match &sink {
            Sink::Log => info!(target: "recorder", "{}", line),
            Sink::File(path) => {
                if let Err(e) = append_line(path, &line).await {
                    warn!("Failed to write game record to {}: {}", path.display(), e);
                }
            }
        }
    }
}

async fn append_line(path: &PathBuf, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.write_all(b"\n").await?;
    file.flush().await
}
