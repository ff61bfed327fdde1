//! TCP front end: identity handshake, then hand-off to the game manager

use crate::config::ServerConfig;
use crate::game_manager::{AdmitError, GameManager};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::interval;

pub const MAX_IDENTITY_LEN: usize = 64;
pub const PROMPT: &[u8] = b"Welcome to terminal chess.\r\nEnter your name, or name#game to play a friend: ";

const IAC: u8 = 0xff;
const WILL: u8 = 0xfb;
const DONT: u8 = 0xfe;
const SB: u8 = 0xfa;
const SE: u8 = 0xf0;
const ECHO: u8 = 0x01;
const SUPPRESS_GO_AHEAD: u8 = 0x03;

/// Puts telnet clients into character-at-a-time mode without local echo
pub const CHARACTER_MODE: [u8; 6] = [IAC, WILL, ECHO, IAC, WILL, SUPPRESS_GO_AHEAD];

const STATS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("connection closed before an identity was sent")]
    Closed,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Admit(#[from] AdmitError),
}

pub struct Server {
    listener: TcpListener,
    manager: Arc<GameManager>,
    telnet: bool,
}

impl Server {
    pub async fn bind(config: &ServerConfig, manager: Arc<GameManager>) -> Result<Self, TransportError> {
        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| TransportError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!("Server listening on {}", addr);
        Ok(Self {
            listener,
            manager,
            telnet: config.telnet,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the task is dropped
    pub async fn run(self) -> Result<(), TransportError> {
        let mut stats = interval(STATS_INTERVAL);
        let mut last_stats = (0, 0);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let manager = Arc::clone(&self.manager);
                        let telnet = self.telnet;
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, manager, telnet).await {
                                warn!("Connection from {} dropped: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                },
                _ = stats.tick() => {
                    let current = (self.manager.session_count(), self.manager.game_count());
                    if current != last_stats {
                        info!("Current stats: {} users, {} games", current.0, current.1);
                        last_stats = current;
                    }
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    manager: Arc<GameManager>,
    telnet: bool,
) -> Result<(), TransportError> {
    debug!("Connection from {}", addr);
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.into_split();

    writer.write_all(PROMPT).await?;
    let identity = read_identity(&mut reader).await?;
    if telnet {
        writer.write_all(&CHARACTER_MODE).await?;
    }

    let admission = manager.admit(reader, writer, &identity).await?;
    info!(
        "{} joined game {} from {}",
        identity.trim(),
        admission.game.name(),
        addr
    );
    Ok(())
}

/// Reads one identity line, at most `MAX_IDENTITY_LEN` bytes are kept
///
/// Telnet commands and other control bytes are dropped. End of stream
/// after some text counts as the end of the line.
pub async fn read_identity<R>(reader: &mut R) -> Result<String, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut line = Vec::with_capacity(MAX_IDENTITY_LEN);
    let mut saw_any = false;
    let mut byte = [0u8; 1];

    loop {
        if reader.read(&mut byte).await? == 0 {
            if !saw_any {
                return Err(TransportError::Closed);
            }
            break;
        }
        saw_any = true;
        match byte[0] {
            b'\n' => break,
            IAC => skip_telnet_command(reader).await?,
            b if b < 0x20 || b == 0x7f => {}
            b => {
                if line.len() < MAX_IDENTITY_LEN {
                    line.push(b);
                }
            }
        }
    }

    Ok(String::from_utf8_lossy(&line).into_owned())
}

async fn skip_telnet_command<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let command = reader.read_u8().await?;
    match command {
        WILL..=DONT => {
            reader.read_u8().await?;
        }
        SB => loop {
            if reader.read_u8().await? == IAC && reader.read_u8().await? == SE {
                break;
            }
        },
        _ => {}
    }
    Ok(())
}
