//! Keystroke decoding and edge detection
//!
//! Each byte read from a session stream maps to at most one key. Escape
//! sequences (arrow keys, telnet negotiation replies) are swallowed whole so
//! their trailing bytes never turn into moves.

use tokio::io::{AsyncRead, AsyncReadExt};

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const ESC: u8 = 0x1b;
const IAC: u8 = 0xff;
const SB: u8 = 0xfa;
const SE: u8 = 0xf0;

/// Discrete per-tick input event for a Player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyEvent {
    Up,
    Down,
    Left,
    Right,
    Action,
    #[default]
    None,
}

/// A decoded keystroke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Event(KeyEvent),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Normal,
    Escape,
    Csi,
    Iac,
    IacOption,
    SubNegotiation,
    SubNegotiationIac,
}

/// Byte-at-a-time decoder from a raw terminal stream to keys
#[derive(Debug)]
pub struct KeyDecoder {
    state: DecodeState,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self {
            state: DecodeState::Normal,
        }
    }

    /// Feeds one byte, returning a key when it completes one
    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match self.state {
            DecodeState::Normal => match byte {
                ESC => {
                    self.state = DecodeState::Escape;
                    None
                }
                IAC => {
                    self.state = DecodeState::Iac;
                    None
                }
                _ => map_key(byte),
            },
            DecodeState::Escape => {
                self.state = if byte == b'[' || byte == b'O' {
                    DecodeState::Csi
                } else {
                    DecodeState::Normal
                };
                None
            }
            DecodeState::Csi => {
                // Parameters and intermediates run until a final byte in 0x40..=0x7e
                if (0x40..=0x7e).contains(&byte) {
                    self.state = DecodeState::Normal;
                }
                None
            }
            DecodeState::Iac => {
                self.state = match byte {
                    0xfb..=0xfe => DecodeState::IacOption,
                    SB => DecodeState::SubNegotiation,
                    _ => DecodeState::Normal,
                };
                None
            }
            DecodeState::IacOption => {
                self.state = DecodeState::Normal;
                None
            }
            DecodeState::SubNegotiation => {
                if byte == IAC {
                    self.state = DecodeState::SubNegotiationIac;
                }
                None
            }
            DecodeState::SubNegotiationIac => {
                self.state = if byte == SE {
                    DecodeState::Normal
                } else {
                    DecodeState::SubNegotiation
                };
                None
            }
        }
    }

    /// Reads until the next key; Ok(None) on end of stream
    pub async fn next_key<R>(&mut self, reader: &mut R) -> std::io::Result<Option<Key>>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = [0u8; 1];
        loop {
            if reader.read(&mut buf).await? == 0 {
                return Ok(None);
            }
            if let Some(key) = self.feed(buf[0]) {
                return Ok(Some(key));
            }
        }
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn map_key(byte: u8) -> Option<Key> {
    let event = match byte {
        b'w' | b'k' => KeyEvent::Up,
        b's' | b'j' => KeyEvent::Down,
        b'a' | b'h' => KeyEvent::Left,
        b'd' | b'l' => KeyEvent::Right,
        b'f' | b' ' => KeyEvent::Action,
        CTRL_C | CTRL_D => return Some(Key::Quit),
        _ => return None,
    };
    Some(Key::Event(event))
}

/// Two-slot history that makes keys fire once per press
///
/// The transport only ever sets the latest key. If the same key is still
/// latched on the next update it collapses to `None`, so one physical press
/// moves the cursor once no matter how many ticks observe it.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyHistory {
    current: KeyEvent,
    previous: KeyEvent,
}

impl KeyHistory {
    pub fn press(&mut self, event: KeyEvent) {
        self.current = event;
    }

    /// Consumes the event for this tick
    pub fn take(&mut self) -> KeyEvent {
        if self.current == self.previous {
            self.current = KeyEvent::None;
        }
        self.previous = self.current;
        self.current
    }
}
