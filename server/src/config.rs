//! Runtime configuration, built once at startup and handed down explicitly

use std::path::PathBuf;
use std::time::Duration;

/// Per-game timing and identity parsing settings
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Player update ticks per second
    pub tick_rate: u32,
    /// Full-frame redraws per second
    pub redraw_rate: u32,
    /// Splits a raw identity into player name and requested game name
    pub separator: char,
}

impl GameConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn redraw_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.redraw_rate.max(1) as f64)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            redraw_rate: 10,
            separator: '#',
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum RecorderConfig {
    Disabled,
    /// Emit records through the logger
    #[default]
    Log,
    /// Append JSON lines to a file
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Negotiate character mode with telnet clients after the identity prompt
    pub telnet: bool,
    pub game: GameConfig,
    pub recorder: RecorderConfig,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 2222,
            telnet: true,
            game: GameConfig::default(),
            recorder: RecorderConfig::default(),
        }
    }
}
