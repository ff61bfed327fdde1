use clap::Parser;
use log::{error, info};
use server::config::{GameConfig, RecorderConfig, ServerConfig};
use server::game_manager::GameManager;
use server::network::Server;
use server::recorder;
use std::path::PathBuf;
use std::sync::Arc;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "Multiplayer chess for the terminal")]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "2222")]
    port: u16,
    /// Player update ticks per second
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
    /// Board redraws per second
    #[clap(short, long, default_value = "10")]
    redraw_rate: u32,
    /// Splits "player<sep>game" in the identity line
    #[clap(short, long, default_value = "#")]
    separator: char,
    /// Do not record games
    #[clap(long)]
    disable_recorder: bool,
    /// Append game records to this file instead of the log
    #[clap(long)]
    record_file: Option<PathBuf>,
    /// Skip telnet option negotiation
    #[clap(long)]
    no_telnet: bool,
    /// Log at debug level unless RUST_LOG says otherwise
    #[clap(short, long)]
    debug: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let recorder = match (self.disable_recorder, self.record_file) {
            (true, _) => RecorderConfig::Disabled,
            (false, Some(path)) => RecorderConfig::File(path),
            (false, None) => RecorderConfig::Log,
        };
        ServerConfig {
            host: self.host,
            port: self.port,
            telnet: !self.no_telnet,
            game: GameConfig {
                tick_rate: self.tick_rate,
                redraw_rate: self.redraw_rate,
                separator: self.separator,
            },
            recorder,
        }
    }
}

/// Parses arguments, binds the listener, and serves until Ctrl+C
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = args.into_config();
    let recorder = Arc::from(recorder::from_config(&config.recorder));
    let manager = GameManager::new(config.game.clone(), recorder);

    // Binding is the one failure that ends the process
    let server = Server::bind(&config, manager).await?;
    let server_handle = tokio::spawn(server.run());

    tokio::select! {
        result = server_handle => {
            match result {
                Ok(Err(e)) => error!("Server stopped: {}", e),
                Err(e) => error!("Server task panicked: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
