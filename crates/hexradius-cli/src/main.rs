//! Command-line entry points for the HexRadius server and headless client.

use clap::{Parser, Subcommand};
use hexradius_net::{client, server, ClientConfig, ServerConfig};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "hexradius", about = "HexRadius game server and client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Host a game.
    Server {
        /// Port to listen on.
        #[arg(long, default_value_t = 24567)]
        port: u16,
        /// Scenario directory.
        #[arg(long, default_value = "scenario")]
        scenario_dir: PathBuf,
        /// Map name (file stem under the scenario directory).
        #[arg(default_value = "hexagon")]
        map: String,
        /// RNG seed; defaults to the current time.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Join a game.
    Client {
        /// Server address, host:port.
        addr: String,
        /// Player name.
        name: String,
        /// Join as a spectator.
        #[arg(long)]
        spectate: bool,
        /// Play moves automatically.
        #[arg(long)]
        bot: bool,
        /// As admin, start the game once this many players joined.
        #[arg(long)]
        start_at: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Server {
            port,
            scenario_dir,
            map,
            seed,
        } => {
            let seed = seed.unwrap_or_else(|| {
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(1)
            });
            server::run(ServerConfig {
                bind: format!("0.0.0.0:{}", port),
                scenario_dir,
                map_name: map,
                seed,
            })
            .await
            .map_err(|e| e.to_string())
        }
        Command::Client {
            addr,
            name,
            spectate,
            bot,
            start_at,
        } => client::run(ClientConfig {
            addr,
            name,
            spectate,
            auto_play: bot,
            start_at,
        })
        .await
        .map_err(|e| e.to_string()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
