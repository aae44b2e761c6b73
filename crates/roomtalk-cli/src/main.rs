//! roomtalk CLI: join a chat room and talk with other participants and the
//! agent.

mod chat;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use roomtalk_backend::BackendClient;
use roomtalk_session::profile::DEFAULT_ROOM;
use roomtalk_session::setup::{config_dir, forget_profile, load_config, load_profile, save_profile};
use roomtalk_session::{Config, SessionProfile, TransportKind};

#[derive(Parser)]
#[command(
    name = "roomtalk",
    about = "Realtime chat rooms with an agent",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Backend address, overriding the config file.
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remember who you are and which room to join.
    Login {
        /// Display name in the room.
        #[arg(short, long)]
        identity: String,

        /// Room to join.
        #[arg(short, long, default_value = DEFAULT_ROOM)]
        room: String,
    },

    /// Forget the remembered identity.
    Logout,

    /// Show the remembered identity and room.
    Whoami,

    /// Check that the backend and its agent are reachable.
    Status,

    /// Join the room and chat interactively.
    Chat {
        /// Use an in-process room instead of the configured transport.
        #[arg(long)]
        local: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(url) = cli.backend_url {
        config.client.backend_url = url;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.client.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let dir = config_dir();
    match cli.command {
        Commands::Login { identity, room } => {
            let profile = SessionProfile::new(&identity, &room)?;
            save_profile(&dir, &profile)?;
            println!("Logged in as {} (room {})", profile.identity, profile.room);
        }
        Commands::Logout => {
            forget_profile(&dir)?;
            println!("Logged out");
        }
        Commands::Whoami => {
            let profile = require_profile(&dir)?;
            println!("{} (room {})", profile.identity, profile.room);
        }
        Commands::Status => status(&config).await?,
        Commands::Chat { local } => {
            if local {
                config.client.transport = TransportKind::Local;
            }
            let profile = require_profile(&dir)?;
            chat::run(profile, &config, &dir).await?;
        }
    }

    Ok(())
}

fn require_profile(dir: &std::path::Path) -> anyhow::Result<SessionProfile> {
    match load_profile(dir)? {
        Some(profile) => Ok(profile),
        None => bail!("no identity chosen yet; run `roomtalk login --identity <name>` first"),
    }
}

async fn status(config: &Config) -> anyhow::Result<()> {
    let client = BackendClient::new(&config.client.backend_url)?;
    println!("Backend: {}", client.base_url());

    let healthy = client
        .health()
        .await
        .context("backend is not reachable")?;
    println!("Health:  {}", if healthy { "ok" } else { "degraded" });

    let agent = client.agent_status().await?;
    println!(
        "Agent:   llm {}, memory {}",
        configured(agent.llm_configured),
        configured(agent.memory_configured)
    );
    Ok(())
}

fn configured(flag: bool) -> &'static str {
    if flag {
        "configured"
    } else {
        "not configured"
    }
}
