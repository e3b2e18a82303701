use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use technanas_core::{FirestoreClient, MemoryRemoteStore, RemoteStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{AccountCommand, AnnouncementCommand, ConfigCommand, FarmCommand, FaqCommand};
use technanas::config::Config;
use technanas::db::Cache;
use technanas::seed;
use technanas::session::Session;
use technanas::sync::{AccountSync, AnnouncementSync, FarmSync};

#[derive(Parser)]
#[command(name = "nanas")]
#[command(version)]
#[command(about = "TechNanas community directory", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Work from the local cache only; remote writes fail
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register, sign in and manage your profile
    Account(AccountCommand),

    /// Browse and publish announcements
    Announcement(AnnouncementCommand),

    /// Manage your farms and business locations
    Farm(FarmCommand),

    /// Frequently asked questions
    Faq(FaqCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "technanas=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Builds the process-wide remote store.
fn open_remote(config: &Config, offline: bool) -> Result<Arc<dyn RemoteStore>, Box<dyn std::error::Error>> {
    if offline {
        return Ok(Arc::new(MemoryRemoteStore::unreachable()));
    }
    let firestore = config.remote.firestore().ok_or(
        "Remote store not configured. Set remote.project_id in the config file or TECHNANAS_FIRESTORE_PROJECT, or pass --offline.",
    )?;
    Ok(Arc::new(FirestoreClient::new(firestore)?))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    let command = match cli.command {
        Some(Commands::Config(cmd)) => return cmd.run(&config),
        Some(command) => command,
        None => {
            println!("Use --help to see available commands");
            return Ok(());
        }
    };

    // FAQs never need the remote store.
    let offline = cli.offline
        || (matches!(command, Commands::Faq(_)) && !config.remote.is_configured());
    let remote = open_remote(&config, offline)?;
    let cache = Cache::open(&config.database_path.value).await?;

    let announcements = AnnouncementSync::new(&cache, remote.clone());
    seed::prepopulate(&cache, &announcements).await?;

    let mut session = Session::load(config.session_path.value.clone())?;

    match command {
        Commands::Account(cmd) => {
            let accounts = AccountSync::new(&cache, remote);
            cmd.run(&accounts, &mut session).await?;
        }
        Commands::Announcement(cmd) => {
            cmd.run(&announcements, &session).await?;
        }
        Commands::Farm(cmd) => {
            let farms = FarmSync::new(&cache, remote);
            cmd.run(&farms, &session).await?;
        }
        Commands::Faq(cmd) => {
            cmd.run(&cache.faqs()).await?;
        }
        Commands::Config(_) => {}
    }

    Ok(())
}
