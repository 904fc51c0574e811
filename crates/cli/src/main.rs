//! PathCoach CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config
//! - `chat`: Talk to the coach, one message or interactively
//! - `advance`: Answer the current pathway step without the model
//! - `pathways`: Show a pathway catalog
//! - `progress`: Show a user's progress records
//! - `history`: Show a user's chat log

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "pathcoach",
    about = "PathCoach — a tool-using coaching assistant",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration file
    Onboard,

    /// Chat with the coach
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// User the conversation belongs to
        #[arg(short, long, env = "PATHCOACH_USER", default_value = "local-user")]
        user: String,

        /// Pathway catalog JSON file
        #[arg(short, long)]
        pathways: Option<PathBuf>,

        /// Abandon a reply that takes longer than this
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Record an answer for the current pathway step
    Advance {
        /// The answer to record
        answer: String,

        #[arg(short, long, env = "PATHCOACH_USER", default_value = "local-user")]
        user: String,

        /// Pathway catalog JSON file
        #[arg(short, long)]
        pathways: PathBuf,
    },

    /// List the pathways in a catalog, or the steps of one
    Pathways {
        /// Pathway catalog JSON file
        file: PathBuf,

        /// Show the steps of this pathway
        #[arg(long)]
        id: Option<String>,
    },

    /// Show a user's progress records
    Progress {
        #[arg(short, long, env = "PATHCOACH_USER", default_value = "local-user")]
        user: String,
    },

    /// Show a user's chat log
    History {
        #[arg(short, long, env = "PATHCOACH_USER", default_value = "local-user")]
        user: String,

        /// Only the most recent entries
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run()?,
        Commands::Chat {
            message,
            user,
            pathways,
            timeout_secs,
        } => commands::chat::run(message, user, pathways, timeout_secs).await?,
        Commands::Advance {
            answer,
            user,
            pathways,
        } => commands::advance::run(&user, &pathways, &answer).await?,
        Commands::Pathways { file, id } => commands::pathways::run(&file, id.as_deref())?,
        Commands::Progress { user } => commands::records::progress(&user).await?,
        Commands::History { user, limit } => commands::records::history(&user, limit).await?,
    }

    Ok(())
}
