//! Sidebet CLI
//!
//! Command-line interface for the sidebet ledger: create and judge bets,
//! manage groups and friends, and settle up.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use sidebet_core::config;
use sidebet_core::tracing_init::init_tracing;
use sidebet_store::{BetService, Database};

mod bet_cmd;
mod friend_cmd;
mod group_cmd;
mod notify_cmd;
mod settle_cmd;

#[derive(Parser, Debug)]
#[command(name = "sidebet")]
#[command(version, about = "Social betting ledger CLI", long_about = None)]
struct Cli {
    /// Acting user ID
    #[arg(short, long, env = "SIDEBET_USER")]
    user: String,

    /// Database path (defaults to the platform data directory)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Emit structured JSON log lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create, vote on, and judge bets
    Bet {
        #[command(subcommand)]
        action: bet_cmd::BetAction,
    },
    /// Manage betting groups
    Group {
        #[command(subcommand)]
        action: group_cmd::GroupAction,
    },
    /// Manage friendships
    Friend {
        #[command(subcommand)]
        action: friend_cmd::FriendAction,
    },
    /// Balances and settlements
    Settle {
        #[command(subcommand)]
        action: settle_cmd::SettleAction,
    },
    /// Notifications
    Notifications {
        #[command(subcommand)]
        action: notify_cmd::NotifyAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing("sidebet=warn", cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "Starting sidebet CLI");

    let config = config::load_config(None)?;
    let database_path = cli
        .database
        .or_else(|| config.store.database_path.clone())
        .or_else(config::database_path)
        .context("could not resolve a database path; pass --database")?;

    let db = Database::open(&database_path).await?;
    let service = BetService::new(db);

    match cli.command {
        Command::Bet { action } => {
            bet_cmd::handle(&service, &cli.user, config.bets.default_stake, action).await
        }
        Command::Group { action } => group_cmd::handle(&service, &cli.user, action).await,
        Command::Friend { action } => friend_cmd::handle(&service, &cli.user, action).await,
        Command::Settle { action } => settle_cmd::handle(&service, &cli.user, action).await,
        Command::Notifications { action } => notify_cmd::handle(&service, &cli.user, action).await,
    }
}
