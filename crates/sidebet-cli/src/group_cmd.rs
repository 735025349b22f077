//! CLI group subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use clap::Subcommand;

use sidebet_store::BetService;

/// Group subcommand actions.
#[derive(Subcommand, Debug)]
pub enum GroupAction {
    /// Create a group
    Create {
        /// Group name
        name: String,
        /// Description
        #[arg(long)]
        description: Option<String>,
        /// Largest stake allowed on bets in this group
        #[arg(long)]
        max_wager: Option<f64>,
    },
    /// Join a group by invite code
    Join {
        /// Invite code (case-insensitive)
        code: String,
    },
    /// Leave a group
    Leave {
        /// Group ID
        id: String,
    },
    /// Delete a group (admin only)
    Delete {
        /// Group ID
        id: String,
    },
    /// List your groups
    List,
    /// Show a group and its members
    Show {
        /// Group ID
        id: String,
    },
    /// List a group's bets
    Bets {
        /// Group ID
        id: String,
    },
}

pub async fn handle(service: &BetService, user: &str, action: GroupAction) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        GroupAction::Create {
            name,
            description,
            max_wager,
        } => {
            let group = service.create_group(user, &name, description, max_wager).await?;
            writeln!(
                out,
                "Created group {} with invite code {}",
                group.id, group.invite_code
            )?;
        }
        GroupAction::Join { code } => {
            let group = service.join_group_by_code(user, &code).await?;
            writeln!(out, "Joined {} ({} members)", group.name, group.members.len())?;
        }
        GroupAction::Leave { id } => {
            service.leave_group(user, &id).await?;
            writeln!(out, "Left group {id}")?;
        }
        GroupAction::Delete { id } => {
            service.delete_group(&id, user).await?;
            writeln!(out, "Deleted group {id}")?;
        }
        GroupAction::List => {
            let groups = service.list_groups(user).await?;
            if groups.is_empty() {
                writeln!(out, "No groups")?;
            }
            for group in groups {
                writeln!(
                    out,
                    "{}  {:<24} {} member(s), {} active bet(s)",
                    group.id,
                    group.name,
                    group.members.len(),
                    group.active_bets
                )?;
            }
        }
        GroupAction::Show { id } => {
            let group = service.database().get_group(&id).await?;
            writeln!(out, "{}", group.name)?;
            if let Some(ref description) = group.description {
                writeln!(out, "{description}")?;
            }
            writeln!(out, "  invite code: {}", group.invite_code)?;
            if let Some(cap) = group.max_wager {
                writeln!(out, "  max wager:   {cap:.2}")?;
            }
            writeln!(out, "  active bets: {}", group.active_bets)?;
            for member in &group.members {
                let role = if group.is_admin(member) { " (admin)" } else { "" };
                writeln!(out, "    {member}{role}")?;
            }
        }
        GroupAction::Bets { id } => {
            let bets = service.database().list_bets_by_group(&id).await?;
            if bets.is_empty() {
                writeln!(out, "No bets")?;
            }
            for bet in bets {
                writeln!(
                    out,
                    "{}  {:<9} pot {:>8.2}  {}",
                    bet.id,
                    bet.status.as_str(),
                    bet.pot,
                    bet.question
                )?;
            }
        }
    }
    Ok(())
}
