//! CLI friend subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use clap::Subcommand;

use sidebet_core::model::Friendship;
use sidebet_store::BetService;

/// Friend subcommand actions.
#[derive(Subcommand, Debug)]
pub enum FriendAction {
    /// Send a friend request
    Add {
        /// User to befriend
        user_id: String,
    },
    /// Accept a pending friend request
    Accept {
        /// Friendship ID (see `friend pending`)
        id: String,
    },
    /// Remove a friend or decline a pending request
    Remove {
        /// Friendship ID
        id: String,
    },
    /// List your friends
    List,
    /// List requests waiting on your answer
    Pending,
}

fn counterparty<'a>(friendship: &'a Friendship, viewer: &str) -> &'a str {
    if friendship.user1_id == viewer {
        &friendship.user2_id
    } else {
        &friendship.user1_id
    }
}

pub async fn handle(service: &BetService, user: &str, action: FriendAction) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        FriendAction::Add { user_id } => {
            let friendship = service.request_friend(user, &user_id).await?;
            writeln!(out, "Request {} sent to {user_id}", friendship.id)?;
        }
        FriendAction::Accept { id } => {
            let friendship = service.accept_friend(&id, user).await?;
            writeln!(out, "You are now friends with {}", counterparty(&friendship, user))?;
        }
        FriendAction::Remove { id } => {
            service.remove_friend(&id).await?;
            writeln!(out, "Removed friendship {id}")?;
        }
        FriendAction::List => {
            let friends = service.list_friends(user).await?;
            if friends.is_empty() {
                writeln!(out, "No friends yet")?;
            }
            for friendship in friends {
                writeln!(out, "{}  {}", friendship.id, counterparty(&friendship, user))?;
            }
        }
        FriendAction::Pending => {
            let pending = service.pending_friend_requests(user).await?;
            if pending.is_empty() {
                writeln!(out, "No pending requests")?;
            }
            for friendship in pending {
                writeln!(out, "{}  from {}", friendship.id, friendship.requested_by)?;
            }
        }
    }
    Ok(())
}
