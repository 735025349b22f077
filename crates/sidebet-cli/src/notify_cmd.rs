//! CLI notification subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use clap::Subcommand;

use sidebet_store::BetService;

/// Notification subcommand actions.
#[derive(Subcommand, Debug)]
pub enum NotifyAction {
    /// List your notifications, newest first
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },
    /// Mark one notification read
    Read {
        /// Notification ID
        id: String,
    },
    /// Mark all notifications read
    ReadAll,
    /// Delete all notifications
    Clear,
}

pub async fn handle(service: &BetService, user: &str, action: NotifyAction) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        NotifyAction::List { unread } => {
            let notifications = service.notifications(user).await?;
            let mut shown = 0;
            for notification in notifications {
                if unread && notification.read {
                    continue;
                }
                let marker = if notification.read { " " } else { "*" };
                writeln!(
                    out,
                    "{marker} {}  [{}] {}",
                    notification.id, notification.kind, notification.message
                )?;
                shown += 1;
            }
            if shown == 0 {
                writeln!(out, "No notifications")?;
            }
        }
        NotifyAction::Read { id } => {
            service.mark_notification_read(&id).await?;
            writeln!(out, "Marked {id} read")?;
        }
        NotifyAction::ReadAll => {
            let updated = service.mark_all_notifications_read(user).await?;
            writeln!(out, "Marked {updated} notification(s) read")?;
        }
        NotifyAction::Clear => {
            let deleted = service.clear_notifications(user).await?;
            writeln!(out, "Deleted {deleted} notification(s)")?;
        }
    }
    Ok(())
}
