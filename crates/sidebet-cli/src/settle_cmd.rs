//! CLI settlement subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use clap::Subcommand;

use sidebet_store::BetService;

/// Settlement subcommand actions.
#[derive(Subcommand, Debug)]
pub enum SettleAction {
    /// Net balance per counterparty, with the per-bet breakdown
    Balances,
    /// List your unsettled obligations
    List,
    /// Mark a settlement paid
    Pay {
        /// Settlement ID
        id: String,
    },
}

pub async fn handle(service: &BetService, user: &str, action: SettleAction) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        SettleAction::Balances => {
            let balances = service.balances(user).await?;
            if balances.is_empty() {
                writeln!(out, "All settled up")?;
            }
            for balance in balances {
                if balance.net >= 0.0 {
                    writeln!(out, "{} owes you {:.2}", balance.user_id, balance.net)?;
                } else {
                    writeln!(out, "You owe {} {:.2}", balance.user_id, -balance.net)?;
                }
                for share in &balance.shares {
                    writeln!(out, "    {}: {:+.2}", share.bet_id, share.amount)?;
                }
            }
        }
        SettleAction::List => {
            let settlements = service.pending_settlements(user).await?;
            if settlements.is_empty() {
                writeln!(out, "No pending settlements")?;
            }
            for settlement in settlements {
                writeln!(
                    out,
                    "{}  {} owes {} {:.2}",
                    settlement.id, settlement.user2_id, settlement.user1_id, settlement.amount
                )?;
            }
        }
        SettleAction::Pay { id } => {
            let settlement = service.settle(&id, user).await?;
            writeln!(out, "Settlement {} marked paid ({:.2})", settlement.id, settlement.amount)?;
        }
    }
    Ok(())
}
