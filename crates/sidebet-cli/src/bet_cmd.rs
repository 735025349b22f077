//! CLI bet subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use clap::Subcommand;

use sidebet_core::db::unix_timestamp;
use sidebet_core::filter::{BetFilter, filter_and_search};
use sidebet_core::model::{Bet, BetCategory, BetKind, Outcome, Pick};
use sidebet_core::status::display_status;
use sidebet_core::votes::vote_split;
use sidebet_core::wizard::Wizard;
use sidebet_store::BetService;

/// Bet subcommand actions.
#[derive(Subcommand, Debug)]
pub enum BetAction {
    /// Create a bet (group or head-to-head)
    Create {
        /// The bet question
        question: String,
        /// Group to post the bet in (group bet)
        #[arg(long, conflicts_with = "opponent")]
        group: Option<String>,
        /// Friend to challenge (head-to-head bet)
        #[arg(long)]
        opponent: Option<String>,
        /// Bet type: yes-no or over-under
        #[arg(long, default_value = "yes-no")]
        kind: String,
        /// Longer description
        #[arg(long)]
        description: Option<String>,
        /// Line for over-under bets
        #[arg(long)]
        line: Option<f64>,
        /// Stake in dollars (defaults to the configured default stake)
        #[arg(long)]
        stake: Option<f64>,
        /// Hours until the bet closes
        #[arg(long, default_value = "24")]
        closes_in: i64,
        /// Exact closing time as a Unix timestamp (overrides --closes-in)
        #[arg(long)]
        closes_at: Option<i64>,
    },
    /// Place or replace a pick on an open bet
    Vote {
        /// Bet ID
        id: String,
        /// Your pick: yes, no, over, or under
        pick: String,
        /// Amount to stake
        amount: f64,
    },
    /// Close an open bet to further picks (creator only)
    Close {
        /// Bet ID
        id: String,
    },
    /// Judge a closed bet (creator only)
    Judge {
        /// Bet ID
        id: String,
        /// The result: yes, no, over, under, or push
        result: String,
    },
    /// Accept a pending head-to-head challenge
    Accept {
        /// Bet ID
        id: String,
    },
    /// Decline a pending head-to-head challenge
    Decline {
        /// Bet ID
        id: String,
    },
    /// List your bets
    List {
        /// Filter: all, vote-now, my-bets, results, urgent, h2h
        #[arg(short, long, default_value = "all")]
        filter: String,
        /// Case-insensitive substring match on the question
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show one bet in detail
    Show {
        /// Bet ID
        id: String,
    },
}

pub async fn handle(
    service: &BetService,
    user: &str,
    default_stake: f64,
    action: BetAction,
) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match action {
        BetAction::Create {
            question,
            group,
            opponent,
            kind,
            description,
            line,
            stake,
            closes_in,
            closes_at,
        } => {
            let now = unix_timestamp();
            let mut wizard = Wizard::new(default_stake);

            match (group, opponent) {
                (Some(group_id), None) => {
                    wizard.category = Some(BetCategory::Group);
                    wizard.group_id = Some(group_id);
                }
                (None, Some(challenged_id)) => {
                    wizard.category = Some(BetCategory::HeadToHead);
                    wizard.challenged_id = Some(challenged_id);
                }
                _ => anyhow::bail!("pass exactly one of --group or --opponent"),
            }
            wizard.kind = Some(parse_enum::<BetKind>(&kind)?);
            wizard.line = line;
            wizard.question = question;
            wizard.description = description.unwrap_or_default();
            if let Some(stake) = stake {
                wizard.stake = stake;
            }
            wizard.closes_at = Some(closes_at.unwrap_or(now + closes_in * 3600));

            // The wizard's per-step gating is the validation authority.
            while wizard.step() < wizard.total_steps() {
                wizard.advance(now)?;
            }
            let request = wizard.confirm(now)?;

            let bet = service.create_bet(user, &request).await?;
            writeln!(out, "Created bet {} ({})", bet.id, bet.status.as_str())?;
        }
        BetAction::Vote { id, pick, amount } => {
            let pick = parse_enum::<Pick>(&pick)?;
            let bet = service.vote_bet(&id, user, pick, amount).await?;
            let split = vote_split(&bet.picks, bet.kind);
            writeln!(
                out,
                "Recorded {pick} for {amount:.2}; pot is now {:.2} ({}% / {}%)",
                bet.pot, split.affirmative, split.negative
            )?;
        }
        BetAction::Close { id } => {
            let bet = service.close_bet(&id, user).await?;
            writeln!(out, "Closed bet {} with a pot of {:.2}", bet.id, bet.pot)?;
        }
        BetAction::Judge { id, result } => {
            let result = parse_enum::<Outcome>(&result)?;
            let (bet, outcome) = service.judge_bet(&id, user, result).await?;
            writeln!(out, "Judged {} as {}", bet.id, result)?;
            if outcome.refunded {
                writeln!(out, "All stakes refunded")?;
            }
            for payout in &outcome.payouts {
                writeln!(
                    out,
                    "  {}: staked {:.2}, returned {:.2}",
                    payout.user_id, payout.staked, payout.amount
                )?;
            }
            if !outcome.settlements.is_empty() {
                writeln!(out, "{} settlement(s) recorded", outcome.settlements.len())?;
            }
        }
        BetAction::Accept { id } => {
            let bet = service.accept_challenge(&id, user).await?;
            writeln!(out, "Accepted challenge; bet {} is open", bet.id)?;
        }
        BetAction::Decline { id } => {
            let bet = service.decline_challenge(&id, user).await?;
            writeln!(out, "Declined challenge; bet {} is cancelled", bet.id)?;
        }
        BetAction::List { filter, query } => {
            let filter = parse_filter(&filter)?;
            let bets = service.list_bets(user).await?;
            let now = unix_timestamp();
            let shown =
                filter_and_search(&bets, filter, query.as_deref().unwrap_or(""), user, now);
            if shown.is_empty() {
                writeln!(out, "No bets")?;
            }
            for bet in shown {
                write_bet_line(&mut out, bet, user)?;
            }
        }
        BetAction::Show { id } => {
            let bet = service.get_bet(&id).await?;
            write_bet_detail(&mut out, &bet, user)?;
        }
    }
    Ok(())
}

/// Parse a CLI token into a domain enum: `over-under` becomes `OVER_UNDER`.
fn parse_enum<T>(value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr<Err = sidebet_core::Error>,
{
    Ok(value.trim().to_uppercase().replace('-', "_").parse()?)
}

fn parse_filter(value: &str) -> anyhow::Result<BetFilter> {
    Ok(match value.trim().to_lowercase().as_str() {
        "all" => BetFilter::All,
        "vote-now" => BetFilter::VoteNow,
        "my-bets" => BetFilter::MyBets,
        "results" => BetFilter::Results,
        "urgent" => BetFilter::Urgent,
        "h2h" | "head-to-head" => BetFilter::HeadToHead,
        other => anyhow::bail!("unknown filter: {other}"),
    })
}

fn write_bet_line(out: &mut impl Write, bet: &Bet, viewer: &str) -> io::Result<()> {
    let status = display_status(bet, viewer);
    let split = vote_split(&bet.picks, bet.kind);
    writeln!(
        out,
        "{}  {:<7} {:>3}%/{:<3}% pot {:>8.2}  {}",
        bet.id,
        status.as_str(),
        split.affirmative,
        split.negative,
        bet.pot,
        bet.question
    )
}

fn write_bet_detail(out: &mut impl Write, bet: &Bet, viewer: &str) -> io::Result<()> {
    writeln!(out, "{}", bet.question)?;
    if let Some(ref description) = bet.description {
        writeln!(out, "{description}")?;
    }
    writeln!(out, "  id:       {}", bet.id)?;
    writeln!(out, "  kind:     {}", bet.kind.as_str())?;
    writeln!(out, "  category: {}", bet.category.as_str())?;
    writeln!(
        out,
        "  status:   {} (shown as {})",
        bet.status.as_str(),
        display_status(bet, viewer).as_str()
    )?;
    if let Some(line) = bet.line {
        writeln!(out, "  line:     {line}")?;
    }
    writeln!(out, "  stake:    {:.2}", bet.stake)?;
    writeln!(out, "  pot:      {:.2}", bet.pot)?;
    writeln!(out, "  closes:   {}", bet.closes_at)?;
    if let Some(result) = bet.result {
        writeln!(out, "  result:   {result}")?;
    }
    if !bet.winners.is_empty() {
        writeln!(out, "  winners:  {}", bet.winners.join(", "))?;
    }

    let split = vote_split(&bet.picks, bet.kind);
    writeln!(out, "  split:    {}% / {}%", split.affirmative, split.negative)?;
    let mut picks: Vec<_> = bet.picks.iter().collect();
    picks.sort_by(|a, b| a.0.cmp(b.0));
    for (user_id, entry) in picks {
        writeln!(out, "    {user_id}: {} for {:.2}", entry.pick, entry.amount)?;
    }
    Ok(())
}
