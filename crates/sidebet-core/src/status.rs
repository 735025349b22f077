//! Viewer-facing bet status derivation.
//!
//! Single authority for the status label every surface renders; call sites
//! must not re-derive WON/LOST themselves.

use crate::model::{Bet, BetStatus, Outcome};

/// UI-facing status as seen by a particular viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    /// Head-to-head challenge awaiting acceptance.
    Pending,
    /// Accepting picks, or closed/judged but carrying no affordance for this
    /// viewer (non-creators never see a judging prompt for a closed bet).
    Open,
    /// Closed and awaiting a result; shown only to the creator.
    Judge,
    /// Judged and the viewer's pick matched the result.
    Won,
    /// Judged and the viewer's pick missed.
    Lost,
    /// Judged as a push: the bet is void and stakes are refunded.
    Push,
}

impl DisplayStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Open => "OPEN",
            Self::Judge => "JUDGE",
            Self::Won => "WON",
            Self::Lost => "LOST",
            Self::Push => "PUSH",
        }
    }
}

impl std::fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Map a bet's persisted status to what `viewer` should see.
///
/// CLOSED surfaces the judging affordance only to the creator; everyone else
/// keeps seeing OPEN. For JUDGED bets the viewer's own recorded pick is
/// compared against the result; participants in a push see PUSH, and viewers
/// with no pick fall back to OPEN like any other non-participant.
pub fn display_status(bet: &Bet, viewer: &str) -> DisplayStatus {
    match bet.status {
        BetStatus::Pending => DisplayStatus::Pending,
        BetStatus::Open | BetStatus::Cancelled => DisplayStatus::Open,
        BetStatus::Closed => {
            if bet.creator_id == viewer {
                DisplayStatus::Judge
            } else {
                DisplayStatus::Open
            }
        }
        BetStatus::Judged => judged_status(bet, viewer),
    }
}

fn judged_status(bet: &Bet, viewer: &str) -> DisplayStatus {
    let Some(result) = bet.result else {
        // Judged without a result should not exist; treat as still judgeable
        // by the creator.
        return if bet.creator_id == viewer {
            DisplayStatus::Judge
        } else {
            DisplayStatus::Open
        };
    };

    let Some(entry) = bet.pick_of(viewer) else {
        return DisplayStatus::Open;
    };

    match result {
        Outcome::Push => DisplayStatus::Push,
        _ => {
            if result.winning_pick() == Some(entry.pick) {
                DisplayStatus::Won
            } else {
                DisplayStatus::Lost
            }
        }
    }
}
