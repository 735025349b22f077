//! Bet list filtering and text search.
//!
//! Pure predicates over a bet list. Filter and search compose by sequential
//! application (filter first, then search); both preserve the input order
//! and are idempotent.

use crate::model::{Bet, BetCategory, BetStatus};
use crate::status::{DisplayStatus, display_status};

/// Seconds in the urgency window before a closing deadline.
const URGENT_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Home-screen filter pills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetFilter {
    All,
    /// Open bets the viewer has not picked on yet.
    VoteNow,
    /// Bets the viewer has a recorded pick on.
    MyBets,
    /// Bets the viewer won or lost.
    Results,
    /// Open bets closing within the next 24 hours (exclusive on both ends).
    Urgent,
    /// Head-to-head bets only.
    HeadToHead,
}

impl BetFilter {
    /// Whether a single bet passes this filter for `viewer` at time `now`.
    pub fn matches(&self, bet: &Bet, viewer: &str, now: i64) -> bool {
        match self {
            Self::All => true,
            Self::VoteNow => bet.status == BetStatus::Open && bet.pick_of(viewer).is_none(),
            Self::MyBets => bet.pick_of(viewer).is_some(),
            Self::Results => matches!(
                display_status(bet, viewer),
                DisplayStatus::Won | DisplayStatus::Lost
            ),
            Self::Urgent => {
                let remaining = bet.closes_at - now;
                bet.status == BetStatus::Open && remaining > 0 && remaining < URGENT_WINDOW_SECS
            }
            Self::HeadToHead => bet.category == BetCategory::HeadToHead,
        }
    }
}

/// Apply a filter to a bet list, preserving order.
pub fn filter_bets<'a>(
    bets: &'a [Bet],
    filter: BetFilter,
    viewer: &str,
    now: i64,
) -> Vec<&'a Bet> {
    bets.iter().filter(|b| filter.matches(b, viewer, now)).collect()
}

/// Case-insensitive substring search against the bet question.
pub fn search_bets<'a>(bets: &[&'a Bet], query: &str) -> Vec<&'a Bet> {
    if query.is_empty() {
        return bets.to_vec();
    }
    let needle = query.to_lowercase();
    bets.iter()
        .filter(|b| b.question.to_lowercase().contains(&needle))
        .copied()
        .collect()
}

/// Filter then search, the composition every list surface uses.
pub fn filter_and_search<'a>(
    bets: &'a [Bet],
    filter: BetFilter,
    query: &str,
    viewer: &str,
    now: i64,
) -> Vec<&'a Bet> {
    let filtered = filter_bets(bets, filter, viewer, now);
    search_bets(&filtered, query)
}
