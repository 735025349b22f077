//! Vote aggregation: percentage split of picks for the meter.

use std::collections::HashMap;

use crate::model::{BetKind, Pick, PickEntry};

/// Integer percentage split. `affirmative` is the YES share for yes/no bets
/// and the OVER share for over/under bets; the two always sum to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteSplit {
    pub affirmative: u8,
    pub negative: u8,
}

/// Compute the percentage split of a bet's picks.
///
/// Zero picks yields an even 50/50 so the meter still renders sensibly.
/// Otherwise the affirmative share is rounded to the nearest integer and the
/// negative side is derived as the complement.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn vote_split(picks: &HashMap<String, PickEntry>, kind: BetKind) -> VoteSplit {
    let total = picks.len();
    if total == 0 {
        return VoteSplit {
            affirmative: 50,
            negative: 50,
        };
    }

    let affirmative_side = match kind {
        BetKind::YesNo => Pick::Yes,
        BetKind::OverUnder => Pick::Over,
    };
    let affirmative_count = picks.values().filter(|e| e.pick == affirmative_side).count();
    let affirmative = ((affirmative_count as f64 / total as f64) * 100.0).round() as u8;

    VoteSplit {
        affirmative,
        negative: 100 - affirmative,
    }
}
