//! Balance aggregation and payout computation.
//!
//! `net_balances` folds pending settlements into per-counterparty net
//! amounts with true per-bet contributions. `compute_payouts` is the
//! settlement generation step of judging: proportional pot split among
//! winners and one settlement draft per loser→winner pair.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::{Bet, BetShare, Outcome, Settlement};

/// Net position against one counterparty. Positive `net` means the
/// counterparty owes the viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyBalance {
    pub user_id: String,
    pub net: f64,
    pub shares: Vec<BetShare>,
}

/// Aggregate the viewer's pending settlements into net amounts per
/// counterparty, with the stored per-bet breakdown carried through.
///
/// Settled records are skipped. Output is ordered by counterparty id so the
/// result is deterministic. Share amounts are signed the same way as the
/// net: positive when owed to the viewer.
pub fn net_balances(viewer: &str, settlements: &[Settlement]) -> Vec<CounterpartyBalance> {
    let mut by_counterparty: BTreeMap<String, CounterpartyBalance> = BTreeMap::new();

    for settlement in settlements {
        if settlement.settled {
            continue;
        }
        let (counterparty, sign) = if settlement.user1_id == viewer {
            (settlement.user2_id.as_str(), 1.0)
        } else if settlement.user2_id == viewer {
            (settlement.user1_id.as_str(), -1.0)
        } else {
            continue;
        };

        let entry = by_counterparty
            .entry(counterparty.to_string())
            .or_insert_with(|| CounterpartyBalance {
                user_id: counterparty.to_string(),
                net: 0.0,
                shares: Vec::new(),
            });

        entry.net = round_cents(entry.net + sign * settlement.amount);
        for share in &settlement.shares {
            entry.shares.push(BetShare {
                bet_id: share.bet_id.clone(),
                amount: round_cents(sign * share.amount),
            });
        }
    }

    by_counterparty.into_values().collect()
}

/// Gross amount returned to one participant after judging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub user_id: String,
    pub staked: f64,
    /// Amount returned: proportional pot share for winners, the original
    /// stake for refunds.
    pub amount: f64,
}

/// One pending obligation produced by judging a bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementDraft {
    /// Who owes.
    pub debtor: String,
    /// Who is owed.
    pub creditor: String,
    pub amount: f64,
    pub shares: Vec<BetShare>,
}

/// Everything judging derives from a bet and its result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeOutcome {
    pub winners: Vec<String>,
    pub payouts: Vec<Payout>,
    pub settlements: Vec<SettlementDraft>,
    /// True when stakes were refunded (push, or no opposing side).
    pub refunded: bool,
}

/// Compute payouts and settlement drafts for a judged bet.
///
/// Winners are participants whose pick matches the result; each receives a
/// pot share proportional to their stake. A push refunds every stake and
/// yields no settlements, as does a bet where everyone landed on the same
/// side (no opposing stakes to claim). Each loser's stake is distributed
/// across the winners proportionally, one draft per loser→winner pair,
/// rounded to cents.
pub fn compute_payouts(bet: &Bet, result: Outcome) -> JudgeOutcome {
    let mut participants: Vec<(&String, &crate::model::PickEntry)> = bet.picks.iter().collect();
    // HashMap order is arbitrary; keep the math and output deterministic.
    participants.sort_by(|a, b| a.0.cmp(b.0));

    let Some(winning_pick) = result.winning_pick() else {
        return refund_all(&participants);
    };

    let (winners, losers): (Vec<_>, Vec<_>) = participants
        .iter()
        .partition(|(_, entry)| entry.pick == winning_pick);

    if winners.is_empty() || losers.is_empty() {
        return refund_all(&participants);
    }

    let pot: f64 = participants.iter().map(|(_, e)| e.amount).sum();
    let winner_stake: f64 = winners.iter().map(|(_, e)| e.amount).sum();

    let payouts: Vec<Payout> = winners
        .iter()
        .map(|(user, entry)| Payout {
            user_id: (*user).clone(),
            staked: entry.amount,
            amount: round_cents(entry.amount / winner_stake * pot),
        })
        .collect();

    let mut settlements = Vec::with_capacity(winners.len() * losers.len());
    for (loser, loser_entry) in &losers {
        for (winner, winner_entry) in &winners {
            let amount = round_cents(loser_entry.amount * winner_entry.amount / winner_stake);
            if amount <= 0.0 {
                continue;
            }
            settlements.push(SettlementDraft {
                debtor: (*loser).clone(),
                creditor: (*winner).clone(),
                amount,
                shares: vec![BetShare {
                    bet_id: bet.id.clone(),
                    amount,
                }],
            });
        }
    }

    JudgeOutcome {
        winners: winners.iter().map(|(u, _)| (*u).clone()).collect(),
        payouts,
        settlements,
        refunded: false,
    }
}

fn refund_all(participants: &[(&String, &crate::model::PickEntry)]) -> JudgeOutcome {
    JudgeOutcome {
        winners: Vec::new(),
        payouts: participants
            .iter()
            .map(|(user, entry)| Payout {
                user_id: (*user).clone(),
                staked: entry.amount,
                amount: entry.amount,
            })
            .collect(),
        settlements: Vec::new(),
        refunded: true,
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
