//! Bet, friendship, settlement, notification, and group data model.
//!
//! Enum fields are persisted as their `as_str()` codes; the storage layer
//! round-trips them through `FromStr`.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Bet proposition shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetKind {
    /// Binary yes/no proposition.
    YesNo,
    /// Numeric over/under proposition with a line value.
    OverUnder,
}

impl BetKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::YesNo => "YES_NO",
            Self::OverUnder => "OVER_UNDER",
        }
    }
}

impl FromStr for BetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YES_NO" => Ok(Self::YesNo),
            "OVER_UNDER" => Ok(Self::OverUnder),
            other => Err(Error::Validation(format!("Unknown bet kind: {other}"))),
        }
    }
}

/// Who the bet is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetCategory {
    /// Wager inside a group; any member may pick a side.
    Group,
    /// Head-to-head challenge between two users.
    HeadToHead,
}

impl BetCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "GROUP",
            Self::HeadToHead => "H2H",
        }
    }
}

impl FromStr for BetCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GROUP" => Ok(Self::Group),
            "H2H" => Ok(Self::HeadToHead),
            other => Err(Error::Validation(format!("Unknown bet category: {other}"))),
        }
    }
}

/// Persisted bet lifecycle status.
///
/// Transitions are one-way: PENDING→OPEN (challenge accepted), OPEN→CLOSED
/// (deadline or manual close), CLOSED→JUDGED (creator supplies a result).
/// PENDING and OPEN bets may be cancelled; nothing moves backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetStatus {
    Pending,
    Open,
    Closed,
    Judged,
    Cancelled,
}

impl BetStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::Judged => "JUDGED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Open)
                | (Self::Open, Self::Closed)
                | (Self::Closed, Self::Judged)
                | (Self::Pending | Self::Open, Self::Cancelled)
        )
    }
}

impl std::fmt::Display for BetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BetStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            "JUDGED" => Ok(Self::Judged),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(Error::Validation(format!("Unknown bet status: {other}"))),
        }
    }
}

/// A participant's side of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pick {
    Yes,
    No,
    Over,
    Under,
}

impl Pick {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Over => "OVER",
            Self::Under => "UNDER",
        }
    }

    /// Whether this pick is a legal side for the given bet kind.
    pub const fn is_legal_for(&self, kind: BetKind) -> bool {
        matches!(
            (kind, self),
            (BetKind::YesNo, Self::Yes | Self::No)
                | (BetKind::OverUnder, Self::Over | Self::Under)
        )
    }

    /// The YES/OVER side of the meter; NO/UNDER is the complement.
    pub const fn is_affirmative(&self) -> bool {
        matches!(self, Self::Yes | Self::Over)
    }
}

impl std::fmt::Display for Pick {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Pick {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YES" => Ok(Self::Yes),
            "NO" => Ok(Self::No),
            "OVER" => Ok(Self::Over),
            "UNDER" => Ok(Self::Under),
            other => Err(Error::Validation(format!("Unknown pick: {other}"))),
        }
    }
}

/// Judged result of a bet. `Push` voids the bet: stakes are refunded and no
/// settlements are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Yes,
    No,
    Over,
    Under,
    Push,
}

impl Outcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Over => "OVER",
            Self::Under => "UNDER",
            Self::Push => "PUSH",
        }
    }

    /// The pick that wins under this outcome, if any.
    pub const fn winning_pick(&self) -> Option<Pick> {
        match self {
            Self::Yes => Some(Pick::Yes),
            Self::No => Some(Pick::No),
            Self::Over => Some(Pick::Over),
            Self::Under => Some(Pick::Under),
            Self::Push => None,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YES" => Ok(Self::Yes),
            "NO" => Ok(Self::No),
            "OVER" => Ok(Self::Over),
            "UNDER" => Ok(Self::Under),
            "PUSH" => Ok(Self::Push),
            other => Err(Error::Validation(format!("Unknown outcome: {other}"))),
        }
    }
}

/// Head-to-head acceptance sub-status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeStatus {
    Pending,
    Accepted,
    Declined,
}

impl ChallengeStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl FromStr for ChallengeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(Error::Validation(format!("Unknown challenge status: {other}"))),
        }
    }
}

/// A participant's recorded pick with their staked amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickEntry {
    pub pick: Pick,
    pub amount: f64,
    pub placed_at: i64,
}

/// A wager.
///
/// Invariant: `pot` equals the sum of all stake amounts in `picks`. The
/// storage layer recomputes the pot from the picks inside the same
/// transaction that records a pick, so re-voting replaces a stake instead of
/// double-counting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub kind: BetKind,
    pub category: BetCategory,
    pub question: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub group_id: Option<String>,
    pub challenger_id: Option<String>,
    pub challenged_id: Option<String>,
    pub challenge_status: Option<ChallengeStatus>,
    /// Stake amount per participant (dollars).
    pub stake: f64,
    /// Line value for over/under bets.
    pub line: Option<f64>,
    /// Closing deadline, unix seconds.
    pub closes_at: i64,
    pub status: BetStatus,
    pub result: Option<Outcome>,
    pub picks: HashMap<String, PickEntry>,
    /// Accumulated pot (dollars).
    pub pot: f64,
    /// Participants whose pick matched the result; filled in at judging.
    pub winners: Vec<String>,
    pub created_at: i64,
    pub judged_at: Option<i64>,
}

impl Bet {
    /// The viewer's recorded pick, if they have one.
    pub fn pick_of(&self, user_id: &str) -> Option<&PickEntry> {
        self.picks.get(user_id)
    }

    /// Whether the user is the creator, a head-to-head party, or has a pick.
    pub fn involves(&self, user_id: &str) -> bool {
        self.creator_id == user_id
            || self.challenger_id.as_deref() == Some(user_id)
            || self.challenged_id.as_deref() == Some(user_id)
            || self.picks.contains_key(user_id)
    }
}

/// Friendship edge between two users.
///
/// At most one record exists per unordered pair; the storage layer checks
/// both directions before inserting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub accepted: bool,
    pub requested_by: String,
    pub created_at: i64,
    pub accepted_at: Option<i64>,
}

/// One bet's contribution to a settlement, stored directly rather than
/// derived by even division at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetShare {
    pub bet_id: String,
    pub amount: f64,
}

/// A monetary obligation between two users. A positive `amount` means user2
/// owes user1. Once settled, `amount` and `settled_at` are immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub amount: f64,
    pub settled: bool,
    pub shares: Vec<BetShare>,
    pub created_at: i64,
    pub settled_at: Option<i64>,
}

/// Informational record delivered at most once to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub read: bool,
    pub link: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: i64,
}

/// Named collection of members with an invite code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub members: Vec<String>,
    pub admins: Vec<String>,
    pub invite_code: String,
    pub max_wager: Option<f64>,
    pub active_bets: i64,
    pub created_at: i64,
}

impl Group {
    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m == user_id)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|a| a == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrips_through_str() {
        for status in [
            BetStatus::Pending,
            BetStatus::Open,
            BetStatus::Closed,
            BetStatus::Judged,
            BetStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<BetStatus>().unwrap(), status);
        }
    }

    #[test]
    fn lifecycle_is_one_way() {
        assert!(BetStatus::Pending.can_transition_to(BetStatus::Open));
        assert!(BetStatus::Open.can_transition_to(BetStatus::Closed));
        assert!(BetStatus::Closed.can_transition_to(BetStatus::Judged));
        assert!(BetStatus::Open.can_transition_to(BetStatus::Cancelled));

        assert!(!BetStatus::Open.can_transition_to(BetStatus::Pending));
        assert!(!BetStatus::Closed.can_transition_to(BetStatus::Open));
        assert!(!BetStatus::Judged.can_transition_to(BetStatus::Closed));
        assert!(!BetStatus::Judged.can_transition_to(BetStatus::Cancelled));
        assert!(!BetStatus::Cancelled.can_transition_to(BetStatus::Open));
    }

    #[test]
    fn pick_legality_follows_kind() {
        assert!(Pick::Yes.is_legal_for(BetKind::YesNo));
        assert!(Pick::No.is_legal_for(BetKind::YesNo));
        assert!(!Pick::Over.is_legal_for(BetKind::YesNo));
        assert!(Pick::Under.is_legal_for(BetKind::OverUnder));
        assert!(!Pick::Yes.is_legal_for(BetKind::OverUnder));
    }

    #[test]
    fn push_has_no_winning_pick() {
        assert_eq!(Outcome::Push.winning_pick(), None);
        assert_eq!(Outcome::Over.winning_pick(), Some(Pick::Over));
    }

    #[test]
    fn unknown_code_is_validation_error() {
        let err = "MAYBE".parse::<Pick>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
