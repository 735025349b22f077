//! Database row models and conversions into the core domain types.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use sidebet_core::model::{
    Bet, BetCategory, BetKind, BetStatus, ChallengeStatus, Friendship, Group, Notification,
    Outcome, Pick, PickEntry, Settlement,
};

use super::db::DatabaseError;

fn parse<T: FromStr>(value: &str, what: &str) -> Result<T, DatabaseError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| DatabaseError::Query(format!("Corrupt {what} column: {e}")))
}

/// Bet record from the database. Picks live in their own table and are
/// joined in by the query layer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BetRow {
    pub id: String,
    pub kind: String,
    pub category: String,
    pub question: String,
    pub description: Option<String>,
    pub creator_id: String,
    pub group_id: Option<String>,
    pub challenger_id: Option<String>,
    pub challenged_id: Option<String>,
    pub challenge_status: Option<String>,
    pub stake: f64,
    pub line: Option<f64>,
    pub closes_at: i64,
    pub status: String,
    pub result: Option<String>,
    pub pot: f64,
    pub winners: String,
    pub created_at: i64,
    pub judged_at: Option<i64>,
}

impl BetRow {
    /// Assemble a domain `Bet` from this row and its pick rows.
    pub fn into_bet(self, pick_rows: Vec<PickRow>) -> Result<Bet, DatabaseError> {
        let mut picks = HashMap::with_capacity(pick_rows.len());
        for row in pick_rows {
            picks.insert(
                row.user_id,
                PickEntry {
                    pick: parse::<Pick>(&row.pick, "pick")?,
                    amount: row.amount,
                    placed_at: row.placed_at,
                },
            );
        }

        let winners: Vec<String> = serde_json::from_str(&self.winners)
            .map_err(|e| DatabaseError::Query(format!("Corrupt winners column: {e}")))?;

        Ok(Bet {
            id: self.id,
            kind: parse::<BetKind>(&self.kind, "kind")?,
            category: parse::<BetCategory>(&self.category, "category")?,
            question: self.question,
            description: self.description,
            creator_id: self.creator_id,
            group_id: self.group_id,
            challenger_id: self.challenger_id,
            challenged_id: self.challenged_id,
            challenge_status: self
                .challenge_status
                .as_deref()
                .map(|s| parse::<ChallengeStatus>(s, "challenge_status"))
                .transpose()?,
            stake: self.stake,
            line: self.line,
            closes_at: self.closes_at,
            status: parse::<BetStatus>(&self.status, "status")?,
            result: self
                .result
                .as_deref()
                .map(|s| parse::<Outcome>(s, "result"))
                .transpose()?,
            picks,
            pot: self.pot,
            winners,
            created_at: self.created_at,
            judged_at: self.judged_at,
        })
    }
}

/// Pick record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PickRow {
    pub bet_id: String,
    pub user_id: String,
    pub pick: String,
    pub amount: f64,
    pub placed_at: i64,
}

/// Group record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub invite_code: String,
    pub max_wager: Option<f64>,
    pub active_bets: i64,
    pub created_at: i64,
}

impl GroupRow {
    pub fn into_group(self, member_rows: Vec<GroupMemberRow>) -> Group {
        let admins = member_rows
            .iter()
            .filter(|m| m.is_admin != 0)
            .map(|m| m.user_id.clone())
            .collect();
        let members = member_rows.into_iter().map(|m| m.user_id).collect();
        Group {
            id: self.id,
            name: self.name,
            description: self.description,
            created_by: self.created_by,
            members,
            admins,
            invite_code: self.invite_code,
            max_wager: self.max_wager,
            active_bets: self.active_bets,
            created_at: self.created_at,
        }
    }
}

/// Group membership record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupMemberRow {
    pub group_id: String,
    pub user_id: String,
    pub is_admin: i64,
    pub joined_at: i64,
}

/// Friendship record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FriendshipRow {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub status: String,
    pub requested_by: String,
    pub created_at: i64,
    pub accepted_at: Option<i64>,
}

impl From<FriendshipRow> for Friendship {
    fn from(row: FriendshipRow) -> Self {
        Self {
            id: row.id,
            user1_id: row.user1_id,
            user2_id: row.user2_id,
            accepted: row.status == "accepted",
            requested_by: row.requested_by,
            created_at: row.created_at,
            accepted_at: row.accepted_at,
        }
    }
}

/// Settlement record from the database. Per-bet shares live in
/// `settlement_bets` and are joined in by the query layer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SettlementRow {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub amount: f64,
    pub status: String,
    pub created_at: i64,
    pub settled_at: Option<i64>,
}

impl SettlementRow {
    pub fn into_settlement(self, share_rows: Vec<SettlementBetRow>) -> Settlement {
        Settlement {
            id: self.id,
            user1_id: self.user1_id,
            user2_id: self.user2_id,
            amount: self.amount,
            settled: self.status == "SETTLED",
            shares: share_rows
                .into_iter()
                .map(|s| sidebet_core::model::BetShare {
                    bet_id: s.bet_id,
                    amount: s.amount,
                })
                .collect(),
            created_at: self.created_at,
            settled_at: self.settled_at,
        }
    }
}

/// Per-bet settlement share record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SettlementBetRow {
    pub settlement_id: String,
    pub bet_id: String,
    pub amount: f64,
}

/// Notification record from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub message: String,
    pub read: i64,
    pub link: Option<String>,
    pub metadata: Option<String>,
    pub created_at: i64,
}

impl NotificationRow {
    pub fn into_notification(self) -> Result<Notification, DatabaseError> {
        let metadata = self
            .metadata
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|e| DatabaseError::Query(format!("Corrupt metadata column: {e}")))?;
        Ok(Notification {
            id: self.id,
            user_id: self.user_id,
            kind: self.kind,
            message: self.message,
            read: self.read != 0,
            link: self.link,
            metadata,
            created_at: self.created_at,
        })
    }
}
