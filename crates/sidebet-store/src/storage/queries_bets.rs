//! Bet and pick queries.

use sidebet_core::db::unix_timestamp;
use sidebet_core::model::{Bet, BetCategory, BetKind, BetStatus, ChallengeStatus, Outcome, Pick};
use uuid::Uuid;

use sidebet_core::ledger::SettlementDraft;

use super::db::{Database, DatabaseError};
use super::models::{BetRow, PickRow};
use super::queries_notifications::NewNotificationParams;

/// Parameters for creating a bet.
#[derive(Debug, Clone)]
pub struct NewBetParams {
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
    pub stake: f64,
    pub line: Option<f64>,
    pub closes_at: i64,
    pub status: BetStatus,
}

impl Database {
    /// Create a bet, its creation notifications, and the group's active-bet
    /// counter bump in a single transaction, so a failure leaves no partial
    /// state behind.
    pub async fn create_bet_atomic(
        &self,
        params: &NewBetParams,
        notifications: &[NewNotificationParams],
    ) -> Result<Bet, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO bets (
                id, kind, category, question, description, creator_id,
                group_id, challenger_id, challenged_id, challenge_status,
                stake, line, closes_at, status, pot, winners, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, '[]', ?)
            ",
        )
        .bind(&params.id)
        .bind(params.kind.as_str())
        .bind(params.category.as_str())
        .bind(&params.question)
        .bind(&params.description)
        .bind(&params.creator_id)
        .bind(&params.group_id)
        .bind(&params.challenger_id)
        .bind(&params.challenged_id)
        .bind(params.challenge_status.map(|s| s.as_str()))
        .bind(params.stake)
        .bind(params.line)
        .bind(params.closes_at)
        .bind(params.status.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(ref group_id) = params.group_id {
            sqlx::query("UPDATE bet_groups SET active_bets = active_bets + 1 WHERE id = ?")
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
        }

        for notification in notifications {
            Self::insert_notification_tx(&mut tx, notification, now).await?;
        }

        tx.commit().await?;

        self.get_bet(&params.id).await
    }

    /// Get a bet by ID with its picks.
    pub async fn get_bet(&self, id: &str) -> Result<Bet, DatabaseError> {
        let row = sqlx::query_as::<_, BetRow>("SELECT * FROM bets WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Bet {id}")))?;

        let picks = sqlx::query_as::<_, PickRow>("SELECT * FROM picks WHERE bet_id = ?")
            .bind(id)
            .fetch_all(self.pool())
            .await?;

        row.into_bet(picks)
    }

    /// List bets relevant to a user: created by them, a head-to-head party,
    /// in one of their groups, or carrying their pick. Newest first.
    pub async fn list_bets_for_user(&self, user_id: &str) -> Result<Vec<Bet>, DatabaseError> {
        let rows = sqlx::query_as::<_, BetRow>(
            r"
            SELECT DISTINCT b.* FROM bets b
            LEFT JOIN picks p ON p.bet_id = b.id AND p.user_id = ?1
            LEFT JOIN group_members gm ON gm.group_id = b.group_id AND gm.user_id = ?1
            WHERE b.creator_id = ?1
               OR b.challenger_id = ?1
               OR b.challenged_id = ?1
               OR p.user_id IS NOT NULL
               OR gm.user_id IS NOT NULL
            ORDER BY b.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        self.assemble_bets(rows).await
    }

    /// List bets for a group, newest first.
    pub async fn list_bets_by_group(&self, group_id: &str) -> Result<Vec<Bet>, DatabaseError> {
        let rows = sqlx::query_as::<_, BetRow>(
            "SELECT * FROM bets WHERE group_id = ? ORDER BY created_at DESC",
        )
        .bind(group_id)
        .fetch_all(self.pool())
        .await?;

        self.assemble_bets(rows).await
    }

    async fn assemble_bets(&self, rows: Vec<BetRow>) -> Result<Vec<Bet>, DatabaseError> {
        let mut bets = Vec::with_capacity(rows.len());
        for row in rows {
            let picks = sqlx::query_as::<_, PickRow>("SELECT * FROM picks WHERE bet_id = ?")
                .bind(&row.id)
                .fetch_all(self.pool())
                .await?;
            bets.push(row.into_bet(picks)?);
        }
        Ok(bets)
    }

    /// Record (or replace) a user's pick and recompute the pot, atomically.
    ///
    /// The transaction checks the bet is open and not past its deadline,
    /// upserts the pick, and recomputes the pot as the sum over the picks
    /// table, so a re-vote replaces the earlier stake instead of
    /// double-counting it.
    pub async fn record_pick(
        &self,
        bet_id: &str,
        user_id: &str,
        pick: Pick,
        amount: f64,
        now: i64,
    ) -> Result<Bet, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let current: Option<(String, i64)> =
            sqlx::query_as("SELECT status, closes_at FROM bets WHERE id = ?")
                .bind(bet_id)
                .fetch_optional(&mut *tx)
                .await?;

        let (status, closes_at) =
            current.ok_or_else(|| DatabaseError::NotFound(format!("Bet {bet_id}")))?;

        if status != BetStatus::Open.as_str() {
            return Err(DatabaseError::Conflict(format!(
                "Bet {bet_id} is {status}, not open for picks"
            )));
        }
        if closes_at <= now {
            return Err(DatabaseError::Conflict(format!(
                "Bet {bet_id} closed at {closes_at}"
            )));
        }

        sqlx::query(
            r"
            INSERT INTO picks (bet_id, user_id, pick, amount, placed_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (bet_id, user_id)
            DO UPDATE SET pick = excluded.pick, amount = excluded.amount,
                          placed_at = excluded.placed_at
            ",
        )
        .bind(bet_id)
        .bind(user_id)
        .bind(pick.as_str())
        .bind(amount)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            UPDATE bets
            SET pot = (SELECT COALESCE(SUM(amount), 0) FROM picks WHERE bet_id = ?1)
            WHERE id = ?1
            ",
        )
        .bind(bet_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_bet(bet_id).await
    }

    /// Move a bet between lifecycle statuses, guarded on the expected
    /// current status. Conflict when the bet is in any other state.
    pub async fn update_bet_status(
        &self,
        bet_id: &str,
        expected: BetStatus,
        next: BetStatus,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE bets SET status = ? WHERE id = ? AND status = ?")
            .bind(next.as_str())
            .bind(bet_id)
            .bind(expected.as_str())
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(self.bet_status_conflict(bet_id, expected).await?);
        }
        Ok(())
    }

    /// Respond to a head-to-head challenge: accepted opens the bet,
    /// declined cancels it. Only valid while the bet is pending.
    pub async fn set_challenge_response(
        &self,
        bet_id: &str,
        accepted: bool,
    ) -> Result<Bet, DatabaseError> {
        let (challenge_status, status) = if accepted {
            (ChallengeStatus::Accepted, BetStatus::Open)
        } else {
            (ChallengeStatus::Declined, BetStatus::Cancelled)
        };

        let result = sqlx::query(
            "UPDATE bets SET challenge_status = ?, status = ? WHERE id = ? AND status = 'PENDING'",
        )
        .bind(challenge_status.as_str())
        .bind(status.as_str())
        .bind(bet_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.bet_status_conflict(bet_id, BetStatus::Pending).await?);
        }

        self.get_bet(bet_id).await
    }

    /// Record a judged result with its settlements and notifications in one
    /// transaction, and release the group's active-bet slot.
    pub async fn apply_judgement(
        &self,
        bet_id: &str,
        result: Outcome,
        winners: &[String],
        drafts: &[SettlementDraft],
        notifications: &[NewNotificationParams],
    ) -> Result<Bet, DatabaseError> {
        let now = unix_timestamp();
        let winners_json = serde_json::to_string(winners)
            .map_err(|e| DatabaseError::Query(format!("Winners encoding failed: {e}")))?;

        let mut tx = self.pool().begin().await?;

        let updated = sqlx::query(
            r"
            UPDATE bets SET status = 'JUDGED', result = ?, winners = ?, judged_at = ?
            WHERE id = ? AND status = 'CLOSED'
            ",
        )
        .bind(result.as_str())
        .bind(&winners_json)
        .bind(now)
        .bind(bet_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            drop(tx);
            return Err(self.bet_status_conflict(bet_id, BetStatus::Closed).await?);
        }

        for draft in drafts {
            let settlement_id = Uuid::new_v4().to_string();
            sqlx::query(
                r"
                INSERT INTO settlements (id, user1_id, user2_id, amount, status, created_at)
                VALUES (?, ?, ?, ?, 'PENDING', ?)
                ",
            )
            .bind(&settlement_id)
            .bind(&draft.creditor)
            .bind(&draft.debtor)
            .bind(draft.amount)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            for share in &draft.shares {
                sqlx::query(
                    "INSERT INTO settlement_bets (settlement_id, bet_id, amount) VALUES (?, ?, ?)",
                )
                .bind(&settlement_id)
                .bind(&share.bet_id)
                .bind(share.amount)
                .execute(&mut *tx)
                .await?;
            }
        }

        for notification in notifications {
            Self::insert_notification_tx(&mut tx, notification, now).await?;
        }

        let group_id: Option<String> =
            sqlx::query_scalar("SELECT group_id FROM bets WHERE id = ?")
                .bind(bet_id)
                .fetch_one(&mut *tx)
                .await?;
        if let Some(ref group_id) = group_id {
            sqlx::query(
                "UPDATE bet_groups SET active_bets = MAX(active_bets - 1, 0) WHERE id = ?",
            )
            .bind(group_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_bet(bet_id).await
    }

    /// Build the NotFound/Conflict error for a failed guarded status update.
    async fn bet_status_conflict(
        &self,
        bet_id: &str,
        expected: BetStatus,
    ) -> Result<DatabaseError, DatabaseError> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM bets WHERE id = ?")
            .bind(bet_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(status.map_or_else(
            || DatabaseError::NotFound(format!("Bet {bet_id}")),
            |s| {
                DatabaseError::Conflict(format!(
                    "Bet {bet_id} is {s}, expected {}",
                    expected.as_str()
                ))
            },
        ))
    }
}
