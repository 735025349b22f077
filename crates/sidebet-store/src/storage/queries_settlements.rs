//! Settlement queries.

use sidebet_core::db::unix_timestamp;
use sidebet_core::model::{BetShare, Settlement};

use super::db::{Database, DatabaseError};
use super::models::{SettlementBetRow, SettlementRow};

impl Database {
    /// Insert a settlement and its per-bet shares in one transaction.
    pub async fn insert_settlement(
        &self,
        id: &str,
        creditor: &str,
        debtor: &str,
        amount: f64,
        shares: &[BetShare],
    ) -> Result<Settlement, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO settlements (id, user1_id, user2_id, amount, status, created_at)
            VALUES (?, ?, ?, ?, 'PENDING', ?)
            ",
        )
        .bind(id)
        .bind(creditor)
        .bind(debtor)
        .bind(amount)
        .bind(unix_timestamp())
        .execute(&mut *tx)
        .await?;

        for share in shares {
            sqlx::query(
                "INSERT INTO settlement_bets (settlement_id, bet_id, amount) VALUES (?, ?, ?)",
            )
            .bind(id)
            .bind(&share.bet_id)
            .bind(share.amount)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_settlement(id).await
    }

    /// Get a settlement by ID with its per-bet shares.
    pub async fn get_settlement(&self, id: &str) -> Result<Settlement, DatabaseError> {
        let row = sqlx::query_as::<_, SettlementRow>("SELECT * FROM settlements WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Settlement {id}")))?;

        let shares = sqlx::query_as::<_, SettlementBetRow>(
            "SELECT * FROM settlement_bets WHERE settlement_id = ?",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        Ok(row.into_settlement(shares))
    }

    /// List a user's unsettled obligations, on either side, oldest first.
    pub async fn list_pending_settlements(
        &self,
        user_id: &str,
    ) -> Result<Vec<Settlement>, DatabaseError> {
        let rows = sqlx::query_as::<_, SettlementRow>(
            r"
            SELECT * FROM settlements
            WHERE status = 'PENDING' AND (user1_id = ?1 OR user2_id = ?1)
            ORDER BY created_at
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let mut settlements = Vec::with_capacity(rows.len());
        for row in rows {
            let shares = sqlx::query_as::<_, SettlementBetRow>(
                "SELECT * FROM settlement_bets WHERE settlement_id = ?",
            )
            .bind(&row.id)
            .fetch_all(self.pool())
            .await?;
            settlements.push(row.into_settlement(shares));
        }
        Ok(settlements)
    }

    /// Mark a settlement paid. Settled records are immutable, so marking
    /// twice is a conflict.
    pub async fn mark_settled(&self, id: &str) -> Result<Settlement, DatabaseError> {
        let result = sqlx::query(
            "UPDATE settlements SET status = 'SETTLED', settled_at = ? WHERE id = ? AND status = 'PENDING'",
        )
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT status FROM settlements WHERE id = ?")
                    .bind(id)
                    .fetch_optional(self.pool())
                    .await?;
            return Err(exists.map_or_else(
                || DatabaseError::NotFound(format!("Settlement {id}")),
                |_| DatabaseError::Conflict(format!("Settlement {id} is already settled")),
            ));
        }

        self.get_settlement(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shares() -> Vec<BetShare> {
        vec![
            BetShare { bet_id: "b1".to_string(), amount: 15.0 },
            BetShare { bet_id: "b2".to_string(), amount: 5.0 },
        ]
    }

    #[tokio::test]
    async fn insert_and_get_with_shares() {
        let db = Database::open_in_memory().await.unwrap();
        let settlement = db
            .insert_settlement("s1", "alice", "bob", 20.0, &shares())
            .await
            .unwrap();

        assert_eq!(settlement.user1_id, "alice");
        assert_eq!(settlement.user2_id, "bob");
        assert!(!settlement.settled);
        assert_eq!(settlement.shares.len(), 2);
        let total: f64 = settlement.shares.iter().map(|s| s.amount).sum();
        assert!((total - settlement.amount).abs() < 1e-9);
    }

    #[tokio::test]
    async fn pending_list_sees_both_sides() {
        let db = Database::open_in_memory().await.unwrap();
        db.insert_settlement("s1", "alice", "bob", 20.0, &shares())
            .await
            .unwrap();

        assert_eq!(db.list_pending_settlements("alice").await.unwrap().len(), 1);
        assert_eq!(db.list_pending_settlements("bob").await.unwrap().len(), 1);
        assert!(db.list_pending_settlements("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_settled_is_terminal() {
        let db = Database::open_in_memory().await.unwrap();
        db.insert_settlement("s1", "alice", "bob", 20.0, &shares())
            .await
            .unwrap();

        let settlement = db.mark_settled("s1").await.unwrap();
        assert!(settlement.settled);
        assert!(settlement.settled_at.is_some());
        assert!(db.list_pending_settlements("alice").await.unwrap().is_empty());

        let err = db.mark_settled("s1").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn mark_missing_is_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let err = db.mark_settled("nope").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }
}
