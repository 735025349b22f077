//! Friendship queries.

use sidebet_core::db::unix_timestamp;
use sidebet_core::model::Friendship;

use super::db::{Database, DatabaseError};
use super::models::FriendshipRow;

impl Database {
    /// Find the friendship between two users, whichever direction it was
    /// requested in.
    pub async fn find_friendship(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Friendship>, DatabaseError> {
        let row = sqlx::query_as::<_, FriendshipRow>(
            r"
            SELECT * FROM friendships
            WHERE (user1_id = ?1 AND user2_id = ?2) OR (user1_id = ?2 AND user2_id = ?1)
            ",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Friendship::from))
    }

    /// Look up a friendship by ID.
    pub async fn get_friendship(&self, id: &str) -> Result<Option<Friendship>, DatabaseError> {
        let row = sqlx::query_as::<_, FriendshipRow>("SELECT * FROM friendships WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Friendship::from))
    }

    /// Record a pending friend request. A second request between the same
    /// pair, in either direction, is a conflict.
    pub async fn insert_friendship(
        &self,
        id: &str,
        requester: &str,
        recipient: &str,
    ) -> Result<Friendship, DatabaseError> {
        if let Some(existing) = self.find_friendship(requester, recipient).await? {
            let state = if existing.accepted { "friends" } else { "pending" };
            return Err(DatabaseError::Conflict(format!(
                "Friendship between {requester} and {recipient} already {state}"
            )));
        }

        let row = sqlx::query_as::<_, FriendshipRow>(
            r"
            INSERT INTO friendships (id, user1_id, user2_id, status, requested_by, created_at)
            VALUES (?, ?, ?, 'pending', ?, ?)
            RETURNING *
            ",
        )
        .bind(id)
        .bind(requester)
        .bind(recipient)
        .bind(requester)
        .bind(unix_timestamp())
        .fetch_one(self.pool())
        .await?;

        Ok(row.into())
    }

    /// Accept a pending friend request. Accepting twice is a conflict.
    pub async fn accept_friendship(&self, id: &str) -> Result<Friendship, DatabaseError> {
        let result = sqlx::query(
            "UPDATE friendships SET status = 'accepted', accepted_at = ? WHERE id = ? AND status = 'pending'",
        )
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT status FROM friendships WHERE id = ?")
                    .bind(id)
                    .fetch_optional(self.pool())
                    .await?;
            return Err(exists.map_or_else(
                || DatabaseError::NotFound(format!("Friendship {id}")),
                |s| DatabaseError::Conflict(format!("Friendship {id} is already {s}")),
            ));
        }

        let row = sqlx::query_as::<_, FriendshipRow>("SELECT * FROM friendships WHERE id = ?")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(row.into())
    }

    /// Remove a friendship (or decline a pending request). Returns whether a
    /// record was deleted.
    pub async fn delete_friendship(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM friendships WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List a user's accepted friendships.
    pub async fn list_friends(&self, user_id: &str) -> Result<Vec<Friendship>, DatabaseError> {
        let rows = sqlx::query_as::<_, FriendshipRow>(
            r"
            SELECT * FROM friendships
            WHERE status = 'accepted' AND (user1_id = ?1 OR user2_id = ?1)
            ORDER BY accepted_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Friendship::from).collect())
    }

    /// List requests waiting on this user's answer.
    pub async fn list_pending_requests(
        &self,
        user_id: &str,
    ) -> Result<Vec<Friendship>, DatabaseError> {
        let rows = sqlx::query_as::<_, FriendshipRow>(
            r"
            SELECT * FROM friendships
            WHERE status = 'pending'
              AND (user1_id = ?1 OR user2_id = ?1)
              AND requested_by != ?1
            ORDER BY created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Friendship::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn request_and_accept() {
        let db = Database::open_in_memory().await.unwrap();
        let friendship = db.insert_friendship("f1", "alice", "bob").await.unwrap();
        assert!(!friendship.accepted);
        assert_eq!(friendship.requested_by, "alice");

        let pending = db.list_pending_requests("bob").await.unwrap();
        assert_eq!(pending.len(), 1);
        // The requester has nothing to answer.
        assert!(db.list_pending_requests("alice").await.unwrap().is_empty());

        let friendship = db.accept_friendship("f1").await.unwrap();
        assert!(friendship.accepted);
        assert!(friendship.accepted_at.is_some());

        assert_eq!(db.list_friends("alice").await.unwrap().len(), 1);
        assert_eq!(db.list_friends("bob").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_friendship_by_id() {
        let db = Database::open_in_memory().await.unwrap();
        db.insert_friendship("f1", "alice", "bob").await.unwrap();

        let friendship = db.get_friendship("f1").await.unwrap().unwrap();
        assert_eq!(friendship.user1_id, "alice");
        assert!(!friendship.accepted);
        assert!(db.get_friendship("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_request_either_direction_conflicts() {
        let db = Database::open_in_memory().await.unwrap();
        db.insert_friendship("f1", "alice", "bob").await.unwrap();

        let err = db.insert_friendship("f2", "alice", "bob").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let err = db.insert_friendship("f3", "bob", "alice").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn accept_twice_is_conflict() {
        let db = Database::open_in_memory().await.unwrap();
        db.insert_friendship("f1", "alice", "bob").await.unwrap();
        db.accept_friendship("f1").await.unwrap();

        let err = db.accept_friendship("f1").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn accept_missing_is_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let err = db.accept_friendship("nope").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let db = Database::open_in_memory().await.unwrap();
        db.insert_friendship("f1", "alice", "bob").await.unwrap();

        assert!(db.delete_friendship("f1").await.unwrap());
        assert!(!db.delete_friendship("f1").await.unwrap());
        assert!(db.find_friendship("alice", "bob").await.unwrap().is_none());
    }
}
