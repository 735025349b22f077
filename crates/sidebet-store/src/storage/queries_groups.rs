//! Group and membership queries.

use sidebet_core::db::unix_timestamp;
use sidebet_core::model::Group;

use super::db::{Database, DatabaseError};
use super::models::{GroupMemberRow, GroupRow};

/// Parameters for creating a group.
#[derive(Debug, Clone)]
pub struct NewGroupParams {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub invite_code: String,
    pub max_wager: Option<f64>,
}

impl Database {
    /// Create a group with its creator as the first (admin) member.
    pub async fn create_group(&self, params: &NewGroupParams) -> Result<Group, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO bet_groups (id, name, description, created_by, invite_code, max_wager, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&params.id)
        .bind(&params.name)
        .bind(&params.description)
        .bind(&params.created_by)
        .bind(&params.invite_code)
        .bind(params.max_wager)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO group_members (group_id, user_id, is_admin, joined_at) VALUES (?, ?, 1, ?)",
        )
        .bind(&params.id)
        .bind(&params.created_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_group(&params.id).await
    }

    /// Get a group by ID with its membership.
    pub async fn get_group(&self, id: &str) -> Result<Group, DatabaseError> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT * FROM bet_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Group {id}")))?;

        self.assemble_group(row).await
    }

    /// Look up a group by invite code. Codes are stored uppercase.
    pub async fn get_group_by_invite_code(&self, code: &str) -> Result<Group, DatabaseError> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT * FROM bet_groups WHERE invite_code = ?")
            .bind(code)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Group with invite code {code}")))?;

        self.assemble_group(row).await
    }

    /// List the groups a user belongs to, newest first.
    pub async fn list_groups_for_user(&self, user_id: &str) -> Result<Vec<Group>, DatabaseError> {
        let rows = sqlx::query_as::<_, GroupRow>(
            r"
            SELECT g.* FROM bet_groups g
            JOIN group_members gm ON gm.group_id = g.id
            WHERE gm.user_id = ?
            ORDER BY g.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(self.assemble_group(row).await?);
        }
        Ok(groups)
    }

    /// Add a user to a group. Joining twice is a conflict.
    pub async fn join_group(&self, group_id: &str, user_id: &str) -> Result<Group, DatabaseError> {
        // Surface NotFound before the membership insert fails opaquely.
        self.get_group(group_id).await?;

        let result = sqlx::query(
            r"
            INSERT INTO group_members (group_id, user_id, is_admin, joined_at)
            VALUES (?, ?, 0, ?)
            ON CONFLICT (group_id, user_id) DO NOTHING
            ",
        )
        .bind(group_id)
        .bind(user_id)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(format!(
                "User {user_id} is already a member of group {group_id}"
            )));
        }

        self.get_group(group_id).await
    }

    /// Remove a user from a group. Leaving a group you are not in is a
    /// conflict; the group itself must exist.
    pub async fn leave_group(&self, group_id: &str, user_id: &str) -> Result<(), DatabaseError> {
        self.get_group(group_id).await?;

        let result = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::Conflict(format!(
                "User {user_id} is not a member of group {group_id}"
            )));
        }
        Ok(())
    }

    /// Delete a group. Memberships cascade; refuses while bets are active.
    pub async fn delete_group(&self, group_id: &str) -> Result<(), DatabaseError> {
        let group = self.get_group(group_id).await?;
        if group.active_bets > 0 {
            return Err(DatabaseError::Conflict(format!(
                "Group {group_id} still has {} active bet(s)",
                group.active_bets
            )));
        }

        sqlx::query("DELETE FROM bet_groups WHERE id = ?")
            .bind(group_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn assemble_group(&self, row: GroupRow) -> Result<Group, DatabaseError> {
        let members = sqlx::query_as::<_, GroupMemberRow>(
            "SELECT * FROM group_members WHERE group_id = ? ORDER BY joined_at",
        )
        .bind(&row.id)
        .fetch_all(self.pool())
        .await?;

        Ok(row.into_group(members))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(id: &str, code: &str) -> NewGroupParams {
        NewGroupParams {
            id: id.to_string(),
            name: "Fantasy League".to_string(),
            description: None,
            created_by: "alice".to_string(),
            invite_code: code.to_string(),
            max_wager: Some(100.0),
        }
    }

    #[tokio::test]
    async fn create_group_seeds_admin_member() {
        let db = Database::open_in_memory().await.unwrap();
        let group = db.create_group(&params("g1", "ABC234")).await.unwrap();

        assert_eq!(group.members, ["alice"]);
        assert_eq!(group.admins, ["alice"]);
        assert!(group.is_admin("alice"));
        assert_eq!(group.active_bets, 0);
    }

    #[tokio::test]
    async fn invite_code_lookup() {
        let db = Database::open_in_memory().await.unwrap();
        db.create_group(&params("g1", "ABC234")).await.unwrap();

        let group = db.get_group_by_invite_code("ABC234").await.unwrap();
        assert_eq!(group.id, "g1");

        let err = db.get_group_by_invite_code("ZZZZZZ").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
    }

    #[tokio::test]
    async fn join_and_leave() {
        let db = Database::open_in_memory().await.unwrap();
        db.create_group(&params("g1", "ABC234")).await.unwrap();

        let group = db.join_group("g1", "bob").await.unwrap();
        assert!(group.is_member("bob"));
        assert!(!group.is_admin("bob"));

        let err = db.join_group("g1", "bob").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        db.leave_group("g1", "bob").await.unwrap();
        let err = db.leave_group("g1", "bob").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn list_groups_for_user() {
        let db = Database::open_in_memory().await.unwrap();
        db.create_group(&params("g1", "ABC234")).await.unwrap();
        db.create_group(&params("g2", "DEF567")).await.unwrap();
        db.join_group("g2", "bob").await.unwrap();

        let alices = db.list_groups_for_user("alice").await.unwrap();
        assert_eq!(alices.len(), 2);

        let bobs = db.list_groups_for_user("bob").await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].id, "g2");
    }

    #[tokio::test]
    async fn delete_cascades_memberships() {
        let db = Database::open_in_memory().await.unwrap();
        db.create_group(&params("g1", "ABC234")).await.unwrap();
        db.join_group("g1", "bob").await.unwrap();

        db.delete_group("g1").await.unwrap();
        let err = db.get_group("g1").await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound(_)));
        assert!(db.list_groups_for_user("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_invite_code_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        db.create_group(&params("g1", "ABC234")).await.unwrap();

        let err = db.create_group(&params("g2", "ABC234")).await.unwrap_err();
        assert!(matches!(err, DatabaseError::Query(_)));
    }
}
