//! Social operations: groups, friendships, settlements, notifications.

use rand::RngExt;
use tracing::info;
use uuid::Uuid;

use sidebet_core::ledger::{self, CounterpartyBalance};
use sidebet_core::model::{Friendship, Group, Notification, Settlement};
use sidebet_core::{Error, Result};

use crate::storage::{DatabaseError, NewGroupParams, NewNotificationParams};

use super::{BetService, ChangeEvent};

/// Unambiguous uppercase alphanumerics: no I, O, 0, or 1.
const INVITE_CODE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const INVITE_CODE_LEN: usize = 6;
const INVITE_CODE_ATTEMPTS: usize = 8;

fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..INVITE_CODE_CHARSET.len());
            INVITE_CODE_CHARSET[idx] as char
        })
        .collect()
}

impl BetService {
    /// Create a group with the creator as its first admin. The invite code
    /// is generated here and retried on the off chance of a collision.
    pub async fn create_group(
        &self,
        creator_id: &str,
        name: &str,
        description: Option<String>,
        max_wager: Option<f64>,
    ) -> Result<Group> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Group name must not be empty".to_string()));
        }
        if let Some(cap) = max_wager
            && cap <= 0.0
        {
            return Err(Error::Validation("Max wager must be positive".to_string()));
        }

        let mut invite_code = generate_invite_code();
        for _ in 0..INVITE_CODE_ATTEMPTS {
            match self.db.get_group_by_invite_code(&invite_code).await {
                Err(DatabaseError::NotFound(_)) => break,
                Ok(_) => invite_code = generate_invite_code(),
                Err(e) => return Err(e.into()),
            }
        }

        let group = self
            .db
            .create_group(&NewGroupParams {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                description,
                created_by: creator_id.to_string(),
                invite_code,
                max_wager,
            })
            .await?;
        info!(group_id = %group.id, creator = creator_id, "created group");

        self.publish(ChangeEvent::Groups);
        Ok(group)
    }

    /// Join a group by invite code. Codes are matched case-insensitively.
    pub async fn join_group_by_code(&self, user_id: &str, code: &str) -> Result<Group> {
        let code = code.trim().to_uppercase();
        let group = self.db.get_group_by_invite_code(&code).await?;
        let group = self.db.join_group(&group.id, user_id).await?;
        info!(group_id = %group.id, user = user_id, "joined group");

        self.db
            .insert_notification(&NewNotificationParams {
                id: Uuid::new_v4().to_string(),
                user_id: group.created_by.clone(),
                kind: "group_joined".to_string(),
                message: format!("{user_id} joined {}", group.name),
                link: Some(format!("/groups/{}", group.id)),
                metadata: Some(serde_json::json!({ "groupId": group.id })),
            })
            .await?;

        self.publish(ChangeEvent::Groups);
        self.publish(ChangeEvent::Notifications);
        Ok(group)
    }

    /// Leave a group.
    pub async fn leave_group(&self, user_id: &str, group_id: &str) -> Result<()> {
        self.db.leave_group(group_id, user_id).await?;
        info!(group_id, user = user_id, "left group");
        self.publish(ChangeEvent::Groups);
        Ok(())
    }

    /// Delete a group. Admin only; refused while the group has active bets.
    pub async fn delete_group(&self, group_id: &str, caller: &str) -> Result<()> {
        let group = self.db.get_group(group_id).await?;
        if !group.is_admin(caller) {
            return Err(Error::Validation(
                "Only a group admin can delete the group".to_string(),
            ));
        }

        self.db.delete_group(group_id).await?;
        info!(group_id, caller, "deleted group");
        self.publish(ChangeEvent::Groups);
        Ok(())
    }

    /// The groups a user belongs to.
    pub async fn list_groups(&self, user_id: &str) -> Result<Vec<Group>> {
        self.db.list_groups_for_user(user_id).await.map_err(Into::into)
    }

    /// Send a friend request.
    pub async fn request_friend(&self, requester: &str, recipient: &str) -> Result<Friendship> {
        if requester == recipient {
            return Err(Error::Validation("Cannot befriend yourself".to_string()));
        }

        let friendship = self
            .db
            .insert_friendship(&Uuid::new_v4().to_string(), requester, recipient)
            .await?;
        info!(requester, recipient, "friend request sent");

        self.db
            .insert_notification(&NewNotificationParams {
                id: Uuid::new_v4().to_string(),
                user_id: recipient.to_string(),
                kind: "friend_request".to_string(),
                message: format!("{requester} sent you a friend request"),
                link: Some("/friends".to_string()),
                metadata: None,
            })
            .await?;

        self.publish(ChangeEvent::Friendships);
        self.publish(ChangeEvent::Notifications);
        Ok(friendship)
    }

    /// Accept a friend request. Only the recipient can accept.
    pub async fn accept_friend(&self, friendship_id: &str, caller: &str) -> Result<Friendship> {
        let awaiting = self
            .db
            .list_pending_requests(caller)
            .await?
            .into_iter()
            .any(|f| f.id == friendship_id);
        if !awaiting {
            // Distinguish a bad id from a request the caller cannot answer,
            // without touching the record either way.
            return match self.db.get_friendship(friendship_id).await? {
                None => Err(Error::NotFound(format!("Friendship {friendship_id}"))),
                Some(_) => Err(Error::Validation(format!(
                    "No pending friend request {friendship_id} awaiting {caller}"
                ))),
            };
        }

        let friendship = self.db.accept_friendship(friendship_id).await?;
        info!(friendship_id, caller, "friend request accepted");

        self.db
            .insert_notification(&NewNotificationParams {
                id: Uuid::new_v4().to_string(),
                user_id: friendship.requested_by.clone(),
                kind: "friend_accepted".to_string(),
                message: format!("{caller} accepted your friend request"),
                link: Some("/friends".to_string()),
                metadata: None,
            })
            .await?;

        self.publish(ChangeEvent::Friendships);
        self.publish(ChangeEvent::Notifications);
        Ok(friendship)
    }

    /// Remove a friendship or decline a pending request.
    pub async fn remove_friend(&self, friendship_id: &str) -> Result<()> {
        if !self.db.delete_friendship(friendship_id).await? {
            return Err(Error::NotFound(format!("Friendship {friendship_id}")));
        }
        self.publish(ChangeEvent::Friendships);
        Ok(())
    }

    /// A user's accepted friendships.
    pub async fn list_friends(&self, user_id: &str) -> Result<Vec<Friendship>> {
        self.db.list_friends(user_id).await.map_err(Into::into)
    }

    /// Friend requests waiting on this user's answer.
    pub async fn pending_friend_requests(&self, user_id: &str) -> Result<Vec<Friendship>> {
        self.db.list_pending_requests(user_id).await.map_err(Into::into)
    }

    /// Net pending balances per counterparty, with per-bet breakdowns.
    pub async fn balances(&self, viewer: &str) -> Result<Vec<CounterpartyBalance>> {
        let settlements = self.db.list_pending_settlements(viewer).await?;
        Ok(ledger::net_balances(viewer, &settlements))
    }

    /// A user's unsettled obligations, on either side.
    pub async fn pending_settlements(&self, user_id: &str) -> Result<Vec<Settlement>> {
        self.db.list_pending_settlements(user_id).await.map_err(Into::into)
    }

    /// Mark a settlement paid. Either party can mark it.
    pub async fn settle(&self, settlement_id: &str, caller: &str) -> Result<Settlement> {
        let settlement = self.db.get_settlement(settlement_id).await?;
        if settlement.user1_id != caller && settlement.user2_id != caller {
            return Err(Error::Validation(
                "Only a party to the settlement can mark it paid".to_string(),
            ));
        }

        let settlement = self.db.mark_settled(settlement_id).await?;
        info!(settlement_id, caller, "settlement marked paid");

        let counterparty = if settlement.user1_id == caller {
            &settlement.user2_id
        } else {
            &settlement.user1_id
        };
        self.db
            .insert_notification(&NewNotificationParams {
                id: Uuid::new_v4().to_string(),
                user_id: counterparty.clone(),
                kind: "settlement_paid".to_string(),
                message: format!("{caller} marked a {:.2} settlement paid", settlement.amount),
                link: Some("/settlements".to_string()),
                metadata: Some(serde_json::json!({ "settlementId": settlement_id })),
            })
            .await?;

        self.publish(ChangeEvent::Settlements);
        self.publish(ChangeEvent::Notifications);
        Ok(settlement)
    }

    /// A user's notifications, newest first.
    pub async fn notifications(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.db.list_notifications(user_id).await.map_err(Into::into)
    }

    /// Mark one notification read.
    pub async fn mark_notification_read(&self, id: &str) -> Result<()> {
        self.db.mark_notification_read(id).await?;
        self.publish(ChangeEvent::Notifications);
        Ok(())
    }

    /// Mark all of a user's notifications read.
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64> {
        let updated = self.db.mark_all_notifications_read(user_id).await?;
        if updated > 0 {
            self.publish(ChangeEvent::Notifications);
        }
        Ok(updated)
    }

    /// Delete all of a user's notifications.
    pub async fn clear_notifications(&self, user_id: &str) -> Result<u64> {
        let deleted = self.db.delete_all_notifications(user_id).await?;
        if deleted > 0 {
            self.publish(ChangeEvent::Notifications);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn service() -> BetService {
        BetService::new(Database::open_in_memory().await.unwrap())
    }

    #[test]
    fn invite_codes_use_the_unambiguous_charset() {
        for _ in 0..50 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.bytes().all(|b| INVITE_CODE_CHARSET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn join_by_code_is_case_insensitive() {
        let service = service().await;
        let group = service
            .create_group("alice", "Fantasy League", None, None)
            .await
            .unwrap();

        let joined = service
            .join_group_by_code("bob", &group.invite_code.to_lowercase())
            .await
            .unwrap();
        assert!(joined.is_member("bob"));

        // The creator hears about it.
        assert_eq!(service.database().unread_notification_count("alice").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn only_admins_can_delete_groups() {
        let service = service().await;
        let group = service
            .create_group("alice", "Fantasy League", None, None)
            .await
            .unwrap();
        service.join_group_by_code("bob", &group.invite_code).await.unwrap();

        let err = service.delete_group(&group.id, "bob").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        service.delete_group(&group.id, "alice").await.unwrap();
        assert!(service.list_groups("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn friend_request_flow_with_notifications() {
        let service = service().await;
        let friendship = service.request_friend("alice", "bob").await.unwrap();
        assert!(!friendship.accepted);

        // The requester cannot accept their own request.
        let err = service.accept_friend(&friendship.id, "alice").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let friendship = service.accept_friend(&friendship.id, "bob").await.unwrap();
        assert!(friendship.accepted);

        let alices = service.notifications("alice").await.unwrap();
        assert!(alices.iter().any(|n| n.kind == "friend_accepted"));
    }

    #[tokio::test]
    async fn rejected_accept_leaves_the_request_pending() {
        let service = service().await;
        let friendship = service.request_friend("alice", "bob").await.unwrap();

        let err = service.accept_friend(&friendship.id, "alice").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // The rejected call must not have flipped the row.
        let stored = service
            .database()
            .get_friendship(&friendship.id)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.accepted);

        // The rightful recipient can still accept.
        let friendship = service.accept_friend(&friendship.id, "bob").await.unwrap();
        assert!(friendship.accepted);
    }

    #[tokio::test]
    async fn accepting_unknown_request_is_not_found() {
        let service = service().await;
        let err = service.accept_friend("nope", "bob").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn self_friendship_is_rejected() {
        let service = service().await;
        let err = service.request_friend("alice", "alice").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn balances_net_pending_settlements() {
        let service = service().await;
        let db = service.database();
        db.insert_settlement(
            "s1",
            "alice",
            "bob",
            20.0,
            &[sidebet_core::model::BetShare { bet_id: "b1".to_string(), amount: 20.0 }],
        )
        .await
        .unwrap();
        db.insert_settlement(
            "s2",
            "bob",
            "alice",
            5.0,
            &[sidebet_core::model::BetShare { bet_id: "b2".to_string(), amount: 5.0 }],
        )
        .await
        .unwrap();

        let balances = service.balances("alice").await.unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].user_id, "bob");
        assert!((balances[0].net - 15.0).abs() < 1e-9);

        let balances = service.balances("bob").await.unwrap();
        assert!((balances[0].net + 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn only_parties_can_settle() {
        let service = service().await;
        service
            .database()
            .insert_settlement("s1", "alice", "bob", 20.0, &[])
            .await
            .unwrap();

        let err = service.settle("s1", "mallory").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let settlement = service.settle("s1", "bob").await.unwrap();
        assert!(settlement.settled);
        assert!(service.balances("alice").await.unwrap().is_empty());

        // The other party is notified.
        let alices = service.notifications("alice").await.unwrap();
        assert!(alices.iter().any(|n| n.kind == "settlement_paid"));
    }

    #[tokio::test]
    async fn notification_maintenance() {
        let service = service().await;
        service.request_friend("alice", "bob").await.unwrap();
        service.request_friend("carol", "bob").await.unwrap();

        assert_eq!(service.mark_all_notifications_read("bob").await.unwrap(), 2);
        assert_eq!(service.mark_all_notifications_read("bob").await.unwrap(), 0);
        assert_eq!(service.clear_notifications("bob").await.unwrap(), 2);
        assert!(service.notifications("bob").await.unwrap().is_empty());
    }
}
