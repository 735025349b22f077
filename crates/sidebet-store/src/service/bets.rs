//! Bet lifecycle operations: create, vote, close, judge, challenge response.

use tracing::info;
use uuid::Uuid;

use sidebet_core::db::unix_timestamp;
use sidebet_core::ledger::{self, JudgeOutcome};
use sidebet_core::model::{Bet, BetCategory, BetKind, BetStatus, ChallengeStatus, Outcome, Pick};
use sidebet_core::wizard::CreateBetRequest;
use sidebet_core::{Error, Result};

use crate::storage::{NewBetParams, NewNotificationParams};

use super::{BetService, ChangeEvent};

impl BetService {
    /// Create a bet from a confirmed wizard request.
    ///
    /// Group bets open immediately and notify the other members; head-to-head
    /// bets start pending and notify the challenged friend. The bet row, the
    /// notifications, and the group's active-bet counter all land in one
    /// transaction.
    pub async fn create_bet(&self, creator_id: &str, request: &CreateBetRequest) -> Result<Bet> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(Error::Validation("Question must not be empty".to_string()));
        }
        if request.stake <= 0.0 {
            return Err(Error::Validation("Stake must be positive".to_string()));
        }
        if request.closes_at <= unix_timestamp() {
            return Err(Error::Validation(
                "Closing time must be in the future".to_string(),
            ));
        }
        if request.kind == BetKind::OverUnder
            && !request.line.is_some_and(|line| line > 0.0)
        {
            return Err(Error::Validation(
                "Over/under bets need a positive line".to_string(),
            ));
        }

        let bet_id = Uuid::new_v4().to_string();
        let mut notifications = Vec::new();

        let params = match request.category {
            BetCategory::Group => {
                let group_id = request.group_id.as_deref().ok_or_else(|| {
                    Error::Validation("Group bets need a group".to_string())
                })?;
                let group = self.db.get_group(group_id).await?;
                if !group.is_member(creator_id) {
                    return Err(Error::Validation(format!(
                        "Not a member of group {group_id}"
                    )));
                }
                if let Some(cap) = group.max_wager
                    && request.stake > cap
                {
                    return Err(Error::Validation(format!(
                        "Stake exceeds the group's max wager of {cap}"
                    )));
                }

                for member in group.members.iter().filter(|m| *m != creator_id) {
                    notifications.push(NewNotificationParams {
                        id: Uuid::new_v4().to_string(),
                        user_id: member.clone(),
                        kind: "bet_created".to_string(),
                        message: format!("New bet in {}: {question}", group.name),
                        link: Some(format!("/bets/{bet_id}")),
                        metadata: Some(serde_json::json!({ "betId": bet_id })),
                    });
                }

                NewBetParams {
                    id: bet_id.clone(),
                    kind: request.kind,
                    category: BetCategory::Group,
                    question: question.to_string(),
                    description: request.description.clone(),
                    creator_id: creator_id.to_string(),
                    group_id: Some(group_id.to_string()),
                    challenger_id: None,
                    challenged_id: None,
                    challenge_status: None,
                    stake: request.stake,
                    line: request.line,
                    closes_at: request.closes_at,
                    status: BetStatus::Open,
                }
            }
            BetCategory::HeadToHead => {
                let challenged_id = request.challenged_id.as_deref().ok_or_else(|| {
                    Error::Validation("Head-to-head bets need an opponent".to_string())
                })?;
                if challenged_id == creator_id {
                    return Err(Error::Validation("Cannot challenge yourself".to_string()));
                }
                let friends = self
                    .db
                    .find_friendship(creator_id, challenged_id)
                    .await?
                    .is_some_and(|f| f.accepted);
                if !friends {
                    return Err(Error::Validation(format!(
                        "Not friends with {challenged_id}"
                    )));
                }

                notifications.push(NewNotificationParams {
                    id: Uuid::new_v4().to_string(),
                    user_id: challenged_id.to_string(),
                    kind: "challenge_received".to_string(),
                    message: format!("{creator_id} challenged you: {question}"),
                    link: Some(format!("/bets/{bet_id}")),
                    metadata: Some(serde_json::json!({ "betId": bet_id })),
                });

                NewBetParams {
                    id: bet_id.clone(),
                    kind: request.kind,
                    category: BetCategory::HeadToHead,
                    question: question.to_string(),
                    description: request.description.clone(),
                    creator_id: creator_id.to_string(),
                    group_id: None,
                    challenger_id: Some(creator_id.to_string()),
                    challenged_id: Some(challenged_id.to_string()),
                    challenge_status: Some(ChallengeStatus::Pending),
                    stake: request.stake,
                    line: request.line,
                    closes_at: request.closes_at,
                    status: BetStatus::Pending,
                }
            }
        };

        let bet = self.db.create_bet_atomic(&params, &notifications).await?;
        info!(bet_id = %bet.id, creator = creator_id, "created bet");

        self.publish(ChangeEvent::Bets);
        if !notifications.is_empty() {
            self.publish(ChangeEvent::Notifications);
        }
        Ok(bet)
    }

    /// Place or replace a pick on an open bet.
    pub async fn vote_bet(
        &self,
        bet_id: &str,
        user_id: &str,
        pick: Pick,
        amount: f64,
    ) -> Result<Bet> {
        if amount <= 0.0 {
            return Err(Error::Validation("Amount must be positive".to_string()));
        }

        let bet = self.db.get_bet(bet_id).await?;
        if !pick.is_legal_for(bet.kind) {
            return Err(Error::Validation(format!(
                "{pick} is not a valid pick for a {} bet",
                bet.kind.as_str()
            )));
        }

        match bet.category {
            BetCategory::Group => {
                if let Some(ref group_id) = bet.group_id {
                    let group = self.db.get_group(group_id).await?;
                    if !group.is_member(user_id) {
                        return Err(Error::Validation(format!(
                            "Not a member of group {group_id}"
                        )));
                    }
                    if let Some(cap) = group.max_wager
                        && amount > cap
                    {
                        return Err(Error::Validation(format!(
                            "Amount exceeds the group's max wager of {cap}"
                        )));
                    }
                }
            }
            BetCategory::HeadToHead => {
                let party = bet.challenger_id.as_deref() == Some(user_id)
                    || bet.challenged_id.as_deref() == Some(user_id);
                if !party {
                    return Err(Error::Validation(
                        "Only the two parties can pick on a head-to-head bet".to_string(),
                    ));
                }
            }
        }

        let bet = self
            .db
            .record_pick(bet_id, user_id, pick, amount, unix_timestamp())
            .await?;
        info!(bet_id, user = user_id, %pick, amount, "recorded pick");

        self.publish(ChangeEvent::Bets);
        Ok(bet)
    }

    /// Close an open bet to further picks. Creator only.
    pub async fn close_bet(&self, bet_id: &str, caller: &str) -> Result<Bet> {
        let bet = self.db.get_bet(bet_id).await?;
        if bet.creator_id != caller {
            return Err(Error::Validation(
                "Only the creator can close a bet".to_string(),
            ));
        }

        self.db
            .update_bet_status(bet_id, BetStatus::Open, BetStatus::Closed)
            .await?;
        info!(bet_id, "closed bet");

        self.publish(ChangeEvent::Bets);
        self.db.get_bet(bet_id).await.map_err(Into::into)
    }

    /// Judge a closed bet: record the result, pay out the pot, and write
    /// settlements for each loser-to-winner obligation. A push refunds all
    /// stakes and produces no settlements.
    pub async fn judge_bet(
        &self,
        bet_id: &str,
        caller: &str,
        result: Outcome,
    ) -> Result<(Bet, JudgeOutcome)> {
        let bet = self.db.get_bet(bet_id).await?;
        if bet.creator_id != caller {
            return Err(Error::Validation(
                "Only the creator can judge a bet".to_string(),
            ));
        }
        if !result
            .winning_pick()
            .is_none_or(|pick| pick.is_legal_for(bet.kind))
        {
            return Err(Error::Validation(format!(
                "{result} is not a valid result for a {} bet",
                bet.kind.as_str()
            )));
        }

        let outcome = ledger::compute_payouts(&bet, result);

        let notifications: Vec<NewNotificationParams> = outcome
            .payouts
            .iter()
            .map(|payout| {
                let message = if outcome.refunded {
                    format!("\"{}\" was a push; your stake was refunded", bet.question)
                } else if outcome.winners.contains(&payout.user_id) {
                    format!("You won {:.2} on \"{}\"", payout.amount, bet.question)
                } else {
                    format!("You lost {:.2} on \"{}\"", payout.staked, bet.question)
                };
                NewNotificationParams {
                    id: Uuid::new_v4().to_string(),
                    user_id: payout.user_id.clone(),
                    kind: "bet_judged".to_string(),
                    message,
                    link: Some(format!("/bets/{bet_id}")),
                    metadata: Some(serde_json::json!({ "betId": bet_id })),
                }
            })
            .collect();

        let bet = self
            .db
            .apply_judgement(
                bet_id,
                result,
                &outcome.winners,
                &outcome.settlements,
                &notifications,
            )
            .await?;
        info!(bet_id, %result, winners = outcome.winners.len(), "judged bet");

        self.publish(ChangeEvent::Bets);
        if !outcome.settlements.is_empty() {
            self.publish(ChangeEvent::Settlements);
        }
        if !notifications.is_empty() {
            self.publish(ChangeEvent::Notifications);
        }
        Ok((bet, outcome))
    }

    /// Accept a pending head-to-head challenge, opening the bet.
    pub async fn accept_challenge(&self, bet_id: &str, caller: &str) -> Result<Bet> {
        self.respond_to_challenge(bet_id, caller, true).await
    }

    /// Decline a pending head-to-head challenge, cancelling the bet.
    pub async fn decline_challenge(&self, bet_id: &str, caller: &str) -> Result<Bet> {
        self.respond_to_challenge(bet_id, caller, false).await
    }

    async fn respond_to_challenge(
        &self,
        bet_id: &str,
        caller: &str,
        accepted: bool,
    ) -> Result<Bet> {
        let bet = self.db.get_bet(bet_id).await?;
        if bet.challenged_id.as_deref() != Some(caller) {
            return Err(Error::Validation(
                "Only the challenged user can respond".to_string(),
            ));
        }

        let bet = self.db.set_challenge_response(bet_id, accepted).await?;

        if let Some(ref challenger) = bet.challenger_id {
            let verb = if accepted { "accepted" } else { "declined" };
            self.db
                .insert_notification(&NewNotificationParams {
                    id: Uuid::new_v4().to_string(),
                    user_id: challenger.clone(),
                    kind: format!("challenge_{verb}"),
                    message: format!("{caller} {verb} your challenge: {}", bet.question),
                    link: Some(format!("/bets/{bet_id}")),
                    metadata: Some(serde_json::json!({ "betId": bet_id })),
                })
                .await?;
        }
        info!(bet_id, caller, accepted, "challenge response");

        self.publish(ChangeEvent::Bets);
        self.publish(ChangeEvent::Notifications);
        Ok(bet)
    }

    /// All bets relevant to a user, newest first.
    pub async fn list_bets(&self, user_id: &str) -> Result<Vec<Bet>> {
        self.db.list_bets_for_user(user_id).await.map_err(Into::into)
    }

    /// Fetch one bet.
    pub async fn get_bet(&self, bet_id: &str) -> Result<Bet> {
        self.db.get_bet(bet_id).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn service_with_group() -> (BetService, String) {
        let db = Database::open_in_memory().await.unwrap();
        let service = BetService::new(db);
        let group = service
            .create_group("alice", "Fantasy League", None, Some(100.0))
            .await
            .unwrap();
        service.join_group_by_code("bob", &group.invite_code).await.unwrap();
        service.join_group_by_code("carol", &group.invite_code).await.unwrap();
        (service, group.id)
    }

    fn group_request(group_id: &str) -> CreateBetRequest {
        CreateBetRequest {
            kind: BetKind::YesNo,
            category: BetCategory::Group,
            question: "Will it rain tomorrow?".to_string(),
            description: None,
            group_id: Some(group_id.to_string()),
            challenged_id: None,
            stake: 10.0,
            line: None,
            closes_at: unix_timestamp() + 3600,
        }
    }

    #[tokio::test]
    async fn group_bet_opens_and_notifies_members() {
        let (service, group_id) = service_with_group().await;

        let bet = service.create_bet("alice", &group_request(&group_id)).await.unwrap();
        assert_eq!(bet.status, BetStatus::Open);
        assert_eq!(bet.category, BetCategory::Group);

        // Members are notified; the creator is not.
        let bobs = service.database().list_notifications("bob").await.unwrap();
        assert!(bobs.iter().any(|n| n.kind == "bet_created"));
        let alices = service.database().list_notifications("alice").await.unwrap();
        assert!(alices.iter().all(|n| n.kind != "bet_created"));

        let group = service.database().get_group(&group_id).await.unwrap();
        assert_eq!(group.active_bets, 1);
    }

    #[tokio::test]
    async fn non_member_cannot_create_group_bet() {
        let (service, group_id) = service_with_group().await;
        let err = service
            .create_bet("mallory", &group_request(&group_id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn stake_above_group_cap_is_rejected() {
        let (service, group_id) = service_with_group().await;
        let mut request = group_request(&group_id);
        request.stake = 500.0;

        let err = service.create_bet("alice", &request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn illegal_pick_for_kind_is_rejected() {
        let (service, group_id) = service_with_group().await;
        let bet = service.create_bet("alice", &group_request(&group_id)).await.unwrap();

        let err = service
            .vote_bet(&bet.id, "bob", Pick::Over, 10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn full_lifecycle_produces_settlements() {
        let (service, group_id) = service_with_group().await;
        let bet = service.create_bet("alice", &group_request(&group_id)).await.unwrap();

        service.vote_bet(&bet.id, "alice", Pick::Yes, 10.0).await.unwrap();
        service.vote_bet(&bet.id, "bob", Pick::No, 10.0).await.unwrap();
        service.close_bet(&bet.id, "alice").await.unwrap();

        let (judged, outcome) = service.judge_bet(&bet.id, "alice", Outcome::Yes).await.unwrap();
        assert_eq!(judged.status, BetStatus::Judged);
        assert_eq!(outcome.winners, ["alice"]);
        assert!(!outcome.refunded);

        let pending = service.database().list_pending_settlements("bob").await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!((pending[0].amount - 10.0).abs() < 1e-9);

        // The group's active-bet slot is released.
        let group = service.database().get_group(&group_id).await.unwrap();
        assert_eq!(group.active_bets, 0);
    }

    #[tokio::test]
    async fn push_refunds_without_settlements() {
        let (service, group_id) = service_with_group().await;
        let mut request = group_request(&group_id);
        request.kind = BetKind::OverUnder;
        request.line = Some(45.5);
        let bet = service.create_bet("alice", &request).await.unwrap();

        service.vote_bet(&bet.id, "alice", Pick::Over, 10.0).await.unwrap();
        service.vote_bet(&bet.id, "bob", Pick::Under, 10.0).await.unwrap();
        service.close_bet(&bet.id, "alice").await.unwrap();

        let (judged, outcome) = service.judge_bet(&bet.id, "alice", Outcome::Push).await.unwrap();
        assert_eq!(judged.result, Some(Outcome::Push));
        assert!(outcome.refunded);
        assert!(outcome.settlements.is_empty());
        assert!(service.database().list_pending_settlements("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn only_creator_can_close_and_judge() {
        let (service, group_id) = service_with_group().await;
        let bet = service.create_bet("alice", &group_request(&group_id)).await.unwrap();

        let err = service.close_bet(&bet.id, "bob").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        service.close_bet(&bet.id, "alice").await.unwrap();
        let err = service.judge_bet(&bet.id, "bob", Outcome::Yes).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn judging_an_open_bet_is_conflict() {
        let (service, group_id) = service_with_group().await;
        let bet = service.create_bet("alice", &group_request(&group_id)).await.unwrap();

        let err = service.judge_bet(&bet.id, "alice", Outcome::Yes).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn head_to_head_challenge_flow() {
        let db = Database::open_in_memory().await.unwrap();
        let service = BetService::new(db);
        service.request_friend("alice", "bob").await.unwrap();
        let friendship = service
            .database()
            .find_friendship("alice", "bob")
            .await
            .unwrap()
            .unwrap();
        service.accept_friend(&friendship.id, "bob").await.unwrap();

        let request = CreateBetRequest {
            kind: BetKind::YesNo,
            category: BetCategory::HeadToHead,
            question: "Will I beat you at chess?".to_string(),
            description: None,
            group_id: None,
            challenged_id: Some("bob".to_string()),
            stake: 20.0,
            line: None,
            closes_at: unix_timestamp() + 3600,
        };
        let bet = service.create_bet("alice", &request).await.unwrap();
        assert_eq!(bet.status, BetStatus::Pending);
        assert_eq!(bet.challenge_status, Some(ChallengeStatus::Pending));

        // Challenger cannot answer their own challenge.
        let err = service.accept_challenge(&bet.id, "alice").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let bet = service.accept_challenge(&bet.id, "bob").await.unwrap();
        assert_eq!(bet.status, BetStatus::Open);
        assert_eq!(bet.challenge_status, Some(ChallengeStatus::Accepted));
    }

    #[tokio::test]
    async fn challenging_a_stranger_is_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        let service = BetService::new(db);

        let request = CreateBetRequest {
            kind: BetKind::YesNo,
            category: BetCategory::HeadToHead,
            question: "Will I beat you at chess?".to_string(),
            description: None,
            group_id: None,
            challenged_id: Some("stranger".to_string()),
            stake: 20.0,
            line: None,
            closes_at: unix_timestamp() + 3600,
        };
        let err = service.create_bet("alice", &request).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn change_feed_announces_bets() {
        let (service, group_id) = service_with_group().await;
        let mut feed = service.subscribe();

        service.create_bet("alice", &group_request(&group_id)).await.unwrap();
        assert_eq!(feed.recv().await.unwrap(), ChangeEvent::Bets);
    }
}
