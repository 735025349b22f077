//! Create-bet wizard state machine.
//!
//! A linear stepper with a branching step count: the group flow has five
//! steps (who → type → details → stakes → confirm) and the head-to-head flow
//! four (who → type+details → stakes+preview → confirm). "Continue" is gated
//! by a per-step validity predicate; "Back" on step 1 discards all state.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{BetCategory, BetKind};

/// Everything the wizard hands to the bet-creation collaborator on confirm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBetRequest {
    pub kind: BetKind,
    pub category: BetCategory,
    pub question: String,
    pub description: Option<String>,
    pub group_id: Option<String>,
    pub challenged_id: Option<String>,
    pub stake: f64,
    pub line: Option<f64>,
    pub closes_at: i64,
}

/// What "Back" did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    /// Back on step 1: the wizard closed and discarded its state.
    Closed,
    SteppedBack,
}

/// Wizard state. Steps are 1-based.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: u8,
    default_stake: f64,
    pub category: Option<BetCategory>,
    pub group_id: Option<String>,
    pub challenged_id: Option<String>,
    pub kind: Option<BetKind>,
    pub question: String,
    pub description: String,
    pub line: Option<f64>,
    pub stake: f64,
    pub closes_at: Option<i64>,
}

impl Wizard {
    pub fn new(default_stake: f64) -> Self {
        Self {
            step: 1,
            default_stake,
            category: None,
            group_id: None,
            challenged_id: None,
            kind: None,
            question: String::new(),
            description: String::new(),
            line: None,
            stake: default_stake,
            closes_at: None,
        }
    }

    pub const fn step(&self) -> u8 {
        self.step
    }

    /// Total steps in the current flow. The head-to-head count also applies
    /// before a category is chosen, matching the source.
    pub fn total_steps(&self) -> u8 {
        if self.category == Some(BetCategory::Group) { 5 } else { 4 }
    }

    const fn is_group_flow(&self) -> bool {
        matches!(self.category, Some(BetCategory::Group))
    }

    /// Per-step validity predicate gating "Continue".
    pub fn can_continue(&self, now: i64) -> bool {
        match (self.step, self.is_group_flow()) {
            (1, _) => self.who_valid(),
            (2, true) => self.kind_valid(),
            (3, true) => self.details_valid(),
            (2, false) => self.kind_valid() && self.details_valid(),
            (4, true) | (3, false) => self.stakes_valid(now),
            _ => self.step == self.total_steps(),
        }
    }

    fn who_valid(&self) -> bool {
        match self.category {
            None => false,
            Some(BetCategory::Group) => self.group_id.is_some(),
            Some(BetCategory::HeadToHead) => self.challenged_id.is_some(),
        }
    }

    fn kind_valid(&self) -> bool {
        match self.kind {
            None => false,
            Some(BetKind::YesNo) => true,
            Some(BetKind::OverUnder) => self.line.is_some_and(|l| l > 0.0),
        }
    }

    fn details_valid(&self) -> bool {
        !self.question.trim().is_empty()
    }

    fn stakes_valid(&self, now: i64) -> bool {
        self.stake > 0.0 && self.closes_at.is_some_and(|t| t > now)
    }

    /// Advance one step. Fails with a validation error when the current
    /// step's predicate does not hold; does nothing on the final step.
    pub fn advance(&mut self, now: i64) -> Result<()> {
        if !self.can_continue(now) {
            return Err(Error::Validation(format!(
                "Step {} of {} is incomplete",
                self.step,
                self.total_steps()
            )));
        }
        self.step = (self.step + 1).min(self.total_steps());
        Ok(())
    }

    /// Step back. On step 1 this closes the wizard and discards all state.
    pub fn back(&mut self) -> BackAction {
        if self.step == 1 {
            *self = Self::new(self.default_stake);
            BackAction::Closed
        } else {
            self.step -= 1;
            BackAction::SteppedBack
        }
    }

    /// Final confirmation: yields the accumulated request and resets the
    /// wizard to its initial empty state. Only valid on the last step.
    pub fn confirm(&mut self, now: i64) -> Result<CreateBetRequest> {
        if self.step != self.total_steps() {
            return Err(Error::Validation(format!(
                "Cannot confirm on step {} of {}",
                self.step,
                self.total_steps()
            )));
        }
        if !(self.who_valid() && self.kind_valid() && self.details_valid() && self.stakes_valid(now)) {
            return Err(Error::Validation("Bet details are incomplete".to_string()));
        }

        let category = self
            .category
            .ok_or_else(|| Error::Validation("No bet category selected".to_string()))?;
        let kind = self
            .kind
            .ok_or_else(|| Error::Validation("No bet type selected".to_string()))?;
        let closes_at = self
            .closes_at
            .ok_or_else(|| Error::Validation("No closing time set".to_string()))?;

        let request = CreateBetRequest {
            kind,
            category,
            question: self.question.trim().to_string(),
            description: if self.description.trim().is_empty() {
                None
            } else {
                Some(self.description.trim().to_string())
            },
            group_id: self.group_id.clone(),
            challenged_id: self.challenged_id.clone(),
            stake: self.stake,
            line: self.line,
            closes_at,
        };

        *self = Self::new(self.default_stake);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_800_000_000;
    const TOMORROW: i64 = NOW + 48 * 3600;

    fn group_wizard() -> Wizard {
        let mut w = Wizard::new(10.0);
        w.category = Some(BetCategory::Group);
        w.group_id = Some("g1".to_string());
        w
    }

    #[test]
    fn starts_on_step_one() {
        let w = Wizard::new(10.0);
        assert_eq!(w.step(), 1);
        assert_eq!(w.total_steps(), 4);
        assert!(!w.can_continue(NOW));
    }

    #[test]
    fn group_flow_has_five_steps() {
        assert_eq!(group_wizard().total_steps(), 5);
    }

    #[test]
    fn over_under_requires_positive_line() {
        let mut w = group_wizard();
        w.advance(NOW).unwrap();
        assert_eq!(w.step(), 2);

        w.kind = Some(BetKind::OverUnder);
        assert!(!w.can_continue(NOW), "missing line must disable Continue");

        w.line = Some(45.5);
        assert!(w.can_continue(NOW), "line=45.5 must enable Continue");
    }

    #[test]
    fn yes_no_needs_no_line() {
        let mut w = group_wizard();
        w.advance(NOW).unwrap();
        w.kind = Some(BetKind::YesNo);
        assert!(w.can_continue(NOW));
    }

    #[test]
    fn advance_rejects_incomplete_step() {
        let mut w = Wizard::new(10.0);
        let err = w.advance(NOW).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(w.step(), 1);
    }

    #[test]
    fn back_on_step_one_discards_state() {
        let mut w = group_wizard();
        w.question = "half-typed".to_string();
        assert_eq!(w.back(), BackAction::Closed);
        assert_eq!(w.step(), 1);
        assert!(w.category.is_none());
        assert!(w.question.is_empty());
    }

    #[test]
    fn back_decrements_otherwise() {
        let mut w = group_wizard();
        w.advance(NOW).unwrap();
        assert_eq!(w.back(), BackAction::SteppedBack);
        assert_eq!(w.step(), 1);
        // State is kept when stepping back
        assert_eq!(w.category, Some(BetCategory::Group));
    }

    #[test]
    fn full_group_flow_confirms_and_resets() {
        let mut w = group_wizard();
        w.advance(NOW).unwrap(); // who -> type

        w.kind = Some(BetKind::YesNo);
        w.advance(NOW).unwrap(); // type -> details

        w.question = "Will it snow this weekend?".to_string();
        w.advance(NOW).unwrap(); // details -> stakes

        w.stake = 20.0;
        w.closes_at = Some(TOMORROW);
        w.advance(NOW).unwrap(); // stakes -> confirm
        assert_eq!(w.step(), 5);

        let req = w.confirm(NOW).unwrap();
        assert_eq!(req.category, BetCategory::Group);
        assert_eq!(req.group_id.as_deref(), Some("g1"));
        assert_eq!(req.question, "Will it snow this weekend?");
        assert!((req.stake - 20.0).abs() < f64::EPSILON);

        // Reset to the initial empty state
        assert_eq!(w.step(), 1);
        assert!(w.category.is_none());
        assert!((w.stake - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn h2h_flow_is_four_steps_with_combined_details() {
        let mut w = Wizard::new(10.0);
        w.category = Some(BetCategory::HeadToHead);
        w.challenged_id = Some("rival".to_string());
        assert_eq!(w.total_steps(), 4);
        w.advance(NOW).unwrap();

        // Step 2 combines type and details
        w.kind = Some(BetKind::OverUnder);
        w.line = Some(45.5);
        assert!(!w.can_continue(NOW), "question still missing");
        w.question = "Over 45.5 combined points?".to_string();
        w.advance(NOW).unwrap();

        w.closes_at = Some(TOMORROW);
        w.advance(NOW).unwrap();
        assert_eq!(w.step(), 4);

        let req = w.confirm(NOW).unwrap();
        assert_eq!(req.category, BetCategory::HeadToHead);
        assert_eq!(req.challenged_id.as_deref(), Some("rival"));
        assert_eq!(req.line, Some(45.5));
    }

    #[test]
    fn confirm_off_final_step_fails() {
        let mut w = group_wizard();
        let err = w.confirm(NOW).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn stakes_require_future_closing_time() {
        let mut w = group_wizard();
        w.kind = Some(BetKind::YesNo);
        w.question = "Q".to_string();
        w.advance(NOW).unwrap(); // who
        w.advance(NOW).unwrap(); // type
        w.advance(NOW).unwrap(); // details
        assert_eq!(w.step(), 4);
        w.advance(NOW).unwrap_err(); // stakes step, no closing time

        w.closes_at = Some(NOW - 10);
        assert!(!w.can_continue(NOW));
        w.closes_at = Some(NOW + 10);
        assert!(w.can_continue(NOW));
    }
}
