//! `SQLite` storage for `Sidebet`.
//!
//! Provides persistence for bets, picks, groups, friendships, settlements,
//! and notifications.

mod db;
mod models;
mod queries_bets;
mod queries_friends;
mod queries_groups;
mod queries_notifications;
mod queries_settlements;

pub use db::{Database, DatabaseError};
pub use models::*;
pub use queries_bets::NewBetParams;
pub use queries_groups::NewGroupParams;
pub use queries_notifications::NewNotificationParams;
