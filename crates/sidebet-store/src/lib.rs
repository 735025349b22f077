//! `Sidebet` persistence layer.
//!
//! `SQLite` storage for bets, picks, groups, friendships, settlements, and
//! notifications, plus the transactional mutation service (`BetService`)
//! and its broadcast change feed.

pub mod service;
pub mod storage;

pub use service::{BetService, ChangeEvent};
pub use storage::{Database, DatabaseError};
