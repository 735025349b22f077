//! `Sidebet` Core Library
//!
//! Shared functionality for `Sidebet` components:
//! - Bet data model and lifecycle rules
//! - Vote aggregation and bet filtering
//! - Create-bet wizard state machine
//! - Balance/payout ledger math
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod model;
pub mod status;
pub mod tracing_init;
pub mod votes;
pub mod wizard;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{Bet, BetCategory, BetKind, BetStatus, Outcome, Pick, PickEntry};
pub use status::DisplayStatus;
