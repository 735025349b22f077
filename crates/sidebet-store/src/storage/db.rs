//! Database connection and initialization.

pub use sidebet_core::db::DatabaseError;

sidebet_core::define_database!(Database, "Ledger database migrations complete");
