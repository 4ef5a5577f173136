//! SQLite persistence for the ledger.
//!
//! This module provides:
//! - Database initialization, pragmas and schema
//! - `Repository`, the SQLite implementation of `LedgerStore`

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
