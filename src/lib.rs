pub mod access;
pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod orchestration;
pub mod store;

pub use access::{AccessFilter, ReportView, Role};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    CapitalMovement, Client, ClientId, Decimal, MonthKey, MovementKind, SplitConfig,
    SplitConfigSet, Stock, Trade,
};
pub use engine::{compute_report, EngineReport, LedgerSnapshot};
pub use error::AppError;
pub use orchestration::{Ingestor, Orchestrator};
pub use store::{LedgerStore, MemoryStore};
