//! Glue between callers, the ledger store and the engine.

pub mod ingestor;
pub mod orchestrator;

pub use ingestor::{IngestionError, Ingestor, MovementOutcome, UploadSummary};
pub use orchestrator::{OrchestrationError, Orchestrator};
