//! Domain layer: models, ports, and the error taxonomy. No adapter,
//! transport, or storage concerns live here (hexagonal architecture).

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, IngestionError, MissionError, RagError, SubstrateError};
