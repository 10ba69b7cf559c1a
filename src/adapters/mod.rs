//! Concrete implementations of the domain ports.

pub mod convert;
pub mod embeddings;
pub mod fetch;
pub mod search;
pub mod sqlite;
pub mod substrates;
