//! Ambient engineering concerns (configuration, logging) that sit outside
//! the domain/ports/adapters/services layering.

pub mod config;
pub mod logging;
