//! Document-to-markdown conversion adapters.

pub mod identity;

pub use identity::IdentityConverter;
