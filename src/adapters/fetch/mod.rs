//! Web fetch adapters.

pub mod reqwest_fetch;

pub use reqwest_fetch::ReqwestFetcher;
