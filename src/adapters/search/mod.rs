//! Web search adapters.

pub mod reqwest_search;

pub use reqwest_search::ReqwestSearcher;
