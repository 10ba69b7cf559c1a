//! MAESTRO Core — self-hosted research automation: a Mission Controller
//! that drives a multi-agent research/writing loop, and a Hybrid RAG
//! index/retriever it draws sources from.

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;
