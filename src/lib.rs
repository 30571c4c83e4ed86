//! Document caching stage for GraphQL client pipelines.
//!
//! Queries are answered from a per-session result cache; mutations evict the
//! cached queries that share an entity type with their payload and ask the
//! client to re-run them.

pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod pipeline;
