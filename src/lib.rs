//! Aethermind - semantic rules retrieval for trading-card games
//!
//! Retrieves the rule passages most relevant to a natural-language question
//! and, when configured, produces a generated answer and logs the
//! interaction for later reuse as training data.
//!
//! - [`retrieval`] - chunking, embeddings, flat L2 index, search engine
//! - [`answer`] - OpenRouter-compatible answer generation
//! - [`history`] - SQLite interaction log
//! - [`web`] - axum REST API
//! - [`config`] - TOML configuration

pub mod answer;
pub mod config;
pub mod history;
pub mod retrieval;
pub mod web;
