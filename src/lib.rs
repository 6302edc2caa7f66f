#![deny(missing_docs)]
//! Telegram bot for the Solana SuperTeam community.
//!
//! Answers free-text questions through an external RAG service and serves
//! FAQs, events and assistant contacts from a content API, with a Redis or
//! in-memory cache in front of both.

/// Content and RAG API clients
pub mod api;
/// Telegram handlers, views and dispatch
pub mod bot;
/// Redis cache with in-memory fallback
pub mod cache;
/// Configuration management
pub mod config;
/// Error taxonomy
pub mod error;
/// Logging setup with secret redaction
pub mod logging;
/// Polling and webhook transports with the health endpoint
pub mod transport;
/// Utility functions
pub mod utils;
