//! clara library
//!
//! MangaDex access layer (cache, rate limiting, retries, normalization and
//! fallbacks) plus the local library and CLI plumbing, exposed for the binary
//! and integration tests.

pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod data;
pub mod logging;
pub mod store;
