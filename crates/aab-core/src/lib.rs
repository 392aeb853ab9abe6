//! Core domain + pipeline logic for the Amazon Affiliate Bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the YOURLS
//! shortening service live behind ports (traits) implemented in adapter
//! crates; everything here is testable without a network.

pub mod caption;
pub mod condition;
pub mod config;
pub mod domain;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod formatting;
pub mod identity;
pub mod links;
pub mod logging;
pub mod pipeline;
pub mod ports;
pub mod resolve;
pub mod security;

pub use errors::{Error, Result};
