//! Telegram adapter (teloxide).
//!
//! Receives messages, picks out eligible product links, runs the core
//! pipeline and replies with the finished product card. All Telegram
//! specifics stay in this crate; `aab-core` never sees the transport.

pub mod handlers;
pub mod router;
