//! # a3zone
//!
//! Authoritative zone server for Project A3.
//!
//! Clients connect over newline-delimited JSON (or WebSocket), prove who
//! they are with a signed token, and then move, fight, chat and trade
//! inside one of three worlds. The server owns every character: it
//! validates each command, applies the rules, tells nearby players what
//! changed and writes the character back to storage.
//!
//! The layers live in their own crates and meet here:
//!
//! - `a3zone-transport`: line-framed TCP and WebSocket connections
//! - `a3zone-protocol`: envelopes, commands and replies
//! - `a3zone-session`: sessions, tokens, limiters and visibility
//! - `a3zone-rules`: characters, combat, progression and the catalog
//! - `a3zone-world`: world unlocks and live mobs
//! - `a3zone-social`: chat, parties and guilds
//! - `a3zone-store`: JSON and SQLite character storage
//! - `a3zone-tick`: the housekeeping clock
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use a3zone::{ZoneConfig, ZoneServer};
//!
//! # async fn start() -> Result<(), a3zone::ZoneError> {
//! let server = ZoneServer::builder()
//!     .config(ZoneConfig::load_with_env("config.json"))
//!     .build_tcp()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod context;
mod dispatch;
mod error;
mod handler;
mod payload;
mod server;
mod tick;

pub use config::{ConfigError, LimitsConfig, TransportKind, ZoneConfig};
pub use error::ZoneError;
pub use server::{ZoneServer, ZoneServerBuilder};
