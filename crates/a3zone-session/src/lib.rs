//! Player sessions for the A3 zone server.
//!
//! This crate covers everything about a connection that isn't game rules:
//!
//! 1. **Authentication**: checking signed session tokens ([`TokenVerifier`])
//!    and throttling attempts per address ([`AuthAttemptLimiter`])
//! 2. **Session tracking**: each connection's state and outbound queue
//!    ([`Session`]), indexed by id and character name ([`SessionRegistry`])
//! 3. **Visibility**: telling players who just came into or out of view
//!    ([`Visibility`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (above)  ← drives sessions from each connection task
//!     ↕
//! Session Layer (this crate)  ← identity, live state, who-sees-whom
//!     ↕
//! Rules + Protocol (below)  ← Character, Position, ServerMessage
//! ```
//!
//! # Lock order
//!
//! Registry, then a session's state, then the visibility pairs. No lock
//! here is ever held across an `.await`.

mod auth;
mod error;
mod limiter;
mod registry;
mod session;
mod visibility;

pub use auth::{Claims, DEFAULT_AUTH_SECRET, MAX_CLOCK_SKEW_SECS, TOKEN_ISSUER, TOKEN_VERSION, TokenVerifier};
pub use error::{SessionError, TokenError};
pub use limiter::{AuthAttemptLimiter, AuthLimiterConfig, CommandWindow};
pub use registry::SessionRegistry;
pub use session::{Outbound, Presence, Session, SessionId, SessionState};
pub use visibility::{VISIBILITY_RADIUS, Visibility, is_visible};
