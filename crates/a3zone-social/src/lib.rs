//! # a3zone-social
//!
//! Everything players do with each other that isn't a fight: parties,
//! guilds and chat.
//!
//! The registries here know only names. Looking up whether a name is
//! online, and delivering the resulting messages, is the server's job.

mod error;

pub mod chat;
pub mod guild;
pub mod party;

pub use chat::{ChatChannel, ChatLine, sanitize_message};
pub use error::SocialError;
pub use guild::{GuildList, GuildRegistry, GuildSummary, GuildUpdate};
pub use party::{PartyInvite, PartyLeave, PartyRegistry, PartySnapshot};
