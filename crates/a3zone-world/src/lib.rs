//! Shared world state for the A3 zone server.
//!
//! - [`WorldDirectory`]: which worlds are open to everyone, and who
//!   opened them first
//! - [`MobTable`]: live creatures, attacks against them, and delayed
//!   respawns
//!
//! Both are plain thread-safe values. The server builds one of each and
//! shares them through `Arc`; tests build their own.

mod directory;
mod error;
mod mobs;

pub use directory::{UnlockHistory, WorldDirectory};
pub use error::WorldError;
pub use mobs::{Mob, MobHit, MobTable};
