//! Game rules for the A3 zone server.
//!
//! Everything here is synchronous and operates on a [`Character`] owned
//! by the caller. Randomness comes in through the [`Roller`] trait so
//! combat and loot are deterministic under test.
//!
//! # Key pieces
//!
//! - [`Character`]: the persisted player record and its invariants
//! - [`catalog`]: compiled-in worlds, NPCs, mobs, skills, quests, recipes
//! - [`combat`], [`pvp`]: attack resolution, death and corpse recovery
//! - [`progression`]: XP, levels and party bonuses
//! - [`skills`], [`quests`], [`travel`], [`crafting`], [`loot`]
//! - [`Rejection`]: why a rule refused to apply (wire reason codes)
//!
//! # How it fits in the stack
//!
//! ```text
//! Server (dispatch)  ← locks a session, calls a rule, sends the result
//!     ↕
//! Rules (this crate) ← pure functions over Character + Roller
//!     ↕
//! Protocol           ← Position, WorldId
//! ```

pub mod catalog;
mod character;
pub mod combat;
pub mod crafting;
mod dice;
mod error;
pub mod loot;
pub mod progression;
pub mod pvp;
pub mod quests;
pub mod skills;
pub mod travel;

pub use character::{
    Character, Class, Element, ElementTarget, Elemental, FALLBACK_NAME, Item, MercenaryState,
    PetState, QuestProgress, Rarity, STARTER_LEVEL, STARTER_SKILL_POINTS, Slot,
};
pub use dice::{FixedRoller, Roller};
pub use error::Rejection;
