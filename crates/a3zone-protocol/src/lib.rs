//! Wire protocol for the A3 zone server.
//!
//! - **Types** ([`WorldId`], [`Position`]): values shared by every layer.
//! - **Commands** ([`Envelope`], [`ClientCommand`]): what clients send.
//! - **Messages** ([`ServerMessage`], [`reply`]): what the server sends.
//! - **Codec** ([`Codec`], [`JsonCodec`]): frame bytes ↔ Rust values.
//!
//! ```text
//! Transport (frames) → Protocol (ClientCommand) → Dispatcher
//! Dispatcher → Protocol (ServerMessage) → Transport (frames)
//! ```

mod codec;
mod command;
mod error;
mod message;
mod types;

pub use codec::{Codec, JsonCodec};
pub use command::{
    AttackArgs, AttackMobArgs, AttackPvpArgs, AuthTokenArgs, ChatArgs, ClientCommand,
    CraftItemArgs, EnterWorldArgs, Envelope, EquipItemArgs, GuildArgs, PartyAcceptArgs,
    QuestArgs, RecruitMercArgs, SetElementArgs, SkillArgs, SummonPetArgs, TalkNpcArgs,
    TargetArgs, WhisperArgs,
};
pub use error::ProtocolError;
pub use message::{ServerMessage, reply};
pub use types::{Position, WorldId};
