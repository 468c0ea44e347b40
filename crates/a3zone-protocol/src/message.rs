//! Outbound messages.
//!
//! Server frames mirror the client envelope: `{"command", "payload"}`.
//! The payload is either a reason string (rejections) or an object
//! built from a typed struct, so it is kept as a `serde_json::Value`
//! once constructed. That makes a message cheap to clone when the same
//! notification fans out to several sessions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single frame sent to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

impl ServerMessage {
    /// Builds a message from any serializable payload.
    ///
    /// Payload types in this workspace only use string-keyed maps, which
    /// `serde_json` always represents; should a payload still fail to
    /// convert, the message goes out with a `null` payload.
    pub fn new(command: &str, payload: impl Serialize) -> Self {
        let payload = serde_json::to_value(payload).unwrap_or(Value::Null);
        Self {
            command: command.to_string(),
            payload,
        }
    }

    /// A message whose payload is a bare string (reason codes, notices).
    pub fn text(command: &str, text: &str) -> Self {
        Self {
            command: command.to_string(),
            payload: Value::String(text.to_string()),
        }
    }
}

/// Wire names of every server command.
pub mod reply {
    pub const AUTH_REQUIRED: &str = "AUTH_REQUIRED";
    pub const AUTH_OK: &str = "AUTH_OK";
    pub const AUTH_REJECTED: &str = "AUTH_REJECTED";
    pub const AUTH_LOCKED: &str = "AUTH_LOCKED";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const ERROR: &str = "ERROR";

    pub const ENTER_OK: &str = "ENTER_OK";
    pub const ENTER_DENIED: &str = "ENTER_DENIED";
    pub const STATE: &str = "STATE";
    pub const HISTORY: &str = "HISTORY";
    pub const ENTITIES: &str = "ENTITIES";

    pub const MOVE_OK: &str = "MOVE_OK";
    pub const MOVE_REJECTED: &str = "MOVE_REJECTED";
    pub const PLAYER_JOINED: &str = "PLAYER_JOINED";
    pub const PLAYER_MOVED: &str = "PLAYER_MOVED";
    pub const PLAYER_LEFT: &str = "PLAYER_LEFT";

    pub const SKILL_TREE: &str = "SKILL_TREE";
    pub const SKILL_LEARNED: &str = "SKILL_LEARNED";
    pub const SKILL_REJECTED: &str = "SKILL_REJECTED";
    pub const NPC_STATE: &str = "NPC_STATE";
    pub const QUEST_ACCEPTED: &str = "QUEST_ACCEPTED";
    pub const QUEST_COMPLETED: &str = "QUEST_COMPLETED";
    pub const QUEST_REJECTED: &str = "QUEST_REJECTED";

    pub const COMBAT_RESULT: &str = "COMBAT_RESULT";
    pub const PLAYER_DIED: &str = "PLAYER_DIED";
    pub const MOB_ATTACK_RESULT: &str = "MOB_ATTACK_RESULT";
    pub const MOB_ATTACK_REJECTED: &str = "MOB_ATTACK_REJECTED";
    pub const PVP_RESULT: &str = "PVP_RESULT";
    pub const PVP_HIT: &str = "PVP_HIT";
    pub const PVP_REJECTED: &str = "PVP_REJECTED";
    pub const CORPSE_RECOVERY: &str = "CORPSE_RECOVERY";

    pub const ELEMENT_SET: &str = "ELEMENT_SET";
    pub const ELEMENT_REJECTED: &str = "ELEMENT_REJECTED";
    pub const PET_SUMMONED: &str = "PET_SUMMONED";
    pub const MERC_RECRUITED: &str = "MERC_RECRUITED";
    pub const EQUIP_OK: &str = "EQUIP_OK";
    pub const EQUIP_REJECTED: &str = "EQUIP_REJECTED";
    pub const RECIPES: &str = "RECIPES";
    pub const CRAFT_OK: &str = "CRAFT_OK";
    pub const CRAFT_REJECTED: &str = "CRAFT_REJECTED";

    pub const CHAT_MESSAGE: &str = "CHAT_MESSAGE";
    pub const CHAT_REJECTED: &str = "CHAT_REJECTED";
    pub const WHO: &str = "WHO";
    pub const PARTY_INVITE: &str = "PARTY_INVITE";
    pub const PARTY_INVITE_SENT: &str = "PARTY_INVITE_SENT";
    pub const PARTY_UPDATE: &str = "PARTY_UPDATE";
    pub const PARTY_INFO: &str = "PARTY_INFO";
    pub const PARTY_REJECTED: &str = "PARTY_REJECTED";
    pub const PARTY_XP_SHARE: &str = "PARTY_XP_SHARE";
    pub const GUILD_UPDATE: &str = "GUILD_UPDATE";
    pub const GUILD_LIST: &str = "GUILD_LIST";
    pub const GUILD_REJECTED: &str = "GUILD_REJECTED";
}
