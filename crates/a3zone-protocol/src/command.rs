//! Inbound envelopes and the typed client command union.
//!
//! A client frame is `{"command": "...", "payload": {...}}`. Decoding
//! happens in two steps: first the loose [`Envelope`], then
//! [`ClientCommand::from_envelope`] which picks the variant by name and
//! deserializes the payload into that variant's argument struct. Keeping
//! the steps apart lets the dispatcher tell "unknown command" (answered)
//! from "known command, garbage payload" (skipped).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Position, ProtocolError, WorldId};

/// The outer shape of every client frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub command: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(command: impl Into<String>, payload: Value) -> Self {
        Self {
            command: command.into(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// Argument structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AuthTokenArgs {
    pub token: String,
    /// Class to use if the character has to be created.
    #[serde(alias = "class_hint")]
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SkillArgs {
    pub skill_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnterWorldArgs {
    pub world_id: WorldId,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TalkNpcArgs {
    pub npc: Option<String>,
    pub choice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QuestArgs {
    pub quest_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AttackArgs {
    pub target: Option<String>,
    pub target_level: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttackMobArgs {
    pub mob_id: String,
    #[serde(default)]
    pub skill_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AttackPvpArgs {
    pub target: String,
    pub skill_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SetElementArgs {
    pub target: String,
    pub element: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct SummonPetArgs {
    pub pet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RecruitMercArgs {
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EquipItemArgs {
    pub item_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CraftItemArgs {
    pub recipe_id: String,
    /// Signed so that zero and negative requests reach the rules layer
    /// and get a proper `INVALID_QTY` instead of a decode failure.
    #[serde(default = "one")]
    pub qty: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ChatArgs {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct WhisperArgs {
    pub target: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct TargetArgs {
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PartyAcceptArgs {
    /// When set, the pending invite must come from this character.
    pub from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct GuildArgs {
    #[serde(alias = "name")]
    pub guild: String,
}

// ---------------------------------------------------------------------------
// ClientCommand
// ---------------------------------------------------------------------------

/// Every command a client may send, with its typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    AuthToken(AuthTokenArgs),
    Move(Position),
    GetState,
    GetHistory,
    ListEntities,
    SkillTree,
    LearnSkill(SkillArgs),
    EnterWorld(EnterWorldArgs),
    TalkNpc(TalkNpcArgs),
    AcceptQuest(QuestArgs),
    CompleteQuest(QuestArgs),
    Attack(AttackArgs),
    AttackMob(AttackMobArgs),
    AttackPvp(AttackPvpArgs),
    RecoverCorpse,
    SetElement(SetElementArgs),
    SummonPet(SummonPetArgs),
    RecruitMerc(RecruitMercArgs),
    EquipItem(EquipItemArgs),
    GetRecipes,
    CraftItem(CraftItemArgs),
    Say(ChatArgs),
    WorldChat(ChatArgs),
    Whisper(WhisperArgs),
    Who,
    PartyInvite(TargetArgs),
    PartyAccept(PartyAcceptArgs),
    PartyLeave,
    PartyInfo,
    GuildCreate(GuildArgs),
    GuildJoin(GuildArgs),
    GuildLeave,
    GuildList,
}

impl ClientCommand {
    /// Resolves an envelope into a typed command.
    ///
    /// The command name is matched case-insensitively. A missing or
    /// `null` payload is treated as `{}` so commands whose arguments are
    /// all optional work without one.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let name = envelope.command.trim().to_ascii_uppercase();
        let payload = match envelope.payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let cmd = match name.as_str() {
            "AUTH_TOKEN" => Self::AuthToken(args(payload)?),
            "MOVE" => Self::Move(args(payload)?),
            "GET_STATE" => Self::GetState,
            "GET_HISTORY" => Self::GetHistory,
            "LIST_ENTITIES" => Self::ListEntities,
            "SKILL_TREE" => Self::SkillTree,
            "LEARN_SKILL" => Self::LearnSkill(args(payload)?),
            "ENTER_WORLD" => Self::EnterWorld(args(payload)?),
            "TALK_NPC" => Self::TalkNpc(args(payload)?),
            "ACCEPT_QUEST" => Self::AcceptQuest(args(payload)?),
            "COMPLETE_QUEST" => Self::CompleteQuest(args(payload)?),
            "ATTACK" => Self::Attack(args(payload)?),
            "ATTACK_MOB" => Self::AttackMob(args(payload)?),
            "ATTACK_PVP" => Self::AttackPvp(args(payload)?),
            "RECOVER_CORPSE" => Self::RecoverCorpse,
            "SET_ELEMENT" => Self::SetElement(args(payload)?),
            "SUMMON_PET" => Self::SummonPet(args(payload)?),
            "RECRUIT_MERC" => Self::RecruitMerc(args(payload)?),
            "EQUIP_ITEM" => Self::EquipItem(args(payload)?),
            "GET_RECIPES" => Self::GetRecipes,
            "CRAFT_ITEM" => Self::CraftItem(args(payload)?),
            "SAY" => Self::Say(args(payload)?),
            "WORLD_CHAT" => Self::WorldChat(args(payload)?),
            "WHISPER" => Self::Whisper(args(payload)?),
            "WHO" => Self::Who,
            "PARTY_INVITE" => Self::PartyInvite(args(payload)?),
            "PARTY_ACCEPT" => Self::PartyAccept(args(payload)?),
            "PARTY_LEAVE" => Self::PartyLeave,
            "PARTY_INFO" => Self::PartyInfo,
            "GUILD_CREATE" => Self::GuildCreate(args(payload)?),
            "GUILD_JOIN" => Self::GuildJoin(args(payload)?),
            "GUILD_LEAVE" => Self::GuildLeave,
            "GUILD_LIST" => Self::GuildList,
            _ => return Err(ProtocolError::UnknownCommand(name)),
        };
        Ok(cmd)
    }

    /// The only command accepted before authentication.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthToken(_))
    }

    /// Wire name, used for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuthToken(_) => "AUTH_TOKEN",
            Self::Move(_) => "MOVE",
            Self::GetState => "GET_STATE",
            Self::GetHistory => "GET_HISTORY",
            Self::ListEntities => "LIST_ENTITIES",
            Self::SkillTree => "SKILL_TREE",
            Self::LearnSkill(_) => "LEARN_SKILL",
            Self::EnterWorld(_) => "ENTER_WORLD",
            Self::TalkNpc(_) => "TALK_NPC",
            Self::AcceptQuest(_) => "ACCEPT_QUEST",
            Self::CompleteQuest(_) => "COMPLETE_QUEST",
            Self::Attack(_) => "ATTACK",
            Self::AttackMob(_) => "ATTACK_MOB",
            Self::AttackPvp(_) => "ATTACK_PVP",
            Self::RecoverCorpse => "RECOVER_CORPSE",
            Self::SetElement(_) => "SET_ELEMENT",
            Self::SummonPet(_) => "SUMMON_PET",
            Self::RecruitMerc(_) => "RECRUIT_MERC",
            Self::EquipItem(_) => "EQUIP_ITEM",
            Self::GetRecipes => "GET_RECIPES",
            Self::CraftItem(_) => "CRAFT_ITEM",
            Self::Say(_) => "SAY",
            Self::WorldChat(_) => "WORLD_CHAT",
            Self::Whisper(_) => "WHISPER",
            Self::Who => "WHO",
            Self::PartyInvite(_) => "PARTY_INVITE",
            Self::PartyAccept(_) => "PARTY_ACCEPT",
            Self::PartyLeave => "PARTY_LEAVE",
            Self::PartyInfo => "PARTY_INFO",
            Self::GuildCreate(_) => "GUILD_CREATE",
            Self::GuildJoin(_) => "GUILD_JOIN",
            Self::GuildLeave => "GUILD_LEAVE",
            Self::GuildList => "GUILD_LIST",
        }
    }
}

fn args<T: DeserializeOwned>(payload: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(ProtocolError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(command: &str, payload: Value) -> Result<ClientCommand, ProtocolError> {
        ClientCommand::from_envelope(Envelope::new(command, payload))
    }

    // =====================================================================
    // Name resolution
    // =====================================================================

    #[test]
    fn test_from_envelope_lowercase_name_resolves() {
        let cmd = decode("move", json!({"x": 1.0, "y": 0.0, "z": 2.0})).unwrap();
        assert_eq!(cmd, ClientCommand::Move(Position::new(1.0, 0.0, 2.0)));
    }

    #[test]
    fn test_from_envelope_unknown_name_is_unknown_command() {
        let err = decode("DANCE", Value::Null).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(name) if name == "DANCE"));
    }

    #[test]
    fn test_name_matches_wire_name() {
        let cmd = decode("attack_pvp", json!({"target": "Mira"})).unwrap();
        assert_eq!(cmd.name(), "ATTACK_PVP");
    }

    // =====================================================================
    // Payload handling
    // =====================================================================

    #[test]
    fn test_from_envelope_missing_payload_for_optional_args() {
        let cmd = decode("TALK_NPC", Value::Null).unwrap();
        assert_eq!(cmd, ClientCommand::TalkNpc(TalkNpcArgs::default()));
    }

    #[test]
    fn test_from_envelope_bad_payload_is_decode_error() {
        let err = decode("ENTER_WORLD", json!({"world_id": "two"})).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_from_envelope_required_field_missing_is_decode_error() {
        let err = decode("EQUIP_ITEM", json!({})).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[test]
    fn test_from_envelope_auth_token_with_class_hint() {
        let cmd = decode("AUTH_TOKEN", json!({"token": "abc.def", "class": "mage"})).unwrap();
        match cmd {
            ClientCommand::AuthToken(args) => {
                assert_eq!(args.token, "abc.def");
                assert_eq!(args.class.as_deref(), Some("mage"));
            }
            other => panic!("expected AuthToken, got {other:?}"),
        }
    }

    #[test]
    fn test_from_envelope_craft_qty_defaults_to_one() {
        let cmd = decode("CRAFT_ITEM", json!({"recipe_id": "wolfhide_bow"})).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::CraftItem(CraftItemArgs {
                recipe_id: "wolfhide_bow".into(),
                qty: 1
            })
        );
    }

    #[test]
    fn test_from_envelope_craft_negative_qty_survives_decoding() {
        let cmd = decode("CRAFT_ITEM", json!({"recipe_id": "x", "qty": -3})).unwrap();
        assert!(matches!(cmd, ClientCommand::CraftItem(CraftItemArgs { qty: -3, .. })));
    }

    #[test]
    fn test_envelope_without_payload_decodes() {
        let env: Envelope = serde_json::from_str(r#"{"command":"WHO"}"#).unwrap();
        assert_eq!(env.payload, Value::Null);
        assert_eq!(ClientCommand::from_envelope(env).unwrap(), ClientCommand::Who);
    }

    #[test]
    fn test_is_auth_only_for_auth_token() {
        assert!(decode("AUTH_TOKEN", json!({})).unwrap().is_auth());
        assert!(!ClientCommand::Who.is_auth());
    }
}
