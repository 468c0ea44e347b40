//! Rule rejections.
//!
//! Every rule either applies completely or returns a [`Rejection`] and
//! leaves the character untouched. The variant's [`code`](Rejection::code)
//! is what clients see, so the strings are part of the protocol.

/// Why a domain rule refused to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("no corpse to recover")]
    NoCorpse,
    #[error("quantity must be between 1 and the craft limit")]
    InvalidQty,
    #[error("recipe not found")]
    RecipeNotFound,
    #[error("recipe output template is missing")]
    RecipeOutputInvalid,
    #[error("character level too low")]
    LevelTooLow,
    #[error("not enough crafting materials")]
    InsufficientMaterials,
    #[error("skill not found for class")]
    SkillNotFound,
    #[error("no skill points left")]
    NoSkillPoints,
    #[error("skill already at max rank")]
    MaxRankReached,
    #[error("quest not found")]
    QuestNotFound,
    #[error("quest is hidden")]
    QuestHidden,
    #[error("quest not accepted")]
    QuestNotAccepted,
    #[error("quest cannot be repeated")]
    QuestNonRepeatable,
    #[error("npc trust too low")]
    NpcTrustTooLow,
    #[error("world not found")]
    WorldNotFound,
    #[error("world is locked")]
    WorldLocked,
    #[error("level outside world range")]
    LevelNotInRange,
    #[error("aura required")]
    AuraRequired,
    #[error("item not in inventory")]
    ItemNotFound,
    #[error("invalid target")]
    InvalidTarget,
}

impl Rejection {
    /// The reason code sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoCorpse => "NO_CORPSE",
            Self::InvalidQty => "INVALID_QTY",
            Self::RecipeNotFound => "RECIPE_NOT_FOUND",
            Self::RecipeOutputInvalid => "RECIPE_OUTPUT_INVALID",
            Self::LevelTooLow => "LEVEL_TOO_LOW",
            Self::InsufficientMaterials => "INSUFFICIENT_MATERIALS",
            Self::SkillNotFound => "SKILL_NOT_FOUND",
            Self::NoSkillPoints => "NO_SKILL_POINTS",
            Self::MaxRankReached => "MAX_RANK_REACHED",
            Self::QuestNotFound => "QUEST_NOT_FOUND",
            Self::QuestHidden => "QUEST_HIDDEN",
            Self::QuestNotAccepted => "QUEST_NOT_ACCEPTED",
            Self::QuestNonRepeatable => "QUEST_NON_REPEATABLE",
            Self::NpcTrustTooLow => "NPC_TRUST_TOO_LOW",
            Self::WorldNotFound => "WORLD_NOT_FOUND",
            Self::WorldLocked => "WORLD_LOCKED",
            Self::LevelNotInRange => "LEVEL_NOT_IN_RANGE",
            Self::AuraRequired => "AURA_REQUIRED",
            Self::ItemNotFound => "ITEM_NOT_FOUND",
            Self::InvalidTarget => "INVALID_TARGET",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_screaming_snake_case() {
        assert_eq!(Rejection::InsufficientMaterials.code(), "INSUFFICIENT_MATERIALS");
        assert_eq!(Rejection::NoCorpse.code(), "NO_CORPSE");
    }
}
