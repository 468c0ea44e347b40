//! Error types for world state.

/// Why a mob attack could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("no such mob in this world")]
    MobNotFound,
    #[error("mob is beyond reach")]
    MobOutOfRange,
    #[error("mob is already defeated")]
    MobAlreadyDefeated,
}

impl WorldError {
    /// The reason code sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MobNotFound => "MOB_NOT_FOUND",
            Self::MobOutOfRange => "MOB_OUT_OF_RANGE",
            Self::MobAlreadyDefeated => "MOB_ALREADY_DEFEATED",
        }
    }
}
