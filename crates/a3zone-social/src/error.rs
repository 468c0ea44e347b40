//! Error types for the social layer.

/// Why a party, guild or chat request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SocialError {
    #[error("a target name is required")]
    TargetRequired,
    #[error("cannot target yourself")]
    InvalidTarget,
    #[error("target is not online")]
    TargetOffline,
    #[error("target already belongs to a party")]
    TargetAlreadyInParty,
    #[error("only the party leader can invite")]
    NotPartyLeader,
    #[error("no pending invite")]
    NoInvite,
    #[error("pending invite is from someone else")]
    InviteMismatch,
    #[error("already in a party")]
    AlreadyInParty,
    #[error("not in a party")]
    NotInParty,
    #[error("party no longer exists")]
    PartyNotFound,
    #[error("guild name is required")]
    GuildNameRequired,
    #[error("guild already exists")]
    GuildExists,
    #[error("guild not found")]
    GuildNotFound,
    #[error("not in a guild")]
    NotInGuild,
    #[error("already in a guild")]
    AlreadyInGuild,
    #[error("message is empty")]
    EmptyMessage,
}

impl SocialError {
    /// The reason code sent on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::TargetRequired => "TARGET_REQUIRED",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::TargetOffline => "TARGET_OFFLINE",
            Self::TargetAlreadyInParty => "TARGET_ALREADY_IN_PARTY",
            Self::NotPartyLeader => "NOT_PARTY_LEADER",
            Self::NoInvite => "NO_INVITE",
            Self::InviteMismatch => "INVITE_MISMATCH",
            Self::AlreadyInParty => "ALREADY_IN_PARTY",
            Self::NotInParty => "NOT_IN_PARTY",
            Self::PartyNotFound => "PARTY_NOT_FOUND",
            Self::GuildNameRequired => "GUILD_NAME_REQUIRED",
            Self::GuildExists => "GUILD_EXISTS",
            Self::GuildNotFound => "GUILD_NOT_FOUND",
            Self::NotInGuild => "NOT_IN_GUILD",
            Self::AlreadyInGuild => "ALREADY_IN_GUILD",
            Self::EmptyMessage => "EMPTY_MESSAGE",
        }
    }
}
