//! Guild roster.
//!
//! The character record's `guild` field is the source of truth for which
//! guild a player belongs to; this roster is a live index rebuilt as
//! players authenticate. A guild disappears when its last member leaves.

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use serde::Serialize;

use crate::SocialError;

/// Reply body for create, join and leave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildUpdate {
    pub guild: String,
    pub member: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildSummary {
    pub name: String,
    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildList {
    pub guilds: Vec<GuildSummary>,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct GuildRegistry {
    roster: RwLock<BTreeMap<String, BTreeSet<String>>>,
}

impl GuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `member` to `guild`, creating the entry if needed. Blank
    /// names are ignored.
    pub fn register_member(&self, guild: &str, member: &str) {
        let guild = guild.trim();
        if guild.is_empty() || member.trim().is_empty() {
            return;
        }
        self.roster
            .write()
            .entry(guild.to_string())
            .or_default()
            .insert(member.to_string());
    }

    /// Founds a new guild with `member` as its only member. `current` is
    /// the member's present guild, which they leave on success.
    pub fn create(&self, member: &str, current: &str, guild: &str) -> Result<GuildUpdate, SocialError> {
        let guild = guild.trim();
        if guild.is_empty() {
            return Err(SocialError::GuildNameRequired);
        }
        let mut roster = self.roster.write();
        if roster.contains_key(guild) {
            return Err(SocialError::GuildExists);
        }
        drop_member(&mut roster, current, member);
        roster.insert(guild.to_string(), BTreeSet::from([member.to_string()]));
        tracing::info!(%guild, founder = %member, "guild created");
        Ok(update(guild, member))
    }

    /// Moves `member` from `current` (if any) into an existing guild.
    pub fn join(&self, member: &str, current: &str, guild: &str) -> Result<GuildUpdate, SocialError> {
        let guild = guild.trim();
        if guild.is_empty() {
            return Err(SocialError::GuildNameRequired);
        }
        let mut roster = self.roster.write();
        if !roster.contains_key(guild) {
            return Err(SocialError::GuildNotFound);
        }
        if current.trim() == guild {
            return Err(SocialError::AlreadyInGuild);
        }
        drop_member(&mut roster, current, member);
        if let Some(members) = roster.get_mut(guild) {
            members.insert(member.to_string());
        }
        Ok(update(guild, member))
    }

    /// Removes `member` from `current`.
    pub fn leave(&self, member: &str, current: &str) -> Result<GuildUpdate, SocialError> {
        let guild = current.trim();
        if guild.is_empty() {
            return Err(SocialError::NotInGuild);
        }
        let mut roster = self.roster.write();
        if !roster.contains_key(guild) {
            return Err(SocialError::GuildNotFound);
        }
        drop_member(&mut roster, guild, member);
        Ok(update(guild, member))
    }

    /// Every guild, sorted by name.
    pub fn list(&self) -> GuildList {
        let guilds: Vec<GuildSummary> = self
            .roster
            .read()
            .iter()
            .map(|(name, members)| GuildSummary {
                name: name.clone(),
                member_count: members.len(),
            })
            .collect();
        GuildList {
            count: guilds.len(),
            guilds,
        }
    }
}

fn drop_member(roster: &mut BTreeMap<String, BTreeSet<String>>, guild: &str, member: &str) {
    let guild = guild.trim();
    let Some(members) = roster.get_mut(guild) else {
        return;
    };
    members.remove(member);
    if members.is_empty() {
        roster.remove(guild);
        tracing::info!(%guild, "guild disbanded");
    }
}

fn update(guild: &str, member: &str) -> GuildUpdate {
    GuildUpdate {
        guild: guild.to_string(),
        member: member.to_string(),
    }
}
