//! Parties: invites, membership and leader handover.
//!
//! A party only exists once an invite is accepted. The inviter becomes
//! the leader; only the leader may invite more players. When the leader
//! leaves, leadership passes to the member whose name sorts first. A
//! party that drops below two members dissolves.
//!
//! # Key types
//!
//! - [`PartyRegistry`]: every party and every pending invite, behind one lock
//! - [`PartySnapshot`]: what clients see (`id`, `leader`, `members`, `size`)
//! - [`PartyLeave`]: the outcome of a member leaving, with who to notify

use std::collections::{BTreeSet, HashMap};

use parking_lot::RwLock;
use serde::Serialize;

use crate::SocialError;

/// Wire view of one party. Members are sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartySnapshot {
    pub id: String,
    pub leader: String,
    pub members: Vec<String>,
    pub size: usize,
}

/// A stored invite, echoed back to both players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartyInvite {
    pub from: String,
    pub to: String,
}

/// Result of a member leaving (voluntarily or by disconnecting).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyLeave {
    pub party_id: String,
    /// `None` once the party dissolved.
    pub party: Option<PartySnapshot>,
    /// Members still online who should hear about the change. Includes
    /// the last member of a dissolved party.
    pub remaining: Vec<String>,
}

impl PartyLeave {
    pub fn dissolved(&self) -> bool {
        self.party.is_none()
    }
}

#[derive(Debug)]
struct Party {
    id: String,
    leader: String,
    members: BTreeSet<String>,
}

impl Party {
    fn snapshot(&self) -> PartySnapshot {
        PartySnapshot {
            id: self.id.clone(),
            leader: self.leader.clone(),
            members: self.members.iter().cloned().collect(),
            size: self.members.len(),
        }
    }
}

#[derive(Debug, Default)]
struct PartyState {
    parties: HashMap<String, Party>,
    by_member: HashMap<String, String>,
    /// invitee -> inviter. One pending invite per invitee; a newer
    /// invite replaces the older one.
    invites: HashMap<String, String>,
    next_id: u64,
}

impl PartyState {
    fn party_of(&self, name: &str) -> Option<&Party> {
        self.by_member.get(name).and_then(|id| self.parties.get(id))
    }
}

/// All parties on this server.
#[derive(Debug, Default)]
pub struct PartyRegistry {
    state: RwLock<PartyState>,
}

impl PartyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an invite from `inviter` to `target`.
    ///
    /// Whether `target` is online is the caller's concern; this only
    /// checks party rules.
    pub fn invite(&self, inviter: &str, target: &str) -> Result<PartyInvite, SocialError> {
        let target = target.trim();
        if target.is_empty() {
            return Err(SocialError::TargetRequired);
        }
        if target == inviter {
            return Err(SocialError::InvalidTarget);
        }

        let mut state = self.state.write();
        if state.by_member.contains_key(target) {
            return Err(SocialError::TargetAlreadyInParty);
        }
        if let Some(party) = state.party_of(inviter) {
            if party.leader != inviter {
                return Err(SocialError::NotPartyLeader);
            }
        }
        state
            .invites
            .insert(target.to_string(), inviter.to_string());
        tracing::debug!(%inviter, %target, "party invite stored");

        Ok(PartyInvite {
            from: inviter.to_string(),
            to: target.to_string(),
        })
    }

    /// Accepts the pending invite for `target`. When `from` is given it
    /// must name the inviter.
    pub fn accept(&self, target: &str, from: Option<&str>) -> Result<PartySnapshot, SocialError> {
        let mut state = self.state.write();
        let inviter = state
            .invites
            .get(target)
            .cloned()
            .ok_or(SocialError::NoInvite)?;
        if let Some(from) = from.map(str::trim).filter(|f| !f.is_empty()) {
            if from != inviter {
                return Err(SocialError::InviteMismatch);
            }
        }
        if state.by_member.contains_key(target) {
            return Err(SocialError::AlreadyInParty);
        }

        let party_id = match state.by_member.get(&inviter).cloned() {
            Some(id) => id,
            None => {
                state.next_id += 1;
                let id = format!("party_{}", state.next_id);
                state.parties.insert(
                    id.clone(),
                    Party {
                        id: id.clone(),
                        leader: inviter.clone(),
                        members: BTreeSet::from([inviter.clone()]),
                    },
                );
                state.by_member.insert(inviter.clone(), id.clone());
                tracing::info!(party_id = %id, leader = %inviter, "party formed");
                id
            }
        };

        let party = state
            .parties
            .get_mut(&party_id)
            .ok_or(SocialError::PartyNotFound)?;
        party.members.insert(target.to_string());
        let snapshot = party.snapshot();
        state.by_member.insert(target.to_string(), party_id);
        state.invites.remove(target);

        Ok(snapshot)
    }

    /// Removes `member` from their party.
    pub fn leave(&self, member: &str) -> Result<PartyLeave, SocialError> {
        let mut state = self.state.write();
        let party_id = state
            .by_member
            .remove(member)
            .ok_or(SocialError::NotInParty)?;
        let party = state
            .parties
            .get_mut(&party_id)
            .ok_or(SocialError::PartyNotFound)?;

        party.members.remove(member);
        if party.leader == member {
            if let Some(next) = party.members.first() {
                party.leader = next.clone();
            }
        }
        let remaining: Vec<String> = party.members.iter().cloned().collect();
        let snapshot = (remaining.len() >= 2).then(|| party.snapshot());

        let Some(snapshot) = snapshot else {
            state.parties.remove(&party_id);
            for name in &remaining {
                state.by_member.remove(name);
            }
            tracing::info!(%party_id, "party dissolved");
            return Ok(PartyLeave {
                party_id,
                party: None,
                remaining,
            });
        };

        Ok(PartyLeave {
            party_id,
            party: Some(snapshot),
            remaining,
        })
    }

    /// Drops every invite sent to or by `name`.
    pub fn clear_invites_for(&self, name: &str) {
        self.state
            .write()
            .invites
            .retain(|to, from| to != name && from != name);
    }

    /// Cleanup for a player going offline: clears invites, then leaves
    /// the party if in one.
    pub fn disconnect(&self, name: &str) -> Option<PartyLeave> {
        self.clear_invites_for(name);
        self.leave(name).ok()
    }

    pub fn snapshot_for(&self, name: &str) -> Option<PartySnapshot> {
        self.state.read().party_of(name).map(Party::snapshot)
    }

    /// Other members of `name`'s party, sorted. Empty when not in one.
    pub fn members_of(&self, name: &str) -> Vec<String> {
        self.state
            .read()
            .party_of(name)
            .map(|p| p.members.iter().filter(|m| *m != name).cloned().collect())
            .unwrap_or_default()
    }

    pub fn pending_invite_for(&self, name: &str) -> Option<String> {
        self.state.read().invites.get(name).cloned()
    }
}
