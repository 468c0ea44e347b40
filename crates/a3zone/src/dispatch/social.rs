//! Chat, presence listing, parties and guilds.

use std::sync::Arc;

use a3zone_protocol::{ServerMessage, reply};
use a3zone_rules::Class;
use a3zone_session::{Presence, Session, is_visible};
use a3zone_social::{
    ChatChannel, ChatLine, GuildUpdate, PartyLeave, PartySnapshot, SocialError, sanitize_message,
};
use serde::Serialize;

use super::Effect;
use crate::ZoneError;
use crate::context::ZoneContext;
use crate::payload::world_name;

#[derive(Debug, Serialize)]
struct WhoEntry {
    name: String,
    class: Class,
    level: u32,
    world: &'static str,
    guild: Option<String>,
}

#[derive(Debug, Serialize)]
struct WhoList {
    online: Vec<WhoEntry>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct PartyJoined<'a> {
    reason: &'static str,
    member: &'a str,
    party: &'a PartySnapshot,
}

#[derive(Debug, Serialize)]
struct PartyDeparture<'a> {
    reason: &'static str,
    member: &'a str,
    party_id: &'a str,
    party: Option<&'a PartySnapshot>,
    dissolved: bool,
}

#[derive(Debug, Serialize)]
struct PartyInfo {
    party: Option<PartySnapshot>,
    pending_invite_from: Option<String>,
}

#[derive(Debug, Serialize)]
struct GuildChange<'a> {
    action: &'static str,
    #[serde(flatten)]
    update: &'a GuildUpdate,
}

fn reject(session: &Session, command: &str, reason: SocialError) -> Result<Effect, ZoneError> {
    session.send(ServerMessage::text(command, reason.code()))?;
    Ok(Effect::Done)
}

/// Sends to every authenticated session whose presence passes `filter`.
fn broadcast(ctx: &ZoneContext, msg: &ServerMessage, filter: impl Fn(&Presence) -> bool) {
    ctx.registry.for_each(|peer| {
        if peer.presence().is_some_and(|p| filter(&p)) && peer.send(msg.clone()).is_err() {
            tracing::debug!(session = %peer.id(), "dropped broadcast to closing session");
        }
    });
}

/// Online (authenticated) session for `name`.
fn online(ctx: &ZoneContext, name: &str) -> Option<Arc<Session>> {
    ctx.registry.find(name).filter(|s| s.is_authenticated())
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Local chat: everyone in the same world within sight, sender included.
pub(super) fn say(ctx: &ZoneContext, session: &Session, message: &str) -> Result<Effect, ZoneError> {
    let message = match sanitize_message(message) {
        Ok(message) => message,
        Err(reason) => return reject(session, reply::CHAT_REJECTED, reason),
    };
    let Some(me) = session.presence() else {
        return Ok(Effect::Done);
    };

    let line = ChatLine::new(ChatChannel::Say, &me.name, world_name(me.world), message);
    let msg = ServerMessage::new(reply::CHAT_MESSAGE, line);
    broadcast(ctx, &msg, |p| p.world == me.world && is_visible(&me.position, &p.position));
    Ok(Effect::Done)
}

pub(super) fn world_chat(ctx: &ZoneContext, session: &Session, message: &str) -> Result<Effect, ZoneError> {
    let message = match sanitize_message(message) {
        Ok(message) => message,
        Err(reason) => return reject(session, reply::CHAT_REJECTED, reason),
    };
    let Some(me) = session.presence() else {
        return Ok(Effect::Done);
    };

    let line = ChatLine::new(ChatChannel::World, &me.name, world_name(me.world), message);
    let msg = ServerMessage::new(reply::CHAT_MESSAGE, line);
    broadcast(ctx, &msg, |p| p.world == me.world);
    Ok(Effect::Done)
}

/// Private message. The sender gets a copy unless whispering to
/// themselves, in which case the single delivery is enough.
pub(super) fn whisper(
    ctx: &ZoneContext,
    session: &Session,
    target: &str,
    message: &str,
) -> Result<Effect, ZoneError> {
    let target = target.trim();
    if target.is_empty() {
        return reject(session, reply::CHAT_REJECTED, SocialError::TargetRequired);
    }
    let message = match sanitize_message(message) {
        Ok(message) => message,
        Err(reason) => return reject(session, reply::CHAT_REJECTED, reason),
    };
    let Some(recipient) = online(ctx, target) else {
        return reject(session, reply::CHAT_REJECTED, SocialError::TargetOffline);
    };
    let Some(me) = session.presence() else {
        return Ok(Effect::Done);
    };

    let line = ChatLine::new(ChatChannel::Whisper, &me.name, world_name(me.world), message)
        .to(&recipient.name());
    let msg = ServerMessage::new(reply::CHAT_MESSAGE, line);
    if recipient.send(msg.clone()).is_err() {
        tracing::debug!(session = %recipient.id(), "whisper target closing");
    }
    if recipient.id() != session.id() {
        session.send(msg)?;
    }
    Ok(Effect::Done)
}

/// Every authenticated player, sorted by name.
pub(super) fn who(ctx: &ZoneContext, session: &Session) -> Result<Effect, ZoneError> {
    let mut online = Vec::new();
    ctx.registry.for_each(|peer| {
        let state = peer.lock();
        if !state.authenticated {
            return;
        }
        online.push(WhoEntry {
            name: state.character.name.clone(),
            class: state.character.class,
            level: state.character.level,
            world: world_name(state.world),
            guild: state.character.guild.clone(),
        });
    });
    online.sort_by(|a, b| a.name.cmp(&b.name));

    let count = online.len();
    session.send(ServerMessage::new(reply::WHO, WhoList { online, count }))?;
    Ok(Effect::Done)
}

// ---------------------------------------------------------------------------
// Parties
// ---------------------------------------------------------------------------

pub(super) fn party_invite(ctx: &ZoneContext, session: &Session, target: &str) -> Result<Effect, ZoneError> {
    let target = target.trim();
    let me = session.name();
    if target.is_empty() {
        return reject(session, reply::PARTY_REJECTED, SocialError::TargetRequired);
    }
    if target == me {
        return reject(session, reply::PARTY_REJECTED, SocialError::InvalidTarget);
    }
    let Some(invitee) = online(ctx, target) else {
        return reject(session, reply::PARTY_REJECTED, SocialError::TargetOffline);
    };

    match ctx.parties.invite(&me, target) {
        Ok(invite) => {
            session.send(ServerMessage::new(reply::PARTY_INVITE_SENT, &invite))?;
            if invitee.send(ServerMessage::new(reply::PARTY_INVITE, &invite)).is_err() {
                tracing::debug!(session = %invitee.id(), "party invitee closing");
            }
            Ok(Effect::Done)
        }
        Err(reason) => reject(session, reply::PARTY_REJECTED, reason),
    }
}

pub(super) fn party_accept(ctx: &ZoneContext, session: &Session, from: Option<&str>) -> Result<Effect, ZoneError> {
    let me = session.name();
    let party = match ctx.parties.accept(&me, from) {
        Ok(party) => party,
        Err(reason) => return reject(session, reply::PARTY_REJECTED, reason),
    };
    tracing::info!(party_id = %party.id, member = %me, "joined party");

    let msg = ServerMessage::new(
        reply::PARTY_UPDATE,
        PartyJoined {
            reason: "MEMBER_JOINED",
            member: &me,
            party: &party,
        },
    );
    for name in &party.members {
        if let Some(member) = ctx.registry.find(name) {
            if member.send(msg.clone()).is_err() {
                tracing::debug!(session = %member.id(), "party member closing");
            }
        }
    }
    Ok(Effect::Done)
}

pub(super) fn party_leave(ctx: &ZoneContext, session: &Session) -> Result<Effect, ZoneError> {
    let me = session.name();
    let leave = match ctx.parties.leave(&me) {
        Ok(leave) => leave,
        Err(reason) => return reject(session, reply::PARTY_REJECTED, reason),
    };
    session.send(departure_message("LEFT", &me, &leave))?;
    announce_departure(ctx, "MEMBER_LEFT", &me, &leave);
    Ok(Effect::Done)
}

fn departure_message(reason: &'static str, member: &str, leave: &PartyLeave) -> ServerMessage {
    ServerMessage::new(
        reply::PARTY_UPDATE,
        PartyDeparture {
            reason,
            member,
            party_id: &leave.party_id,
            party: leave.party.as_ref(),
            dissolved: leave.dissolved(),
        },
    )
}

/// Tells the members left behind that `member` is gone.
pub(crate) fn announce_departure(ctx: &ZoneContext, reason: &'static str, member: &str, leave: &PartyLeave) {
    let msg = departure_message(reason, member, leave);
    for name in &leave.remaining {
        if let Some(peer) = ctx.registry.find(name) {
            if peer.send(msg.clone()).is_err() {
                tracing::debug!(session = %peer.id(), "party member closing");
            }
        }
    }
}

pub(super) fn party_info(ctx: &ZoneContext, session: &Session) -> Result<Effect, ZoneError> {
    let me = session.name();
    let info = PartyInfo {
        party: ctx.parties.snapshot_for(&me),
        pending_invite_from: ctx.parties.pending_invite_for(&me),
    };
    session.send(ServerMessage::new(reply::PARTY_INFO, info))?;
    Ok(Effect::Done)
}

// ---------------------------------------------------------------------------
// Guilds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum GuildAction {
    Create,
    Join,
    Leave,
}

impl GuildAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATED",
            Self::Join => "JOINED",
            Self::Leave => "LEFT",
        }
    }
}

/// Applies a roster change and mirrors it onto the character record.
fn change_guild(ctx: &ZoneContext, session: &Session, action: GuildAction, guild: &str) -> Result<Effect, ZoneError> {
    let result = {
        let mut state = session.lock();
        let member = state.character.name.clone();
        let current = state.character.guild.clone().unwrap_or_default();
        let result = match action {
            GuildAction::Create => ctx.guilds.create(&member, &current, guild),
            GuildAction::Join => ctx.guilds.join(&member, &current, guild),
            GuildAction::Leave => ctx.guilds.leave(&member, &current),
        };
        if let Ok(update) = &result {
            state.character.guild = match action {
                GuildAction::Leave => None,
                GuildAction::Create | GuildAction::Join => Some(update.guild.clone()),
            };
        }
        result
    };

    match result {
        Ok(update) => {
            tracing::info!(member = %update.member, guild = %update.guild, action = action.as_str(), "guild change");
            session.send(ServerMessage::new(
                reply::GUILD_UPDATE,
                GuildChange {
                    action: action.as_str(),
                    update: &update,
                },
            ))?;
            Ok(Effect::Changed)
        }
        Err(reason) => reject(session, reply::GUILD_REJECTED, reason),
    }
}

pub(super) fn guild_create(ctx: &ZoneContext, session: &Session, guild: &str) -> Result<Effect, ZoneError> {
    change_guild(ctx, session, GuildAction::Create, guild)
}

pub(super) fn guild_join(ctx: &ZoneContext, session: &Session, guild: &str) -> Result<Effect, ZoneError> {
    change_guild(ctx, session, GuildAction::Join, guild)
}

pub(super) fn guild_leave(ctx: &ZoneContext, session: &Session) -> Result<Effect, ZoneError> {
    change_guild(ctx, session, GuildAction::Leave, "")
}

pub(super) fn guild_list(ctx: &ZoneContext, session: &Session) -> Result<Effect, ZoneError> {
    session.send(ServerMessage::new(reply::GUILD_LIST, ctx.guilds.list()))?;
    Ok(Effect::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{self, drain, find};
    use a3zone_protocol::{Position, WorldId};
    use a3zone_rules::catalog;

    fn spawn() -> Position {
        catalog::spawn_point(WorldId::KNOWN)
    }

    fn far() -> Position {
        Position::new(400.0, 0.0, 400.0)
    }

    // =====================================================================
    // say / world_chat / whisper
    // =====================================================================

    #[test]
    fn test_say_reaches_nearby_and_sender_only() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (_near, mut near_rx) = testing::player(&ctx, 2, "Bram", spawn());
        let (_far, mut far_rx) = testing::player(&ctx, 3, "Cato", far());

        say(&ctx, &session, "  hello  ").unwrap();

        let own = find(&drain(&mut rx), reply::CHAT_MESSAGE).unwrap();
        assert_eq!(own.payload["message"], "hello");
        assert_eq!(own.payload["channel"], "say");
        assert!(find(&drain(&mut near_rx), reply::CHAT_MESSAGE).is_some());
        assert!(drain(&mut far_rx).is_empty());
    }

    #[test]
    fn test_say_blank_message_rejected() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        say(&ctx, &session, "   ").unwrap();

        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::CHAT_REJECTED, "EMPTY_MESSAGE")]);
    }

    #[test]
    fn test_say_skips_unauthenticated_guests() {
        let (ctx, _dir) = testing::context();
        let (session, _rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (_guest, mut guest_rx) = testing::guest(&ctx, 2);

        say(&ctx, &session, "hi").unwrap();

        assert!(drain(&mut guest_rx).is_empty());
    }

    #[test]
    fn test_world_chat_reaches_whole_world_only() {
        let (ctx, _dir) = testing::context();
        let (session, _rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (_far, mut far_rx) = testing::player(&ctx, 2, "Bram", far());
        let (other, mut other_rx) = testing::player(&ctx, 3, "Cato", spawn());
        other.lock().world = WorldId::SHATTERED;

        world_chat(&ctx, &session, "anyone?").unwrap();

        let line = find(&drain(&mut far_rx), reply::CHAT_MESSAGE).unwrap();
        assert_eq!(line.payload["channel"], "world");
        assert!(drain(&mut other_rx).is_empty());
    }

    #[test]
    fn test_whisper_delivers_to_target_and_echoes_sender() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (_bram, mut bram_rx) = testing::player(&ctx, 2, "Bram", far());

        whisper(&ctx, &session, "Bram", "psst").unwrap();

        let got = find(&drain(&mut bram_rx), reply::CHAT_MESSAGE).unwrap();
        assert_eq!(got.payload["to"], "Bram");
        assert_eq!(got.payload["from"], "Ayla");
        assert_eq!(drain(&mut rx), [got]);
    }

    #[test]
    fn test_whisper_to_self_delivered_once() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        whisper(&ctx, &session, "Ayla", "note to self").unwrap();

        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_whisper_offline_target_rejected() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        whisper(&ctx, &session, "Ghost", "hello").unwrap();

        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::CHAT_REJECTED, "TARGET_OFFLINE")]);
    }

    #[test]
    fn test_whisper_missing_target_rejected() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        whisper(&ctx, &session, " ", "hello").unwrap();

        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::CHAT_REJECTED, "TARGET_REQUIRED")]);
    }

    // =====================================================================
    // who
    // =====================================================================

    #[test]
    fn test_who_lists_authenticated_sorted() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Zed", spawn());
        let (_ayla, _arx) = testing::player(&ctx, 2, "Ayla", far());
        let (_guest, _grx) = testing::guest(&ctx, 3);

        who(&ctx, &session).unwrap();

        let msg = find(&drain(&mut rx), reply::WHO).unwrap();
        assert_eq!(msg.payload["count"], 2);
        assert_eq!(msg.payload["online"][0]["name"], "Ayla");
        assert_eq!(msg.payload["online"][1]["name"], "Zed");
    }

    // =====================================================================
    // parties
    // =====================================================================

    #[test]
    fn test_party_invite_notifies_both_sides() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (_bram, mut bram_rx) = testing::player(&ctx, 2, "Bram", spawn());

        party_invite(&ctx, &session, "Bram").unwrap();

        let sent = find(&drain(&mut rx), reply::PARTY_INVITE_SENT).unwrap();
        assert_eq!(sent.payload["to"], "Bram");
        let got = find(&drain(&mut bram_rx), reply::PARTY_INVITE).unwrap();
        assert_eq!(got.payload["from"], "Ayla");
    }

    #[test]
    fn test_party_invite_self_and_offline_rejected() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        party_invite(&ctx, &session, "Ayla").unwrap();
        party_invite(&ctx, &session, "Ghost").unwrap();
        party_invite(&ctx, &session, "").unwrap();

        assert_eq!(
            drain(&mut rx),
            [
                ServerMessage::text(reply::PARTY_REJECTED, "INVALID_TARGET"),
                ServerMessage::text(reply::PARTY_REJECTED, "TARGET_OFFLINE"),
                ServerMessage::text(reply::PARTY_REJECTED, "TARGET_REQUIRED"),
            ]
        );
    }

    #[test]
    fn test_party_accept_updates_all_members() {
        let (ctx, _dir) = testing::context();
        let (ayla, mut ayla_rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (bram, mut bram_rx) = testing::player(&ctx, 2, "Bram", spawn());
        party_invite(&ctx, &ayla, "Bram").unwrap();
        drain(&mut ayla_rx);
        drain(&mut bram_rx);

        party_accept(&ctx, &bram, Some("Ayla")).unwrap();

        for rx in [&mut ayla_rx, &mut bram_rx] {
            let update = find(&drain(rx), reply::PARTY_UPDATE).unwrap();
            assert_eq!(update.payload["reason"], "MEMBER_JOINED");
            assert_eq!(update.payload["member"], "Bram");
            assert_eq!(update.payload["party"]["size"], 2);
        }
    }

    #[test]
    fn test_party_accept_without_invite_rejected() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        party_accept(&ctx, &session, None).unwrap();

        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::PARTY_REJECTED, "NO_INVITE")]);
    }

    #[test]
    fn test_party_leave_dissolves_pair() {
        let (ctx, _dir) = testing::context();
        let (ayla, mut ayla_rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (bram, mut bram_rx) = testing::player(&ctx, 2, "Bram", spawn());
        party_invite(&ctx, &ayla, "Bram").unwrap();
        party_accept(&ctx, &bram, None).unwrap();
        drain(&mut ayla_rx);
        drain(&mut bram_rx);

        party_leave(&ctx, &bram).unwrap();

        let own = find(&drain(&mut bram_rx), reply::PARTY_UPDATE).unwrap();
        assert_eq!(own.payload["reason"], "LEFT");
        assert_eq!(own.payload["dissolved"], true);
        let other = find(&drain(&mut ayla_rx), reply::PARTY_UPDATE).unwrap();
        assert_eq!(other.payload["reason"], "MEMBER_LEFT");
        assert_eq!(other.payload["member"], "Bram");
        assert!(ctx.parties.snapshot_for("Ayla").is_none());
    }

    #[test]
    fn test_party_info_reports_pending_invite() {
        let (ctx, _dir) = testing::context();
        let (ayla, _arx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (bram, mut bram_rx) = testing::player(&ctx, 2, "Bram", spawn());
        party_invite(&ctx, &ayla, "Bram").unwrap();
        drain(&mut bram_rx);

        party_info(&ctx, &bram).unwrap();

        let info = find(&drain(&mut bram_rx), reply::PARTY_INFO).unwrap();
        assert!(info.payload["party"].is_null());
        assert_eq!(info.payload["pending_invite_from"], "Ayla");
    }

    // =====================================================================
    // guilds
    // =====================================================================

    #[test]
    fn test_guild_create_sets_character_guild() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        let effect = guild_create(&ctx, &session, "Wardens").unwrap();

        assert_eq!(effect, Effect::Changed);
        assert_eq!(session.lock().character.guild.as_deref(), Some("Wardens"));
        let msg = find(&drain(&mut rx), reply::GUILD_UPDATE).unwrap();
        assert_eq!(msg.payload["action"], "CREATED");
        assert_eq!(msg.payload["guild"], "Wardens");
        assert_eq!(msg.payload["member"], "Ayla");
    }

    #[test]
    fn test_guild_join_then_leave_clears_guild() {
        let (ctx, _dir) = testing::context();
        let (founder, _frx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (session, mut rx) = testing::player(&ctx, 2, "Bram", spawn());
        guild_create(&ctx, &founder, "Wardens").unwrap();

        guild_join(&ctx, &session, "Wardens").unwrap();
        assert_eq!(session.lock().character.guild.as_deref(), Some("Wardens"));
        guild_leave(&ctx, &session).unwrap();

        assert!(session.lock().character.guild.is_none());
        let actions: Vec<_> = drain(&mut rx)
            .into_iter()
            .map(|m| m.payload["action"].clone())
            .collect();
        assert_eq!(actions, ["JOINED", "LEFT"]);
    }

    #[test]
    fn test_guild_join_unknown_rejected() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        let effect = guild_join(&ctx, &session, "Nowhere").unwrap();

        assert_eq!(effect, Effect::Done);
        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::GUILD_REJECTED, "GUILD_NOT_FOUND")]);
    }

    #[test]
    fn test_guild_list_counts_members() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());
        guild_create(&ctx, &session, "Wardens").unwrap();
        drain(&mut rx);

        guild_list(&ctx, &session).unwrap();

        let msg = find(&drain(&mut rx), reply::GUILD_LIST).unwrap();
        assert_eq!(msg.payload["count"], 1);
        assert_eq!(msg.payload["guilds"][0]["name"], "Wardens");
        assert_eq!(msg.payload["guilds"][0]["member_count"], 1);
    }
}
