//! `AUTH_TOKEN`: the only way out of the unauthenticated state.

use std::sync::Arc;
use std::time::Instant;

use a3zone_protocol::{AuthTokenArgs, Position, ServerMessage, WorldId, reply};
use a3zone_rules::{Character, Class, catalog};
use a3zone_session::{Session, SessionError};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::Effect;
use crate::ZoneError;
use crate::context::ZoneContext;
use crate::payload::{EnterOk, state_message, world_name};

const TOKEN_REQUIRED: &str = "TOKEN_REQUIRED";
const TOKEN_INVALID: &str = "TOKEN_INVALID";
const LOAD_FAILED: &str = "LOAD_FAILED";
const ALREADY_AUTHENTICATED: &str = "ALREADY_AUTHENTICATED";
const TOO_MANY_AUTH_FAILURES: &str = "TOO_MANY_AUTH_FAILURES";
const SESSION_REPLACED: &str = "SESSION_REPLACED";

#[derive(Debug, Serialize)]
struct AuthOk<'a> {
    name: &'a str,
    class: Class,
    world: &'static str,
}

#[derive(Debug, Serialize)]
struct Throttled {
    reason: &'static str,
    retry_after_sec: u64,
}

pub(super) async fn authenticate(
    ctx: &Arc<ZoneContext>,
    session: &Arc<Session>,
    args: AuthTokenArgs,
) -> Result<Effect, ZoneError> {
    if session.is_authenticated() {
        session.send(ServerMessage::text(reply::AUTH_REJECTED, ALREADY_AUTHENTICATED))?;
        return Ok(Effect::Done);
    }

    let peer = session.peer();
    match ctx.limiter.check(peer.ip(), Instant::now()) {
        Ok(()) => {}
        Err(SessionError::Throttled { retry_after }) => {
            warn!(session = %session.id(), %peer, "auth throttled, closing");
            session.send(ServerMessage::new(
                reply::AUTH_LOCKED,
                Throttled {
                    reason: "TOO_MANY_ATTEMPTS",
                    retry_after_sec: retry_after.as_secs(),
                },
            ))?;
            return Ok(Effect::Close);
        }
        Err(e) => return Err(e.into()),
    }

    let token = args.token.trim();
    if token.is_empty() {
        return reject(ctx, session, TOKEN_REQUIRED).await;
    }
    let claims = match ctx.verifier.verify(token, chrono::Utc::now().timestamp()) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(session = %session.id(), %peer, reason = e.code(), "token refused");
            return reject(ctx, session, TOKEN_INVALID).await;
        }
    };

    let store = Arc::clone(&ctx.store);
    let username = claims.username;
    let class_hint = args.class;
    let loaded = tokio::task::spawn_blocking(move || store.load(&username, class_hint.as_deref())).await;
    let character = match loaded {
        Ok(Ok(c)) => c,
        Ok(Err(e)) => {
            error!(session = %session.id(), error = %e, "character load failed");
            session.send(ServerMessage::text(reply::AUTH_REJECTED, LOAD_FAILED))?;
            return Ok(Effect::Done);
        }
        Err(e) => {
            error!(session = %session.id(), error = %e, "character load task failed");
            session.send(ServerMessage::text(reply::AUTH_REJECTED, LOAD_FAILED))?;
            return Ok(Effect::Done);
        }
    };

    admit(ctx, session, character)?;
    Ok(Effect::Done)
}

/// Sleeps off the backoff for this failure, then rejects. Locks the
/// session once the failure threshold is reached.
async fn reject(
    ctx: &ZoneContext,
    session: &Session,
    reason: &'static str,
) -> Result<Effect, ZoneError> {
    let failures = {
        let mut state = session.lock();
        state.auth_failures += 1;
        state.auth_failures
    };
    tokio::time::sleep(ctx.config.limits.auth_backoff_step() * failures).await;
    session.send(ServerMessage::text(reply::AUTH_REJECTED, reason))?;

    if failures >= ctx.config.limits.max_auth_failures() {
        warn!(session = %session.id(), peer = %session.peer(), failures, "too many auth failures, closing");
        session.send(ServerMessage::text(reply::AUTH_LOCKED, TOO_MANY_AUTH_FAILURES))?;
        return Ok(Effect::Close);
    }
    Ok(Effect::Done)
}

/// Swaps the guest for the character and announces it.
///
/// If the name is already online, the live character moves over from the
/// older session along with its world and position, and `loaded` is
/// discarded. The older session drops back to unauthenticated.
fn admit(ctx: &ZoneContext, session: &Session, loaded: Character) -> Result<(), ZoneError> {
    let name = loaded.name.clone();
    let live = ctx
        .registry
        .rebind(session.id(), &name)
        .and_then(|displaced| ctx.registry.get(displaced))
        .and_then(|old| take_over(ctx, &old, &name));

    let (c, world, spawn) = match live {
        Some(live) => live,
        None => {
            let mut c = loaded;
            let world = match ctx.worlds.check_entry(&c, c.world_id) {
                Ok(def) => def.id,
                Err(reason) => {
                    debug!(character = %c.name, world = %c.world_id, reason = reason.code(), "saved world not enterable, using world 1");
                    WorldId::KNOWN
                }
            };
            c.world_id = world;
            (c, world, catalog::spawn_point(world))
        }
    };
    let class = c.class;
    let guild = c.guild.clone();

    {
        let mut state = session.lock();
        state.character = c;
        state.world = world;
        state.position = spawn;
        state.authenticated = true;
        state.auth_failures = 0;
    }
    ctx.limiter.reset(session.peer().ip());
    if let Some(guild) = &guild {
        ctx.guilds.register_member(guild, &name);
    }
    info!(session = %session.id(), peer = %session.peer(), character = %name, world = %world, "player authenticated");

    session.send(ServerMessage::new(
        reply::AUTH_OK,
        AuthOk {
            name: &name,
            class,
            world: world_name(world),
        },
    ))?;
    session.send(
        EnterOk {
            character: &name,
            world: world_name(world),
            spawn,
        }
        .message(),
    )?;
    ctx.visibility.refresh(session, &ctx.registry.snapshot());
    session.send(state_message(ctx, session))?;
    Ok(())
}

/// Takes the live character away from `old`, which lost `name` to a newer
/// login. `old` can no longer mutate or persist it.
fn take_over(
    ctx: &ZoneContext,
    old: &Session,
    name: &str,
) -> Option<(Character, WorldId, Position)> {
    let live = {
        let mut state = old.lock();
        if !state.authenticated {
            return None;
        }
        state.authenticated = false;
        let guest = Character::new(format!("Guest_{}", old.id().0), Class::default());
        (
            std::mem::replace(&mut state.character, guest),
            state.world,
            state.position,
        )
    };
    ctx.visibility.remove(old, name, &ctx.registry.snapshot());
    let _ = old.send(ServerMessage::text(reply::AUTH_REQUIRED, SESSION_REPLACED));
    info!(character = %name, displaced = %old.id(), "live character taken over by newer login");
    Some(live)
}

#[cfg(test)]
mod tests {
    use a3zone_session::Claims;

    use super::*;
    use crate::context::testing::{self, drain, find};

    fn token(ctx: &ZoneContext, name: &str) -> String {
        let now = chrono::Utc::now().timestamp();
        ctx.verifier.sign(&Claims::new(name, now, 3600)).unwrap()
    }

    fn args(token: &str) -> AuthTokenArgs {
        AuthTokenArgs {
            token: token.to_string(),
            class: Some("mage".to_string()),
        }
    }

    // =====================================================================
    // Success
    // =====================================================================

    #[tokio::test]
    async fn test_authenticate_valid_token_sends_ok_enter_and_state() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::guest(&ctx, 1);

        let effect = authenticate(&ctx, &session, args(&token(&ctx, "Ayla"))).await.unwrap();

        assert_eq!(effect, Effect::Done);
        let msgs = drain(&mut rx);
        let commands: Vec<&str> = msgs.iter().map(|m| m.command.as_str()).collect();
        assert_eq!(commands, [reply::AUTH_OK, reply::ENTER_OK, reply::STATE]);
        assert_eq!(msgs[0].payload["name"], "Ayla");
        assert_eq!(msgs[0].payload["class"], "Mage");
        assert!(session.is_authenticated());
        assert_eq!(ctx.registry.find("Ayla").map(|s| s.id()), Some(session.id()));
    }

    #[tokio::test]
    async fn test_authenticate_unenterable_saved_world_falls_back_to_world_one() {
        let (ctx, _dir) = testing::context();
        let mut saved = Character::new("Ayla", Class::Mage);
        saved.world_id = WorldId::MYTHICAL;
        ctx.store.save(&saved).unwrap();
        let (session, mut rx) = testing::guest(&ctx, 1);

        authenticate(&ctx, &session, args(&token(&ctx, "Ayla"))).await.unwrap();

        let state = session.lock();
        assert_eq!(state.world, WorldId::KNOWN);
        assert_eq!(state.character.world_id, WorldId::KNOWN);
        assert_eq!(state.position, catalog::spawn_point(WorldId::KNOWN));
        drop(state);
        let enter = find(&drain(&mut rx), reply::ENTER_OK).unwrap();
        assert_eq!(enter.payload["world"], world_name(WorldId::KNOWN));
    }

    #[tokio::test]
    async fn test_authenticate_nearby_player_sees_join() {
        let (ctx, _dir) = testing::context();
        let spawn = catalog::spawn_point(WorldId::KNOWN);
        let (_other, mut other_rx) = testing::player(&ctx, 2, "Bram", spawn);
        let (session, mut rx) = testing::guest(&ctx, 1);

        authenticate(&ctx, &session, args(&token(&ctx, "Ayla"))).await.unwrap();

        let joined = find(&drain(&mut other_rx), reply::PLAYER_JOINED).unwrap();
        assert_eq!(joined.payload["name"], "Ayla");
        assert!(find(&drain(&mut rx), reply::PLAYER_JOINED).is_some());
    }

    #[tokio::test]
    async fn test_authenticate_twice_is_rejected_without_failure() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", Position::default());

        authenticate(&ctx, &session, args("whatever")).await.unwrap();

        let msgs = drain(&mut rx);
        assert_eq!(msgs[0], ServerMessage::text(reply::AUTH_REJECTED, ALREADY_AUTHENTICATED));
        assert_eq!(session.lock().auth_failures, 0);
    }

    #[tokio::test]
    async fn test_authenticate_same_name_takes_over_live_character() {
        let (ctx, _dir) = testing::context();
        let (old, mut old_rx) = testing::guest(&ctx, 1);
        authenticate(&ctx, &old, args(&token(&ctx, "Ayla"))).await.unwrap();
        {
            let mut state = old.lock();
            state.character.xp = 500;
            state.position = Position::new(103.0, 0.0, 104.0);
        }
        drain(&mut old_rx);
        let (newer, mut rx) = testing::guest(&ctx, 2);

        authenticate(&ctx, &newer, args(&token(&ctx, "Ayla"))).await.unwrap();

        assert!(!old.is_authenticated());
        assert!(newer.is_authenticated());
        assert_eq!(old.name(), "Guest_1");
        {
            let state = newer.lock();
            assert_eq!(state.character.xp, 500);
            assert_eq!(state.position, Position::new(103.0, 0.0, 104.0));
        }
        assert_eq!(ctx.registry.find("Ayla").map(|s| s.id()), Some(newer.id()));
        assert_eq!(
            drain(&mut old_rx),
            [ServerMessage::text(reply::AUTH_REQUIRED, SESSION_REPLACED)]
        );
        let commands: Vec<String> = drain(&mut rx).into_iter().map(|m| m.command).collect();
        assert_eq!(commands, [reply::AUTH_OK, reply::ENTER_OK, reply::STATE]);
    }

    // =====================================================================
    // Failures
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_empty_token_rejected_token_required() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::guest(&ctx, 1);

        let effect = authenticate(&ctx, &session, args("  ")).await.unwrap();

        assert_eq!(effect, Effect::Done);
        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::AUTH_REJECTED, TOKEN_REQUIRED)]);
        assert_eq!(session.lock().auth_failures, 1);
        assert!(!session.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_bad_token_backs_off_before_reply() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::guest(&ctx, 1);
        session.lock().auth_failures = 1;
        let start = tokio::time::Instant::now();

        authenticate(&ctx, &session, args("not.a-token")).await.unwrap();

        assert_eq!(start.elapsed(), ctx.config.limits.auth_backoff_step() * 2);
        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::AUTH_REJECTED, TOKEN_INVALID)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_third_failure_locks_and_closes() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::guest(&ctx, 1);

        for _ in 0..2 {
            let effect = authenticate(&ctx, &session, args("bogus")).await.unwrap();
            assert_eq!(effect, Effect::Done);
        }
        let effect = authenticate(&ctx, &session, args("bogus")).await.unwrap();

        assert_eq!(effect, Effect::Close);
        let msgs = drain(&mut rx);
        assert_eq!(
            msgs.last(),
            Some(&ServerMessage::text(reply::AUTH_LOCKED, TOO_MANY_AUTH_FAILURES))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_peer_over_limit_gets_locked() {
        let (ctx, _dir) = testing::context();
        let max = ctx.config.limits.auth_attempts_per_window as u64;

        // Every guest shares 127.0.0.1, so attempts add up per address.
        for id in 1..=max {
            let (session, _rx) = testing::guest(&ctx, id);
            let effect = authenticate(&ctx, &session, args("bogus")).await.unwrap();
            assert_eq!(effect, Effect::Done);
        }
        let (session, mut rx) = testing::guest(&ctx, max + 1);
        let effect = authenticate(&ctx, &session, args("bogus")).await.unwrap();

        assert_eq!(effect, Effect::Close);
        let locked = find(&drain(&mut rx), reply::AUTH_LOCKED).unwrap();
        assert_eq!(locked.payload["reason"], "TOO_MANY_ATTEMPTS");
        assert!(locked.payload["retry_after_sec"].as_u64().unwrap() > 0);
    }
}
