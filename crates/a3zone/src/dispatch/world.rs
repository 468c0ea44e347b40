//! Movement, world entry and what's around a player.

use a3zone_protocol::{Position, ServerMessage, WorldId, reply};
use a3zone_rules::catalog::{self, NpcDef};
use a3zone_session::{Session, VISIBILITY_RADIUS, is_visible};
use a3zone_world::Mob;
use serde::Serialize;

use super::Effect;
use crate::ZoneError;
use crate::context::ZoneContext;
use crate::payload::{EnterOk, world_name};

const INVALID_MOVE: &str = "INVALID_MOVE";

#[derive(Debug, Serialize)]
struct Entities {
    world: &'static str,
    npcs: Vec<&'static NpcDef>,
    mobs: Vec<Mob>,
}

/// Moves the player if the step is within the configured limit, then
/// refreshes who can see whom.
pub(super) fn move_to(ctx: &ZoneContext, session: &Session, to: Position) -> Result<Effect, ZoneError> {
    let max = ctx.config.limits.max_move_distance;
    let moved = {
        let mut state = session.lock();
        // NaN distances fail the comparison and are rejected too.
        let step = state.position.distance(&to);
        if step <= max {
            state.position = to;
            true
        } else {
            false
        }
    };

    if !moved {
        session.send(ServerMessage::text(reply::MOVE_REJECTED, INVALID_MOVE))?;
        return Ok(Effect::Done);
    }
    session.send(ServerMessage::new(reply::MOVE_OK, to))?;
    ctx.visibility.refresh(session, &ctx.registry.snapshot());
    Ok(Effect::Done)
}

pub(super) fn enter_world(ctx: &ZoneContext, session: &Session, id: WorldId) -> Result<Effect, ZoneError> {
    let entered = {
        let mut guard = session.lock();
        let state = &mut *guard;
        ctx.worlds.check_entry(&state.character, id).map(|def| {
            state.character.world_id = def.id;
            state.world = def.id;
            state.position = def.spawn;
            (state.character.name.clone(), def)
        })
    };

    match entered {
        Ok((name, def)) => {
            tracing::info!(character = %name, world = %def.id, "entered world");
            session.send(
                EnterOk {
                    character: &name,
                    world: def.name,
                    spawn: def.spawn,
                }
                .message(),
            )?;
            ctx.visibility.refresh(session, &ctx.registry.snapshot());
            Ok(Effect::Changed)
        }
        Err(reason) => {
            session.send(ServerMessage::text(reply::ENTER_DENIED, reason.code()))?;
            Ok(Effect::Done)
        }
    }
}

pub(super) fn history(ctx: &ZoneContext, session: &Session) -> Result<Effect, ZoneError> {
    session.send(ServerMessage::new(reply::HISTORY, ctx.worlds.history()))?;
    Ok(Effect::Done)
}

/// NPCs and living mobs within sight.
pub(super) fn list_entities(ctx: &ZoneContext, session: &Session) -> Result<Effect, ZoneError> {
    let (world, pos) = {
        let state = session.lock();
        (state.world, state.position)
    };
    let npcs = catalog::NPCS
        .iter()
        .filter(|n| n.world_id == world && is_visible(&pos, &n.position))
        .collect();
    let mobs = ctx.mobs.visible_from(world, &pos, VISIBILITY_RADIUS);

    session.send(ServerMessage::new(
        reply::ENTITIES,
        Entities {
            world: world_name(world),
            npcs,
            mobs,
        },
    ))?;
    Ok(Effect::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::{self, drain, find};

    fn spawn() -> Position {
        catalog::spawn_point(WorldId::KNOWN)
    }

    // =====================================================================
    // move_to
    // =====================================================================

    #[test]
    fn test_move_to_short_step_accepted() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let to = Position::new(105.0, 0.0, 105.0);

        let effect = move_to(&ctx, &session, to).unwrap();

        assert_eq!(effect, Effect::Done);
        assert_eq!(session.lock().position, to);
        assert_eq!(drain(&mut rx), [ServerMessage::new(reply::MOVE_OK, to)]);
    }

    #[test]
    fn test_move_to_long_step_rejected_position_kept() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        move_to(&ctx, &session, Position::new(150.0, 0.0, 100.0)).unwrap();

        assert_eq!(session.lock().position, spawn());
        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::MOVE_REJECTED, INVALID_MOVE)]);
    }

    #[test]
    fn test_move_to_nan_rejected() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        move_to(&ctx, &session, Position::new(f64::NAN, 0.0, 100.0)).unwrap();

        assert_eq!(session.lock().position, spawn());
        assert!(find(&drain(&mut rx), reply::MOVE_REJECTED).is_some());
    }

    #[test]
    fn test_move_to_peer_sees_move_then_leave() {
        let (ctx, _dir) = testing::context();
        let (mover, _rx) = testing::player(&ctx, 1, "Ayla", Position::new(140.0, 0.0, 100.0));
        let (_peer, mut peer_rx) = testing::player(&ctx, 2, "Bram", Position::new(100.0, 0.0, 100.0));

        move_to(&ctx, &mover, Position::new(145.0, 0.0, 100.0)).unwrap();
        let first = drain(&mut peer_rx);
        assert_eq!(first[0].command, reply::PLAYER_JOINED);

        move_to(&ctx, &mover, Position::new(148.0, 0.0, 100.0)).unwrap();
        assert_eq!(drain(&mut peer_rx)[0].command, reply::PLAYER_MOVED);

        move_to(&ctx, &mover, Position::new(155.0, 0.0, 100.0)).unwrap();
        assert_eq!(
            drain(&mut peer_rx),
            [ServerMessage::text(reply::PLAYER_LEFT, "Ayla")]
        );
    }

    // =====================================================================
    // enter_world
    // =====================================================================

    #[test]
    fn test_enter_world_locked_world_denied() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        let effect = enter_world(&ctx, &session, WorldId::SHATTERED).unwrap();

        assert_eq!(effect, Effect::Done);
        assert_eq!(session.lock().world, WorldId::KNOWN);
        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::ENTER_DENIED, "WORLD_LOCKED")]);
    }

    #[test]
    fn test_enter_world_unknown_world_denied() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        enter_world(&ctx, &session, WorldId(42)).unwrap();

        assert_eq!(drain(&mut rx), [ServerMessage::text(reply::ENTER_DENIED, "WORLD_NOT_FOUND")]);
    }

    #[test]
    fn test_enter_world_unlocked_moves_to_spawn() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());
        ctx.worlds.unlock(WorldId::SHATTERED, "someone");
        session.lock().character.level = 60;

        let effect = enter_world(&ctx, &session, WorldId::SHATTERED).unwrap();

        assert_eq!(effect, Effect::Changed);
        let state = session.lock();
        assert_eq!(state.world, WorldId::SHATTERED);
        assert_eq!(state.character.world_id, WorldId::SHATTERED);
        assert_eq!(state.position, catalog::spawn_point(WorldId::SHATTERED));
        drop(state);
        let enter = find(&drain(&mut rx), reply::ENTER_OK).unwrap();
        assert_eq!(enter.payload["world"], world_name(WorldId::SHATTERED));
    }

    #[test]
    fn test_enter_world_leaving_peer_gets_player_left() {
        let (ctx, _dir) = testing::context();
        let (session, _rx) = testing::player(&ctx, 1, "Ayla", spawn());
        let (_peer, mut peer_rx) = testing::player(&ctx, 2, "Bram", spawn());
        ctx.visibility.refresh(&session, &ctx.registry.snapshot());
        drain(&mut peer_rx);
        ctx.worlds.unlock(WorldId::SHATTERED, "someone");
        session.lock().character.level = 60;

        enter_world(&ctx, &session, WorldId::SHATTERED).unwrap();

        assert_eq!(drain(&mut peer_rx), [ServerMessage::text(reply::PLAYER_LEFT, "Ayla")]);
    }

    // =====================================================================
    // list_entities / history
    // =====================================================================

    #[test]
    fn test_list_entities_at_spawn_sees_local_npcs_and_mobs() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());

        list_entities(&ctx, &session).unwrap();

        let msg = find(&drain(&mut rx), reply::ENTITIES).unwrap();
        let npcs = msg.payload["npcs"].as_array().unwrap();
        let mobs = msg.payload["mobs"].as_array().unwrap();
        assert!(npcs.iter().any(|n| n["name"] == "Elder Rowan"));
        assert!(npcs.iter().all(|n| n["name"] != "Shattered Keeper"));
        assert!(mobs.iter().any(|m| m["id"] == "mob_wolf_01"));
    }

    #[test]
    fn test_list_entities_skips_defeated_mobs() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());
        ctx.mobs
            .attack(WorldId::KNOWN, "mob_wolf_01", &spawn(), VISIBILITY_RADIUS, |_| 10_000)
            .unwrap();

        list_entities(&ctx, &session).unwrap();

        let msg = find(&drain(&mut rx), reply::ENTITIES).unwrap();
        let mobs = msg.payload["mobs"].as_array().unwrap();
        assert!(mobs.iter().all(|m| m["id"] != "mob_wolf_01"));
    }

    #[test]
    fn test_history_reports_first_unlock() {
        let (ctx, _dir) = testing::context();
        let (session, mut rx) = testing::player(&ctx, 1, "Ayla", spawn());
        ctx.worlds.unlock(WorldId::SHATTERED, "Ayla");

        history(&ctx, &session).unwrap();

        let msg = find(&drain(&mut rx), reply::HISTORY).unwrap();
        assert_eq!(msg.payload["world_2_first_unlock"], "Ayla");
        assert!(msg.payload["world_3_first_unlock"].is_null());
    }
}
