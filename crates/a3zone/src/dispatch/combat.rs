//! Training fights, mob combat, PvP and corpse recovery.
//!
//! The public handlers draw from the thread RNG; the `_with` variants take
//! any [`Roller`] so outcomes can be scripted.

use std::sync::Arc;
use std::time::Duration;

use a3zone_protocol::{AttackArgs, AttackMobArgs, AttackPvpArgs, Position, ServerMessage, reply};
use a3zone_rules::loot::{self, LootDrop};
use a3zone_rules::pvp::{self, PvpPenalty};
use a3zone_rules::{Item, Roller, combat, progression, skills};
use a3zone_session::{Session, VISIBILITY_RADIUS, is_visible};
use serde::Serialize;

use super::Effect;
use crate::ZoneError;
use crate::context::ZoneContext;

const TARGET_REQUIRED: &str = "TARGET_REQUIRED";
const TARGET_OFFLINE: &str = "TARGET_OFFLINE";
const INVALID_TARGET: &str = "INVALID_TARGET";
const TARGET_OTHER_WORLD: &str = "TARGET_OTHER_WORLD";
const TARGET_OUT_OF_RANGE: &str = "TARGET_OUT_OF_RANGE";

// ---------------------------------------------------------------------------
// Reply bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct TrainingResult<'a> {
    target: &'a str,
    damage: u32,
    xp_gain: u64,
    leveled_up: bool,
    legendary: Option<Item>,
}

#[derive(Debug, Serialize)]
struct TrainingDeath<'a> {
    target: &'a str,
    xp_debt: u64,
    corpse: Option<Position>,
    recovery: &'static str,
}

#[derive(Debug, Serialize)]
struct MobAttackResult<'a> {
    mob_id: &'a str,
    mob: &'a str,
    mob_hp: i32,
    damage: u32,
    skill_id: Option<&'a str>,
    defeated: bool,
    xp_gain: u64,
    leveled_up: bool,
    drops: Vec<LootDrop>,
    legendary: Option<Item>,
    party_nearby: usize,
}

#[derive(Debug, Serialize)]
struct MobAttackDeath<'a> {
    mob: &'a str,
    status: &'static str,
    xp_debt: u64,
    corpse: Option<Position>,
    skill_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct XpShare<'a> {
    from: &'a str,
    mob: &'a str,
    xp: u64,
    leveled_up: bool,
}

#[derive(Debug, Serialize)]
struct AttackerState {
    xp_debt: u64,
    pk_score: u32,
    honor: i64,
}

#[derive(Debug, Serialize)]
struct TargetState {
    hp: i32,
    xp_debt: u64,
}

#[derive(Debug, Serialize)]
struct PvpResult<'a> {
    target: &'a str,
    target_level: u32,
    damage: u32,
    skill_id: Option<&'a str>,
    attacker_died: bool,
    target_died: bool,
    penalty: PvpPenalty,
    attacker_state: AttackerState,
    target_state: TargetState,
}

#[derive(Debug, Serialize)]
struct PvpHit<'a> {
    from: &'a str,
    damage: u32,
    target_hp: i32,
    target_debt: u64,
}

#[derive(Debug, Serialize)]
struct CorpseRecovered {
    status: &'static str,
    xp_debt: u64,
}

fn skill_arg(skill_id: Option<&str>) -> Option<&str> {
    skill_id.map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// ATTACK (training)
// ---------------------------------------------------------------------------

pub(super) fn train(session: &Session, args: AttackArgs) -> Result<Effect, ZoneError> {
    train_with(session, args, &mut rand::rng())
}

/// Fights an abstract target of the requested level. A missing or zero
/// level means an even fight.
fn train_with(
    session: &Session,
    args: AttackArgs,
    roller: &mut impl Roller,
) -> Result<Effect, ZoneError> {
    let target = args.target.unwrap_or_default();

    let msg = {
        let mut guard = session.lock();
        let state = &mut *guard;
        let c = &mut state.character;
        let level = args.target_level.filter(|l| *l > 0).unwrap_or(c.level);
        let outcome = combat::attack(c, level, roller);

        if outcome.died {
            combat::apply_death_penalty(c, state.position);
            tracing::info!(character = %c.name, target_level = level, "died in training");
            ServerMessage::new(
                reply::PLAYER_DIED,
                TrainingDeath {
                    target: &target,
                    xp_debt: c.xp_debt,
                    corpse: c.corpse,
                    recovery: "Use RECOVER_CORPSE",
                },
            )
        } else {
            let xp_gain = progression::training_xp(level);
            let gain = progression::gain_xp(c, xp_gain);
            let legendary = combat::roll_legendary(c, roller);
            ServerMessage::new(
                reply::COMBAT_RESULT,
                TrainingResult {
                    target: &target,
                    damage: outcome.damage,
                    xp_gain,
                    leveled_up: gain.leveled_up(),
                    legendary,
                },
            )
        }
    };

    session.send(msg)?;
    Ok(Effect::Changed)
}

// ---------------------------------------------------------------------------
// ATTACK_MOB
// ---------------------------------------------------------------------------

pub(super) fn attack_mob(
    ctx: &ZoneContext,
    session: &Session,
    args: AttackMobArgs,
) -> Result<Effect, ZoneError> {
    attack_mob_with(ctx, session, args, &mut rand::rng())
}

/// Party members online in the same world and within sight of `session`.
fn nearby_party(ctx: &ZoneContext, session: &Session) -> Vec<Arc<Session>> {
    let Some(me) = session.presence() else {
        return Vec::new();
    };
    ctx.parties
        .members_of(&me.name)
        .iter()
        .filter_map(|name| ctx.registry.find(name))
        .filter(|member| member.id() != session.id())
        .filter(|member| {
            member
                .presence()
                .is_some_and(|p| p.world == me.world && is_visible(&me.position, &p.position))
        })
        .collect()
}

fn attack_mob_with(
    ctx: &ZoneContext,
    session: &Session,
    args: AttackMobArgs,
    roller: &mut impl Roller,
) -> Result<Effect, ZoneError> {
    let mob_id = args.mob_id.trim();
    let skill_id = skill_arg(args.skill_id.as_deref());
    let nearby = nearby_party(ctx, session);

    let mut guard = session.lock();
    let state = &mut *guard;
    let (world, pos) = (state.world, state.position);
    let mut died = false;

    let hit = ctx.mobs.attack(world, mob_id, &pos, VISIBILITY_RADIUS, |mob| {
        let outcome = combat::attack(&state.character, mob.level, roller);
        if outcome.died {
            died = true;
            return 0;
        }
        outcome.damage + skills::skill_bonus(&state.character, skill_id)
    });
    let hit = match hit {
        Ok(hit) => hit,
        Err(reason) => {
            drop(guard);
            session.send(ServerMessage::text(reply::MOB_ATTACK_REJECTED, reason.code()))?;
            return Ok(Effect::Done);
        }
    };

    let c = &mut state.character;
    if died {
        combat::apply_death_penalty(c, pos);
        tracing::info!(character = %c.name, mob = %hit.mob.id, "killed by mob");
        let msg = ServerMessage::new(
            reply::MOB_ATTACK_RESULT,
            MobAttackDeath {
                mob: &hit.mob.name,
                status: "PLAYER_DIED",
                xp_debt: c.xp_debt,
                corpse: c.corpse,
                skill_id,
            },
        );
        drop(guard);
        session.send(msg)?;
        return Ok(Effect::Changed);
    }

    let mut result = MobAttackResult {
        mob_id: &hit.mob.id,
        mob: &hit.mob.name,
        mob_hp: hit.mob.hp,
        damage: hit.damage,
        skill_id,
        defeated: hit.defeated,
        xp_gain: 0,
        leveled_up: false,
        drops: Vec::new(),
        legendary: None,
        party_nearby: nearby.len(),
    };
    let kill_xp = progression::mob_kill_xp(hit.mob.level);

    if hit.defeated {
        result.xp_gain = progression::with_party_bonus(kill_xp, nearby.len());
        result.leveled_up = progression::gain_xp(c, result.xp_gain).leveled_up();
        let bonus_qty = u32::from(!nearby.is_empty());
        result.drops = loot::roll_loot(c, &hit.mob.id, bonus_qty, roller);
        result.legendary = combat::roll_legendary(c, roller);
        if let Some(item) = &result.legendary {
            result.drops.push(LootDrop::gear(item.clone()));
        }
        tracing::info!(
            character = %c.name,
            mob = %hit.mob.id,
            xp = result.xp_gain,
            party_nearby = nearby.len(),
            "mob defeated"
        );
    }

    let killer = c.name.clone();
    let msg = ServerMessage::new(reply::MOB_ATTACK_RESULT, &result);
    drop(guard);
    session.send(msg)?;

    if hit.defeated {
        ctx.mobs
            .schedule_respawn(hit.mob.id.clone(), Duration::from_secs(hit.mob.respawn_sec));
        share_party_xp(ctx, &nearby, &killer, &hit.mob.name, kill_xp);
    }
    Ok(Effect::changed_if(hit.defeated))
}

fn share_party_xp(ctx: &ZoneContext, nearby: &[Arc<Session>], killer: &str, mob: &str, kill_xp: u64) {
    let xp = progression::party_share(kill_xp);
    if xp == 0 {
        return;
    }
    for member in nearby {
        let leveled_up = {
            let mut state = member.lock();
            if !state.authenticated {
                continue;
            }
            progression::gain_xp(&mut state.character, xp).leveled_up()
        };
        let share = XpShare {
            from: killer,
            mob,
            xp,
            leveled_up,
        };
        if member.send(ServerMessage::new(reply::PARTY_XP_SHARE, share)).is_err() {
            tracing::debug!(session = %member.id(), "party member gone before xp share");
        }
        ctx.persist_detached(member);
    }
}

// ---------------------------------------------------------------------------
// ATTACK_PVP
// ---------------------------------------------------------------------------

pub(super) fn attack_player(
    ctx: &ZoneContext,
    session: &Session,
    args: AttackPvpArgs,
) -> Result<Effect, ZoneError> {
    attack_player_with(ctx, session, args, &mut rand::rng())
}

fn pvp_rejected(session: &Session, code: &str) -> Result<Effect, ZoneError> {
    session.send(ServerMessage::text(reply::PVP_REJECTED, code))?;
    Ok(Effect::Done)
}

/// Attacker and victim are locked one after the other, never together.
/// The victim's level is read before the strike, so a level-up landing in
/// between is not seen by this exchange.
fn attack_player_with(
    ctx: &ZoneContext,
    session: &Session,
    args: AttackPvpArgs,
    roller: &mut impl Roller,
) -> Result<Effect, ZoneError> {
    let target = args.target.trim();
    if target.is_empty() {
        return pvp_rejected(session, TARGET_REQUIRED);
    }
    let Some((victim, them)) = ctx
        .registry
        .find(target)
        .and_then(|v| v.presence().map(|p| (v, p)))
    else {
        return pvp_rejected(session, TARGET_OFFLINE);
    };
    if victim.id() == session.id() {
        return pvp_rejected(session, INVALID_TARGET);
    }
    let (world, pos) = {
        let state = session.lock();
        (state.world, state.position)
    };
    if them.world != world {
        return pvp_rejected(session, TARGET_OTHER_WORLD);
    }
    if !is_visible(&pos, &them.position) {
        return pvp_rejected(session, TARGET_OUT_OF_RANGE);
    }

    let skill_id = skill_arg(args.skill_id.as_deref());
    let victim_level = victim.lock().character.level;

    let (strike, attacker_state, attacker) = {
        let mut guard = session.lock();
        let state = &mut *guard;
        let c = &mut state.character;
        let strike = pvp::strike(c, state.position, victim_level, skill_id, roller);
        let snapshot = AttackerState {
            xp_debt: c.xp_debt,
            pk_score: c.pk_score,
            honor: c.honor,
        };
        (strike, snapshot, c.name.clone())
    };

    let (target_died, target_state) = {
        let mut guard = victim.lock();
        let state = &mut *guard;
        let died = pvp::take_hit(&mut state.character, strike.damage, state.position);
        let snapshot = TargetState {
            hp: state.character.hp,
            xp_debt: state.character.xp_debt,
        };
        (died, snapshot)
    };

    tracing::info!(
        attacker = %attacker,
        target = %them.name,
        damage = strike.damage,
        attacker_died = strike.attacker_died,
        target_died,
        "pvp exchange"
    );

    let hit = PvpHit {
        from: &attacker,
        damage: strike.damage,
        target_hp: target_state.hp,
        target_debt: target_state.xp_debt,
    };
    if victim.send(ServerMessage::new(reply::PVP_HIT, hit)).is_err() {
        tracing::debug!(session = %victim.id(), "pvp target gone before hit notice");
    }
    session.send(ServerMessage::new(
        reply::PVP_RESULT,
        PvpResult {
            target: &them.name,
            target_level: victim_level,
            damage: strike.damage,
            skill_id,
            attacker_died: strike.attacker_died,
            target_died,
            penalty: strike.penalty,
            attacker_state,
            target_state,
        },
    ))?;
    ctx.persist_detached(&victim);
    Ok(Effect::Changed)
}

// ---------------------------------------------------------------------------
// RECOVER_CORPSE
// ---------------------------------------------------------------------------

pub(super) fn recover_corpse(session: &Session) -> Result<Effect, ZoneError> {
    let recovered = combat::recover_corpse(&mut session.lock().character);
    match recovered {
        Ok(xp_debt) => {
            session.send(ServerMessage::new(
                reply::CORPSE_RECOVERY,
                CorpseRecovered {
                    status: "OK",
                    xp_debt,
                },
            ))?;
            Ok(Effect::Changed)
        }
        Err(reason) => {
            session.send(ServerMessage::text(reply::CORPSE_RECOVERY, reason.code()))?;
            Ok(Effect::Done)
        }
    }
}
