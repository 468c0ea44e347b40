//! Player-versus-player resolution.
//!
//! A PvP exchange touches two characters that live behind two different
//! session locks. It is split into an attacker half ([`strike`]) and a
//! victim half ([`take_hit`]) so the caller can lock one character at a
//! time. The two halves are not atomic as a pair.

use a3zone_protocol::Position;
use serde::Serialize;

use crate::character::Character;
use crate::combat::{apply_death_penalty, attack};
use crate::dice::Roller;
use crate::skills::skill_bonus;

/// Penalty applied to an attacker for picking on a lower-level player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PvpPenalty {
    pub level_diff: i64,
    pub xp_debt: u64,
    pub pk_gain: u32,
    pub honor_loss: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub honor_gain: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

/// Applies the level-gap penalty to `attacker`.
pub fn apply_pvp_penalty(attacker: &mut Character, victim_level: u32) -> PvpPenalty {
    let gap = i64::from(attacker.level) - i64::from(victim_level);
    let mut penalty = PvpPenalty {
        level_diff: gap,
        ..PvpPenalty::default()
    };

    let tier = match gap {
        g if g >= 10 => Some((80 + 5 * g, 3, 20)),
        g if g >= 5 => Some((35 + 4 * g, 2, 10)),
        g if g >= 2 => Some((20 + 2 * g, 1, 4)),
        _ => None,
    };

    match tier {
        Some((debt, pk, honor)) => {
            let debt = debt.unsigned_abs();
            attacker.xp_debt += debt;
            attacker.pk_score += pk;
            attacker.honor -= honor;
            penalty.xp_debt = debt;
            penalty.pk_gain = pk;
            penalty.honor_loss = honor;
        }
        None => {
            attacker.honor += 2;
            penalty.honor_gain = 2;
        }
    }
    penalty
}

/// The attacker's side of a PvP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub damage: u32,
    pub attacker_died: bool,
    pub penalty: PvpPenalty,
}

/// Rolls the attack, applies the gap penalty, and applies the attacker's
/// own death at `attacker_pos` if the roll says so.
pub fn strike(
    attacker: &mut Character,
    attacker_pos: Position,
    victim_level: u32,
    skill_id: Option<&str>,
    roller: &mut impl Roller,
) -> Strike {
    let outcome = attack(attacker, victim_level, roller);
    let damage = (outcome.damage + skill_bonus(attacker, skill_id)).max(1);
    let penalty = apply_pvp_penalty(attacker, victim_level);
    if outcome.died {
        apply_death_penalty(attacker, attacker_pos);
    }
    Strike {
        damage,
        attacker_died: outcome.died,
        penalty,
    }
}

/// The victim's side. Returns whether the hit was lethal.
///
/// A lethal hit applies the death penalty at `victim_pos` and leaves the
/// victim at half health (never below 1).
pub fn take_hit(victim: &mut Character, damage: u32, victim_pos: Position) -> bool {
    let damage = i32::try_from(damage.max(1)).unwrap_or(i32::MAX);
    victim.hp = victim.hp.saturating_sub(damage);
    if victim.hp > 0 {
        return false;
    }
    apply_death_penalty(victim, victim_pos);
    victim.hp = (victim.max_hp / 2).max(1);
    true
}
