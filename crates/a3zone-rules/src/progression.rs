//! Experience, levels and health.

use serde::Serialize;

use crate::character::Character;

/// Health gained per level.
pub const HP_PER_LEVEL: i32 = 12;

/// Maximum health at `level`. Monotonic in level.
pub fn max_hp_for_level(level: u32) -> i32 {
    let level = i32::try_from(level).unwrap_or(i32::MAX / HP_PER_LEVEL);
    60i32.saturating_add(level.saturating_mul(HP_PER_LEVEL))
}

/// Experience needed to go from `level` to `level + 1`.
pub fn xp_to_next(level: u32) -> u64 {
    100 + 15 * u64::from(level)
}

/// XP for surviving a training attack against `target_level`.
pub fn training_xp(target_level: u32) -> u64 {
    25 + 3 * u64::from(target_level)
}

/// XP for defeating a mob of `mob_level`.
pub fn mob_kill_xp(mob_level: u32) -> u64 {
    35 + 4 * u64::from(mob_level)
}

/// Kill XP bonus percent for party members standing nearby.
pub fn party_bonus_pct(nearby: usize) -> u64 {
    (10 * nearby as u64).min(30)
}

/// Kill XP with the party bonus applied.
pub fn with_party_bonus(kill_xp: u64, nearby: usize) -> u64 {
    kill_xp + kill_xp * party_bonus_pct(nearby) / 100
}

/// What each nearby party member receives when someone else scores a kill.
pub fn party_share(kill_xp: u64) -> u64 {
    kill_xp / 2
}

/// Result of a [`gain_xp`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct XpGain {
    /// XP that went toward levels, after debt repayment.
    pub applied: u64,
    pub debt_paid: u64,
    pub levels_gained: u32,
}

impl XpGain {
    pub fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }
}

/// Grants experience, paying down debt first.
///
/// Half of every grant (up to the outstanding debt) goes to debt. Each
/// level-up refills health and awards a skill point.
pub fn gain_xp(c: &mut Character, amount: u64) -> XpGain {
    let mut gain = XpGain::default();
    if amount == 0 {
        return gain;
    }

    let mut amount = amount;
    if c.xp_debt > 0 {
        let pay = (amount / 2).min(c.xp_debt);
        c.xp_debt -= pay;
        amount -= pay;
        gain.debt_paid = pay;
    }

    c.xp += amount;
    gain.applied = amount;

    loop {
        let need = xp_to_next(c.level);
        if c.xp < need {
            break;
        }
        c.xp -= need;
        c.level += 1;
        c.max_hp = max_hp_for_level(c.level);
        c.hp = c.max_hp;
        c.skill_points += 1;
        gain.levels_gained += 1;
    }

    gain
}
