//! Attack resolution, death and corpse recovery.

use a3zone_protocol::Position;
use serde::Serialize;

use crate::catalog::RelicKind;
use crate::character::{Character, Item, Rarity, Slot};
use crate::dice::Roller;
use crate::Rejection;

/// Level gap above which an attack can kill the attacker.
pub const SAFE_LEVEL_GAP: i64 = 4;

/// One in this many kills drops a legendary relic.
pub const LEGENDARY_ODDS: u32 = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttackOutcome {
    pub damage: u32,
    pub died: bool,
}

/// Percent damage bonus from companions.
pub fn companion_bonus_pct(c: &Character) -> u32 {
    let mut pct = 0;
    if c.pet.summoned {
        pct += 5;
    }
    if c.mercenary.recruited {
        pct += 8;
    }
    pct
}

/// Damage before the random roll and companion bonus.
pub fn base_attack(c: &Character) -> u32 {
    2 * c.level + 12 + c.gear_power()
}

/// Chance that attacking `gap` levels above yourself kills you.
pub fn death_chance(gap: i64) -> f64 {
    if gap <= SAFE_LEVEL_GAP {
        return 0.0;
    }
    (0.15 + 0.06 * (gap - SAFE_LEVEL_GAP) as f64).min(0.8)
}

/// Rolls an attack against a target of `target_level`.
///
/// Pure with respect to the character: the caller decides what a death
/// means for the current position.
pub fn attack(c: &Character, target_level: u32, roller: &mut impl Roller) -> AttackOutcome {
    let target_level = target_level.max(1);

    let mut damage = base_attack(c) + roller.below(8);
    damage += damage * companion_bonus_pct(c) / 100;

    let gap = i64::from(target_level) - i64::from(c.level);
    let chance = death_chance(gap);
    let died = chance > 0.0 && roller.chance() < chance;

    AttackOutcome { damage, died }
}

/// Leaves a corpse at `at`, adds XP debt and caps health at half.
pub fn apply_death_penalty(c: &mut Character, at: Position) {
    c.corpse = Some(at);
    c.xp_debt += 25 + 3 * u64::from(c.level);
    c.hp = c.hp.min(c.max_hp / 2);
}

/// Clears the corpse and halves outstanding debt.
pub fn recover_corpse(c: &mut Character) -> Result<u64, Rejection> {
    if c.corpse.take().is_none() {
        return Err(Rejection::NoCorpse);
    }
    c.xp_debt /= 2;
    Ok(c.xp_debt)
}

/// A Grace or Soul relic. `source` prefixes the item id.
pub fn relic(kind: RelicKind, source: &str) -> Item {
    Item {
        id: format!(
            "{source}_{}_{}",
            kind.as_str().to_ascii_lowercase(),
            uuid::Uuid::new_v4().simple()
        ),
        name: format!("{} Relic", kind.as_str()),
        grade: 10,
        rarity: Rarity::Unique,
        slot: Slot::Weapon,
        element: kind.element(),
        legendary: true,
    }
}

/// Rolls the rare relic drop and adds it to the inventory on a hit.
pub fn roll_legendary(c: &mut Character, roller: &mut impl Roller) -> Option<Item> {
    if roller.below(LEGENDARY_ODDS) != 0 {
        return None;
    }
    let kind = if roller.below(2) == 1 {
        RelicKind::Soul
    } else {
        RelicKind::Grace
    };
    let item = relic(kind, "legendary");
    tracing::info!(character = %c.name, item = %item.name, "legendary drop");
    c.inventory.push(item.clone());
    Some(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{Class, Element};
    use crate::dice::FixedRoller;

    fn fighter() -> Character {
        Character::new("Ayla", Class::Archer)
    }

    // =====================================================================
    // attack()
    // =====================================================================

    #[test]
    fn test_attack_base_damage_without_gear() {
        let c = fighter();
        let mut roll = FixedRoller::constant(0, 0.99);
        let out = attack(&c, c.level, &mut roll);
        assert_eq!(out.damage, 2 * 45 + 12);
        assert!(!out.died);
    }

    #[test]
    fn test_attack_adds_gear_roll_and_companions() {
        let mut c = fighter();
        c.equip("starter_bow").unwrap();
        c.summon_pet(None);
        c.recruit_mercenary(None);
        let mut roll = FixedRoller::constant(6, 0.99);
        let out = attack(&c, c.level, &mut roll);
        // (90 + 12 + 4 + 6) = 112, +13% = 126
        assert_eq!(out.damage, 126);
    }

    #[test]
    fn test_attack_small_gap_never_dies() {
        let c = fighter();
        let mut roll = FixedRoller::constant(0, 0.0);
        assert!(!attack(&c, c.level + 4, &mut roll).died);
    }

    #[test]
    fn test_attack_large_gap_dies_below_chance() {
        let c = fighter();
        let mut roll = FixedRoller::constant(0, 0.20);
        // gap 5 => 0.21
        assert!(attack(&c, c.level + 5, &mut roll).died);
        let mut roll = FixedRoller::constant(0, 0.22);
        assert!(!attack(&c, c.level + 5, &mut roll).died);
    }

    #[test]
    fn test_death_chance_caps() {
        assert_eq!(death_chance(4), 0.0);
        assert!((death_chance(6) - 0.27).abs() < 1e-9);
        assert_eq!(death_chance(100), 0.8);
    }

    // =====================================================================
    // death and recovery
    // =====================================================================

    #[test]
    fn test_death_penalty_then_recovery_halves_debt() {
        let mut c = fighter();
        let at = Position::new(110.0, 0.0, 104.0);
        apply_death_penalty(&mut c, at);

        assert_eq!(c.corpse, Some(at));
        assert_eq!(c.xp_debt, 25 + 3 * 45);
        assert_eq!(c.hp, c.max_hp / 2);

        let debt = c.xp_debt;
        assert_eq!(recover_corpse(&mut c), Ok(debt / 2));
        assert_eq!(c.corpse, None);
    }

    #[test]
    fn test_death_penalty_keeps_lower_hp() {
        let mut c = fighter();
        c.hp = 10;
        apply_death_penalty(&mut c, Position::default());
        assert_eq!(c.hp, 10);
    }

    #[test]
    fn test_recover_corpse_without_corpse_rejected() {
        let mut c = fighter();
        c.xp_debt = 80;
        let before = c.clone();
        assert_eq!(recover_corpse(&mut c), Err(Rejection::NoCorpse));
        assert_eq!(c, before);
    }

    // =====================================================================
    // roll_legendary()
    // =====================================================================

    #[test]
    fn test_roll_legendary_miss_adds_nothing() {
        let mut c = fighter();
        let mut roll = FixedRoller::constant(1, 0.0);
        let items = c.inventory.len();
        assert!(roll_legendary(&mut c, &mut roll).is_none());
        assert_eq!(c.inventory.len(), items);
    }

    #[test]
    fn test_roll_legendary_hit_adds_soul_relic() {
        let mut c = fighter();
        let mut roll = FixedRoller::constant(0, 0.0).with_ints([0, 1]);
        let item = roll_legendary(&mut c, &mut roll).unwrap();
        assert_eq!(item.name, "Soul Relic");
        assert_eq!(item.element, Element::Dark);
        assert!(item.legendary);
        assert!(c.inventory.contains(&item));
    }
}
