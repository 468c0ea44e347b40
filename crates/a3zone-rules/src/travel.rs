//! World entry requirements.

use a3zone_protocol::WorldId;

use crate::catalog::{self, WorldDef};
use crate::character::Character;
use crate::Rejection;

/// Checks whether `c` may enter `world_id`.
///
/// `globally_unlocked` is the live unlock flag for the world; a world is
/// open to a character if it is open to everyone or the character
/// unlocked it personally.
pub fn check_entry(
    c: &Character,
    world_id: WorldId,
    globally_unlocked: bool,
) -> Result<&'static WorldDef, Rejection> {
    let def = catalog::world(world_id).ok_or(Rejection::WorldNotFound)?;
    if !globally_unlocked && !c.unlocked_worlds.contains(&world_id) {
        return Err(Rejection::WorldLocked);
    }
    if c.level < def.min_level || c.level > def.max_level {
        return Err(Rejection::LevelNotInRange);
    }
    if def.requires_aura && c.aura_level == 0 {
        return Err(Rejection::AuraRequired);
    }
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Class;

    fn hero(level: u32) -> Character {
        let mut c = Character::new("Ayla", Class::Mage);
        c.level = level;
        c.normalize();
        c
    }

    #[test]
    fn test_check_entry_unknown_world() {
        assert_eq!(
            check_entry(&hero(45), WorldId(9), true).unwrap_err(),
            Rejection::WorldNotFound
        );
    }

    #[test]
    fn test_check_entry_locked_without_personal_unlock() {
        let c = hero(60);
        assert_eq!(
            check_entry(&c, WorldId::SHATTERED, false).unwrap_err(),
            Rejection::WorldLocked
        );
    }

    #[test]
    fn test_check_entry_personal_unlock_opens_world() {
        let mut c = hero(60);
        c.unlocked_worlds.insert(WorldId::SHATTERED);
        let def = check_entry(&c, WorldId::SHATTERED, false).unwrap();
        assert_eq!(def.name, "The Shattered World");
    }

    #[test]
    fn test_check_entry_level_out_of_range() {
        assert_eq!(
            check_entry(&hero(45), WorldId::SHATTERED, true).unwrap_err(),
            Rejection::LevelNotInRange
        );
        assert_eq!(
            check_entry(&hero(51), WorldId::KNOWN, true).unwrap_err(),
            Rejection::LevelNotInRange
        );
    }

    #[test]
    fn test_check_entry_mythical_needs_aura() {
        let mut c = hero(110);
        assert_eq!(
            check_entry(&c, WorldId::MYTHICAL, true).unwrap_err(),
            Rejection::AuraRequired
        );
        c.aura_level = 1;
        assert!(check_entry(&c, WorldId::MYTHICAL, true).is_ok());
    }
}
