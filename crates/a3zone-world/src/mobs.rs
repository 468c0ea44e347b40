//! Live creatures and their respawn timers.
//!
//! Mob health is shared by every player in a world, so the whole table
//! sits behind one mutex. An attack resolves entirely under that lock:
//! two players swinging at the same wolf can't both land the killing
//! blow.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use a3zone_protocol::{Position, WorldId};
use a3zone_rules::Roller;
use a3zone_rules::catalog::{self, MobSpawn};
use parking_lot::Mutex;
use serde::Serialize;

use crate::WorldError;

/// A creature as it currently stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mob {
    pub id: String,
    pub name: String,
    pub world_id: WorldId,
    pub level: u32,
    pub hp: i32,
    pub max_hp: i32,
    pub position: Position,
    pub respawn_sec: u64,
}

impl Mob {
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }
}

impl From<&MobSpawn> for Mob {
    fn from(s: &MobSpawn) -> Self {
        Self {
            id: s.id.to_string(),
            name: s.name.to_string(),
            world_id: s.world_id,
            level: s.level,
            hp: s.max_hp,
            max_hp: s.max_hp,
            position: s.position,
            respawn_sec: s.respawn_secs,
        }
    }
}

/// Outcome of one swing at a mob.
#[derive(Debug, Clone, PartialEq)]
pub struct MobHit {
    /// State of the mob after the hit.
    pub mob: Mob,
    pub damage: u32,
    /// `true` when this hit took the mob to zero.
    pub defeated: bool,
}

/// Every mob in every world, keyed by mob id.
#[derive(Debug)]
pub struct MobTable {
    mobs: Mutex<BTreeMap<String, Mob>>,
}

impl Default for MobTable {
    fn default() -> Self {
        Self::from_catalog()
    }
}

impl MobTable {
    /// One live mob per catalog spawn, at full health.
    pub fn from_catalog() -> Self {
        Self::with_mobs(catalog::MOB_SPAWNS.iter().map(Mob::from))
    }

    pub fn with_mobs(mobs: impl IntoIterator<Item = Mob>) -> Self {
        Self {
            mobs: Mutex::new(mobs.into_iter().map(|m| (m.id.clone(), m)).collect()),
        }
    }

    pub fn get(&self, mob_id: &str) -> Option<Mob> {
        self.mobs.lock().get(mob_id).cloned()
    }

    /// Living mobs in `world` within `radius` of `from`.
    pub fn visible_from(&self, world: WorldId, from: &Position, radius: f64) -> Vec<Mob> {
        self.mobs
            .lock()
            .values()
            .filter(|m| m.world_id == world && m.is_alive() && from.within(&m.position, radius))
            .cloned()
            .collect()
    }

    /// Attacks a mob.
    ///
    /// Checks existence in `world`, range and health, then calls
    /// `resolve` with the mob to get the damage dealt. `resolve` runs
    /// under the table lock, so it must not touch the table itself.
    pub fn attack(
        &self,
        world: WorldId,
        mob_id: &str,
        from: &Position,
        radius: f64,
        resolve: impl FnOnce(&Mob) -> u32,
    ) -> Result<MobHit, WorldError> {
        let mut mobs = self.mobs.lock();
        let mob = mobs
            .get_mut(mob_id)
            .filter(|m| m.world_id == world)
            .ok_or(WorldError::MobNotFound)?;
        if !from.within(&mob.position, radius) {
            return Err(WorldError::MobOutOfRange);
        }
        if !mob.is_alive() {
            return Err(WorldError::MobAlreadyDefeated);
        }

        let damage = resolve(mob);
        let dealt = i32::try_from(damage).unwrap_or(i32::MAX);
        mob.hp = mob.hp.saturating_sub(dealt).max(0);

        Ok(MobHit {
            mob: mob.clone(),
            damage,
            defeated: !mob.is_alive(),
        })
    }

    /// Restores a mob to full health and nudges it up to two units on
    /// x and z. Returns `false` if the mob no longer exists.
    pub fn respawn(&self, mob_id: &str, roller: &mut impl Roller) -> bool {
        let mut mobs = self.mobs.lock();
        let Some(mob) = mobs.get_mut(mob_id) else {
            return false;
        };
        mob.hp = mob.max_hp;
        mob.position.x += f64::from(roller.below(5)) - 2.0;
        mob.position.z += f64::from(roller.below(5)) - 2.0;
        tracing::debug!(mob_id, "mob respawned");
        true
    }

    /// Respawns a mob after `delay` on a detached task.
    pub fn schedule_respawn(self: &Arc<Self>, mob_id: String, delay: Duration) {
        let table = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut rng = rand::rng();
            table.respawn(&mob_id, &mut rng);
        });
    }

    pub fn remove(&self, mob_id: &str) -> Option<Mob> {
        self.mobs.lock().remove(mob_id)
    }
}
