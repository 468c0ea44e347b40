//! Global world unlock state.
//!
//! Worlds 2 and 3 start locked for everyone. The first character to
//! finish the unlocking quest opens the world globally and is recorded
//! in the unlock history; later finishers only unlock it for themselves.

use std::collections::BTreeMap;

use a3zone_protocol::WorldId;
use a3zone_rules::catalog::{self, WorldDef};
use a3zone_rules::{Character, Rejection, travel};
use parking_lot::RwLock;
use serde::Serialize;

#[derive(Debug, Default)]
struct DirectoryState {
    unlocked: BTreeMap<WorldId, bool>,
    first_unlock: BTreeMap<WorldId, String>,
}

/// Who opened each gated world first. `None` while still locked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockHistory {
    pub world_2_first_unlock: Option<String>,
    pub world_3_first_unlock: Option<String>,
}

/// Shared, thread-safe world unlock flags.
#[derive(Debug)]
pub struct WorldDirectory {
    state: RwLock<DirectoryState>,
}

impl Default for WorldDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldDirectory {
    /// Flags taken from the catalog's launch state.
    pub fn new() -> Self {
        let unlocked = catalog::WORLDS
            .iter()
            .map(|w| (w.id, w.open_at_launch))
            .collect();
        Self {
            state: RwLock::new(DirectoryState {
                unlocked,
                first_unlock: BTreeMap::new(),
            }),
        }
    }

    pub fn is_unlocked(&self, id: WorldId) -> bool {
        self.state.read().unlocked.get(&id).copied().unwrap_or(false)
    }

    /// Opens `id` for everyone. Returns `true` only for the call that
    /// actually flipped the flag; unknown worlds are never unlocked.
    pub fn unlock(&self, id: WorldId, by: &str) -> bool {
        let mut guard = self.state.write();
        let state = &mut *guard;
        match state.unlocked.get_mut(&id) {
            Some(flag) if !*flag => {
                *flag = true;
                state.first_unlock.insert(id, by.to_string());
                tracing::info!(world = %id, character = %by, "world unlocked for everyone");
                true
            }
            _ => false,
        }
    }

    /// Entry check against the live unlock flag.
    pub fn check_entry(&self, c: &Character, id: WorldId) -> Result<&'static WorldDef, Rejection> {
        travel::check_entry(c, id, self.is_unlocked(id))
    }

    pub fn history(&self) -> UnlockHistory {
        let state = self.state.read();
        UnlockHistory {
            world_2_first_unlock: state.first_unlock.get(&WorldId::SHATTERED).cloned(),
            world_3_first_unlock: state.first_unlock.get(&WorldId::MYTHICAL).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a3zone_rules::Class;

    #[test]
    fn test_new_only_known_world_open() {
        let dir = WorldDirectory::new();
        assert!(dir.is_unlocked(WorldId::KNOWN));
        assert!(!dir.is_unlocked(WorldId::SHATTERED));
        assert!(!dir.is_unlocked(WorldId::MYTHICAL));
    }

    #[test]
    fn test_unlock_first_caller_wins() {
        let dir = WorldDirectory::new();
        assert!(dir.unlock(WorldId::SHATTERED, "Ayla"));
        assert!(!dir.unlock(WorldId::SHATTERED, "Bran"));
        assert_eq!(dir.history().world_2_first_unlock.as_deref(), Some("Ayla"));
        assert_eq!(dir.history().world_3_first_unlock, None);
    }

    #[test]
    fn test_unlock_unknown_world_is_noop() {
        let dir = WorldDirectory::new();
        assert!(!dir.unlock(WorldId(42), "Ayla"));
        assert!(!dir.is_unlocked(WorldId(42)));
    }

    #[test]
    fn test_check_entry_uses_global_flag() {
        let dir = WorldDirectory::new();
        let mut c = Character::new("Bran", Class::Warrior);
        c.level = 60;
        c.normalize();

        assert_eq!(
            dir.check_entry(&c, WorldId::SHATTERED).unwrap_err(),
            Rejection::WorldLocked
        );
        dir.unlock(WorldId::SHATTERED, "Ayla");
        assert!(dir.check_entry(&c, WorldId::SHATTERED).is_ok());
    }

    #[test]
    fn test_unlock_concurrent_has_single_winner() {
        use std::sync::Arc;
        use std::thread;

        let dir = Arc::new(WorldDirectory::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let dir = Arc::clone(&dir);
                thread::spawn(move || dir.unlock(WorldId::MYTHICAL, &format!("p{i}")))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
