//! Reply bodies shared by more than one command.

use std::collections::{BTreeMap, BTreeSet};

use a3zone_protocol::{Position, ServerMessage, WorldId, reply};
use a3zone_rules::{
    Class, Elemental, Item, MercenaryState, PetState, QuestProgress, Slot, catalog,
};
use a3zone_session::Session;
use a3zone_social::PartySnapshot;
use a3zone_world::UnlockHistory;
use serde::Serialize;

use crate::context::ZoneContext;

/// Display name of a world, `"Unknown"` for ids outside the catalog.
pub(crate) fn world_name(id: WorldId) -> &'static str {
    catalog::world(id).map_or("Unknown", |w| w.name)
}

/// `ENTER_OK`, sent after authentication and after `ENTER_WORLD`.
#[derive(Debug, Serialize)]
pub(crate) struct EnterOk<'a> {
    pub character: &'a str,
    pub world: &'static str,
    pub spawn: Position,
}

impl EnterOk<'_> {
    pub(crate) fn message(&self) -> ServerMessage {
        ServerMessage::new(reply::ENTER_OK, self)
    }
}

/// The full `STATE` snapshot of one session.
#[derive(Debug, Serialize)]
struct StateView<'a> {
    name: &'a str,
    class: Class,
    level: u32,
    xp: u64,
    xp_debt: u64,
    hp: i32,
    max_hp: i32,
    aura_level: u32,
    world: &'static str,
    world_id: WorldId,
    position: Position,
    unlocked_worlds: &'a BTreeSet<WorldId>,
    trust: &'a BTreeMap<String, i32>,
    quests: &'a BTreeMap<String, QuestProgress>,
    pet: &'a PetState,
    mercenary: &'a MercenaryState,
    elemental: &'a Elemental,
    skill_points: u32,
    skills: &'a BTreeMap<String, u32>,
    pk_score: u32,
    honor: i64,
    inventory: &'a [Item],
    materials: &'a BTreeMap<String, u32>,
    equipped: &'a BTreeMap<Slot, String>,
    corpse: Option<Position>,
    history: UnlockHistory,
    guild: Option<&'a str>,
    party: Option<PartySnapshot>,
}

/// Builds the `STATE` message for `session`.
///
/// Unlock history and the party snapshot are read before the session is
/// locked.
pub(crate) fn state_message(ctx: &ZoneContext, session: &Session) -> ServerMessage {
    let history = ctx.worlds.history();
    let party = ctx.parties.snapshot_for(&session.name());

    let state = session.lock();
    let c = &state.character;
    let view = StateView {
        name: &c.name,
        class: c.class,
        level: c.level,
        xp: c.xp,
        xp_debt: c.xp_debt,
        hp: c.hp,
        max_hp: c.max_hp,
        aura_level: c.aura_level,
        world: world_name(state.world),
        world_id: state.world,
        position: state.position,
        unlocked_worlds: &c.unlocked_worlds,
        trust: &c.trust,
        quests: &c.quests,
        pet: &c.pet,
        mercenary: &c.mercenary,
        elemental: &c.elemental,
        skill_points: c.skill_points,
        skills: &c.skills,
        pk_score: c.pk_score,
        honor: c.honor,
        inventory: &c.inventory,
        materials: &c.materials,
        equipped: &c.equipped,
        corpse: c.corpse,
        history,
        guild: c.guild.as_deref(),
        party,
    };
    ServerMessage::new(reply::STATE, &view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing;

    #[test]
    fn test_world_name_known_and_unknown() {
        assert_ne!(world_name(WorldId::KNOWN), "Unknown");
        assert_eq!(world_name(WorldId(99)), "Unknown");
    }

    #[test]
    fn test_state_message_reports_character_and_world() {
        let (ctx, _dir) = testing::context();
        let (session, _rx) = testing::player(&ctx, 1, "Ayla", Position::new(3.0, 0.0, 4.0));

        let msg = state_message(&ctx, &session);

        assert_eq!(msg.command, reply::STATE);
        assert_eq!(msg.payload["name"], "Ayla");
        assert_eq!(msg.payload["world"], world_name(WorldId::KNOWN));
        assert_eq!(msg.payload["position"]["x"], 3.0);
        assert!(msg.payload["party"].is_null());
        assert!(msg.payload["history"]["world_2_first_unlock"].is_null());
    }
}
