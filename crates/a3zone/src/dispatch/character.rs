//! Commands that read or change the player's own character: state,
//! skills, NPCs and quests, elements, companions, gear and crafting.

use a3zone_protocol::{ServerMessage, reply};
use a3zone_rules::{
    Element, ElementTarget, Item, Rejection, Slot, crafting, quests, skills,
};
use a3zone_session::Session;
use serde::Serialize;

use super::Effect;
use crate::ZoneError;
use crate::context::ZoneContext;
use crate::payload::state_message;

#[derive(Debug, Serialize)]
struct ElementSet {
    target: ElementTarget,
    element: Element,
}

#[derive(Debug, Serialize)]
struct Equipped {
    slot: Slot,
    item: Item,
}

/// Sends `ok` on success or `rejected` with the reason code. A success
/// means the character changed.
fn answer<T: Serialize>(
    session: &Session,
    result: Result<T, Rejection>,
    ok: &str,
    rejected: &str,
) -> Result<Effect, ZoneError> {
    match result {
        Ok(body) => {
            session.send(ServerMessage::new(ok, body))?;
            Ok(Effect::Changed)
        }
        Err(reason) => {
            session.send(ServerMessage::text(rejected, reason.code()))?;
            Ok(Effect::Done)
        }
    }
}

pub(super) fn state(ctx: &ZoneContext, session: &Session) -> Result<Effect, ZoneError> {
    session.send(state_message(ctx, session))?;
    Ok(Effect::Done)
}

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

pub(super) fn skill_tree(session: &Session) -> Result<Effect, ZoneError> {
    let msg = {
        let state = session.lock();
        ServerMessage::new(reply::SKILL_TREE, skills::skill_tree(&state.character))
    };
    session.send(msg)?;
    Ok(Effect::Done)
}

pub(super) fn learn_skill(session: &Session, skill_id: &str) -> Result<Effect, ZoneError> {
    let result = skills::learn_skill(&mut session.lock().character, skill_id.trim());
    answer(session, result, reply::SKILL_LEARNED, reply::SKILL_REJECTED)
}

// ---------------------------------------------------------------------------
// NPCs and quests
// ---------------------------------------------------------------------------

pub(super) fn talk_npc(
    session: &Session,
    npc: Option<&str>,
    choice: Option<&str>,
) -> Result<Effect, ZoneError> {
    let talk = quests::talk_npc(&mut session.lock().character, npc, choice);
    session.send(ServerMessage::new(reply::NPC_STATE, talk))?;
    Ok(Effect::Changed)
}

pub(super) fn accept_quest(session: &Session, quest_id: &str) -> Result<Effect, ZoneError> {
    let result = quests::accept_quest(&mut session.lock().character, quest_id.trim());
    answer(session, result, reply::QUEST_ACCEPTED, reply::QUEST_REJECTED)
}

/// Completes a quest. World unlocks go through the shared directory,
/// which is only touched once every check has passed.
pub(super) fn complete_quest(
    ctx: &ZoneContext,
    session: &Session,
    quest_id: &str,
) -> Result<Effect, ZoneError> {
    let result = quests::complete_quest(&mut session.lock().character, quest_id.trim(), |world, by| {
        ctx.worlds.unlock(world, by)
    });
    answer(session, result, reply::QUEST_COMPLETED, reply::QUEST_REJECTED)
}

// ---------------------------------------------------------------------------
// Elements, companions, gear
// ---------------------------------------------------------------------------

pub(super) fn set_element(session: &Session, target: &str, element: &str) -> Result<Effect, ZoneError> {
    let result = ElementTarget::parse(target).map(|target| {
        let element = Element::parse(element);
        session.lock().character.elemental.set(target, element);
        ElementSet { target, element }
    });
    answer(session, result, reply::ELEMENT_SET, reply::ELEMENT_REJECTED)
}

pub(super) fn summon_pet(session: &Session, pet: Option<&str>) -> Result<Effect, ZoneError> {
    let pet = {
        let mut state = session.lock();
        state.character.summon_pet(pet);
        state.character.pet.clone()
    };
    session.send(ServerMessage::new(reply::PET_SUMMONED, pet))?;
    Ok(Effect::Changed)
}

pub(super) fn recruit_mercenary(session: &Session, class: Option<&str>) -> Result<Effect, ZoneError> {
    let merc = {
        let mut state = session.lock();
        state.character.recruit_mercenary(class);
        state.character.mercenary.clone()
    };
    session.send(ServerMessage::new(reply::MERC_RECRUITED, merc))?;
    Ok(Effect::Changed)
}

pub(super) fn equip(session: &Session, item_id: &str) -> Result<Effect, ZoneError> {
    let result = session
        .lock()
        .character
        .equip(item_id.trim())
        .map(|item| Equipped {
            slot: item.slot,
            item,
        });
    answer(session, result, reply::EQUIP_OK, reply::EQUIP_REJECTED)
}

// ---------------------------------------------------------------------------
// Crafting
// ---------------------------------------------------------------------------

pub(super) fn recipes(session: &Session) -> Result<Effect, ZoneError> {
    session.send(ServerMessage::new(reply::RECIPES, crafting::recipe_book()))?;
    Ok(Effect::Done)
}

pub(super) fn craft(session: &Session, recipe_id: &str, qty: i64) -> Result<Effect, ZoneError> {
    let result = crafting::craft(&mut session.lock().character, recipe_id.trim(), qty);
    answer(session, result, reply::CRAFT_OK, reply::CRAFT_REJECTED)
}
