//! NPC trust and quests.

use a3zone_protocol::WorldId;
use serde::Serialize;

use crate::catalog::{self, QuestReward, QUEST_XP};
use crate::character::{Character, Item};
use crate::combat::relic;
use crate::progression::{gain_xp, XpGain};
use crate::Rejection;

/// Trust change for a dialogue choice.
pub fn trust_delta(choice: Option<&str>) -> i32 {
    let choice = choice.unwrap_or_default().trim().to_ascii_lowercase();
    match choice.as_str() {
        "honor" | "help" | "protect" => 15,
        "ignore" => -5,
        _ => 5,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcTalk {
    pub npc: String,
    pub trust: i32,
    pub hidden_quest_unlocked: bool,
}

/// Talks to an NPC (default [`catalog::DEFAULT_NPC`]) and adjusts trust.
pub fn talk_npc(c: &mut Character, npc: Option<&str>, choice: Option<&str>) -> NpcTalk {
    let npc = npc
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(catalog::DEFAULT_NPC);
    let trust = c.adjust_trust(npc, trust_delta(choice));
    let hidden_quest_unlocked =
        catalog::hidden_quest_for(npc).is_some_and(|q| trust >= q.min_trust);
    NpcTalk {
        npc: npc.to_string(),
        trust,
        hidden_quest_unlocked,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestAccepted {
    pub quest_id: String,
    pub quest_name: String,
}

pub fn accept_quest(c: &mut Character, quest_id: &str) -> Result<QuestAccepted, Rejection> {
    let q = catalog::quest(quest_id).ok_or(Rejection::QuestNotFound)?;
    if q.hidden && c.trust_of(q.required_npc.unwrap_or_default()) < q.min_trust {
        return Err(Rejection::QuestHidden);
    }
    if c.level < q.min_level {
        return Err(Rejection::LevelTooLow);
    }

    c.quests.entry(q.id.to_string()).or_default().accepted = true;
    Ok(QuestAccepted {
        quest_id: q.id.to_string(),
        quest_name: q.name.to_string(),
    })
}

/// Rewards granted by a completed quest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestCompletion {
    pub quest: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world: Option<WorldId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_unlock: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternate_reward: Option<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storyline: Option<&'static str>,
    pub xp: XpGain,
}

/// Completes an accepted quest.
///
/// `unlock_world` flips the global unlock flag and returns `true` if this
/// call was the first to do so. It is only invoked once every check has
/// passed, so a rejected completion never touches global state.
pub fn complete_quest(
    c: &mut Character,
    quest_id: &str,
    unlock_world: impl FnOnce(WorldId, &str) -> bool,
) -> Result<QuestCompletion, Rejection> {
    let q = catalog::quest(quest_id).ok_or(Rejection::QuestNotFound)?;
    let progress = c.quests.get(q.id).copied().unwrap_or_default();
    if !progress.accepted {
        return Err(Rejection::QuestNotAccepted);
    }
    if progress.complete && q.non_repeatable {
        return Err(Rejection::QuestNonRepeatable);
    }
    if c.level < q.min_level {
        return Err(Rejection::LevelTooLow);
    }
    if let Some(npc) = q.required_npc {
        if c.trust_of(npc) < q.min_trust {
            return Err(Rejection::NpcTrustTooLow);
        }
    }

    let mut done = QuestCompletion {
        quest: q.name,
        world: None,
        first_unlock: None,
        alternate_reward: None,
        item: None,
        storyline: None,
        xp: XpGain::default(),
    };

    match q.reward {
        QuestReward::UnlockWorld {
            world,
            grants_aura,
            alternate,
        } => {
            let first = unlock_world(world, &c.name);
            c.unlocked_worlds.insert(world);
            if grants_aura {
                c.aura_level = c.aura_level.max(1);
            }
            if !first {
                if let Some(template) = alternate.and_then(catalog::gear_template) {
                    let medal = template.mint();
                    c.inventory.push(medal.clone());
                    done.alternate_reward = Some(medal);
                }
            }
            done.world = Some(world);
            done.first_unlock = Some(first);
        }
        QuestReward::Relic(kind) => {
            let item = relic(kind, "quest");
            c.inventory.push(item.clone());
            done.item = Some(item);
        }
        QuestReward::Storyline(flag) => {
            c.storylines.insert(flag.to_string());
            done.storyline = Some(flag);
        }
    }

    c.quests.entry(q.id.to_string()).or_default().complete = true;
    done.xp = gain_xp(c, QUEST_XP);
    Ok(done)
}
