//! Static content: worlds, NPCs, mobs, skills, quests, materials, gear,
//! loot tables and recipes.
//!
//! Everything here is compiled in and immutable. Lookups are linear
//! scans over small slices, which keeps the data readable as tables.

use a3zone_protocol::{Position, WorldId};
use serde::Serialize;

use crate::character::{Class, Element, Item, Rarity, Slot};

// ---------------------------------------------------------------------------
// Worlds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorldDef {
    pub id: WorldId,
    pub name: &'static str,
    pub min_level: u32,
    pub max_level: u32,
    /// Whether the world starts globally open.
    pub open_at_launch: bool,
    pub requires_aura: bool,
    pub spawn: Position,
}

pub static WORLDS: &[WorldDef] = &[
    WorldDef {
        id: WorldId::KNOWN,
        name: "The Known World",
        min_level: 1,
        max_level: 50,
        open_at_launch: true,
        requires_aura: false,
        spawn: Position::new(100.0, 0.0, 100.0),
    },
    WorldDef {
        id: WorldId::SHATTERED,
        name: "The Shattered World",
        min_level: 51,
        max_level: 100,
        open_at_launch: false,
        requires_aura: false,
        spawn: Position::new(500.0, 0.0, 500.0),
    },
    WorldDef {
        id: WorldId::MYTHICAL,
        name: "The Mythical World",
        min_level: 101,
        max_level: 135,
        open_at_launch: false,
        requires_aura: true,
        spawn: Position::new(1000.0, 0.0, 1000.0),
    },
];

pub fn world(id: WorldId) -> Option<&'static WorldDef> {
    WORLDS.iter().find(|w| w.id == id)
}

/// Spawn point of a world, or of the starting world if `id` is unknown.
pub fn spawn_point(id: WorldId) -> Position {
    world(id)
        .or_else(|| world(WorldId::KNOWN))
        .map(|w| w.spawn)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// NPCs and mobs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NpcDef {
    pub id: &'static str,
    pub name: &'static str,
    pub world_id: WorldId,
    pub position: Position,
}

pub static NPCS: &[NpcDef] = &[
    NpcDef {
        id: "npc_elder_rowan",
        name: "Elder Rowan",
        world_id: WorldId::KNOWN,
        position: Position::new(108.0, 0.0, 106.0),
    },
    NpcDef {
        id: "npc_gear_smith",
        name: "Gear Smith Halan",
        world_id: WorldId::KNOWN,
        position: Position::new(96.0, 0.0, 99.0),
    },
    NpcDef {
        id: "npc_shattered_keeper",
        name: "Shattered Keeper",
        world_id: WorldId::SHATTERED,
        position: Position::new(507.0, 0.0, 502.0),
    },
    NpcDef {
        id: "npc_myth_warden",
        name: "Myth Warden",
        world_id: WorldId::MYTHICAL,
        position: Position::new(1007.0, 0.0, 1004.0),
    },
];

/// The NPC `TALK_NPC` addresses when the client names none.
pub const DEFAULT_NPC: &str = "Elder Rowan";

/// Initial placement of a creature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobSpawn {
    pub id: &'static str,
    pub name: &'static str,
    pub world_id: WorldId,
    pub level: u32,
    pub max_hp: i32,
    pub position: Position,
    pub respawn_secs: u64,
}

pub static MOB_SPAWNS: &[MobSpawn] = &[
    MobSpawn {
        id: "mob_wolf_01",
        name: "Rift Wolf",
        world_id: WorldId::KNOWN,
        level: 42,
        max_hp: 210,
        position: Position::new(112.0, 0.0, 108.0),
        respawn_secs: 8,
    },
    MobSpawn {
        id: "mob_bandit_01",
        name: "Dust Bandit",
        world_id: WorldId::KNOWN,
        level: 46,
        max_hp: 245,
        position: Position::new(118.0, 0.0, 110.0),
        respawn_secs: 9,
    },
    MobSpawn {
        id: "mob_shard_01",
        name: "Shard Revenant",
        world_id: WorldId::SHATTERED,
        level: 62,
        max_hp: 360,
        position: Position::new(510.0, 0.0, 507.0),
        respawn_secs: 10,
    },
    MobSpawn {
        id: "mob_myth_01",
        name: "Mythic Devourer",
        world_id: WorldId::MYTHICAL,
        level: 112,
        max_hp: 680,
        position: Position::new(1012.0, 0.0, 1009.0),
        respawn_secs: 12,
    },
];

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkillDef {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub class: Class,
    pub max_rank: u32,
    pub base_bonus: u32,
    pub description: &'static str,
}

const fn skill(
    class: Class,
    id: &'static str,
    name: &'static str,
    max_rank: u32,
    base_bonus: u32,
    description: &'static str,
) -> SkillDef {
    SkillDef {
        id,
        name,
        class,
        max_rank,
        base_bonus,
        description,
    }
}

pub static SKILLS: &[SkillDef] = &[
    skill(Class::Archer, "precise_shot", "Precise Shot", 5, 7, "Single-target precision boost"),
    skill(Class::Archer, "evasion_step", "Evasion Step", 3, 3, "Reduces death chance in risky fights"),
    skill(Class::Archer, "burst_arrow", "Burst Arrow", 5, 10, "High burst skill"),
    skill(Class::Warrior, "cleave", "Cleave", 5, 9, "Heavy melee sweep"),
    skill(Class::Warrior, "iron_wall", "Iron Wall", 3, 3, "Defensive stance"),
    skill(Class::Warrior, "battle_rush", "Battle Rush", 5, 8, "Momentum attack"),
    skill(Class::Mage, "arc_bolt", "Arc Bolt", 5, 10, "Elemental bolt"),
    skill(Class::Mage, "mana_barrier", "Mana Barrier", 3, 3, "Protective shield"),
    skill(Class::Mage, "cataclysm_nova", "Cataclysm Nova", 5, 12, "Explosive spell"),
];

/// The skill tree of a class, in catalog order.
pub fn skills_for(class: Class) -> impl Iterator<Item = &'static SkillDef> {
    SKILLS.iter().filter(move |s| s.class == class)
}

pub fn class_skill(class: Class, id: &str) -> Option<&'static SkillDef> {
    skills_for(class).find(|s| s.id == id)
}

// ---------------------------------------------------------------------------
// Quests
// ---------------------------------------------------------------------------

/// What completing a quest grants besides the flat XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestReward {
    /// Unlocks a world for the character and, when nobody has before,
    /// globally. A repeat completion of a world that was already open
    /// grants the `alternate` gear template instead.
    UnlockWorld {
        world: WorldId,
        grants_aura: bool,
        alternate: Option<&'static str>,
    },
    Relic(RelicKind),
    Storyline(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelicKind {
    Grace,
    Soul,
}

impl RelicKind {
    pub fn element(&self) -> Element {
        match self {
            RelicKind::Grace => Element::Light,
            RelicKind::Soul => Element::Dark,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelicKind::Grace => "Grace",
            RelicKind::Soul => "Soul",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestDef {
    pub id: &'static str,
    pub name: &'static str,
    pub hidden: bool,
    pub non_repeatable: bool,
    pub required_npc: Option<&'static str>,
    pub min_trust: i32,
    pub min_level: u32,
    pub reward: QuestReward,
}

/// Flat XP granted by every quest completion.
pub const QUEST_XP: u64 = 120;

pub static QUESTS: &[QuestDef] = &[
    QuestDef {
        id: "unlock_world2_race",
        name: "The Shattered Sigil Race",
        hidden: false,
        non_repeatable: false,
        required_npc: None,
        min_trust: 0,
        min_level: 45,
        reward: QuestReward::UnlockWorld {
            world: WorldId::SHATTERED,
            grants_aura: false,
            alternate: Some("shattered_medal"),
        },
    },
    QuestDef {
        id: "unlock_world3_legend",
        name: "Aura of the Mythical Gate",
        hidden: false,
        non_repeatable: false,
        required_npc: None,
        min_trust: 0,
        min_level: 101,
        reward: QuestReward::UnlockWorld {
            world: WorldId::MYTHICAL,
            grants_aura: true,
            alternate: None,
        },
    },
    QuestDef {
        id: "npc_oath_hidden",
        name: "Whisper Oath",
        hidden: true,
        non_repeatable: true,
        required_npc: Some("Elder Rowan"),
        min_trust: 60,
        min_level: 30,
        reward: QuestReward::Storyline("SECRET_ARCHIVE_UNLOCKED"),
    },
    QuestDef {
        id: "grace_legacy",
        name: "Legacy of Grace",
        hidden: false,
        non_repeatable: true,
        required_npc: None,
        min_trust: 0,
        min_level: 90,
        reward: QuestReward::Relic(RelicKind::Grace),
    },
    QuestDef {
        id: "soul_legacy",
        name: "Legacy of Soul",
        hidden: false,
        non_repeatable: true,
        required_npc: None,
        min_trust: 0,
        min_level: 90,
        reward: QuestReward::Relic(RelicKind::Soul),
    },
];

pub fn quest(id: &str) -> Option<&'static QuestDef> {
    QUESTS.iter().find(|q| q.id == id)
}

/// The hidden quest an NPC's trust unlocks, if any.
pub fn hidden_quest_for(npc: &str) -> Option<&'static QuestDef> {
    QUESTS
        .iter()
        .find(|q| q.hidden && q.required_npc == Some(npc))
}

// ---------------------------------------------------------------------------
// Materials, gear and loot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaterialDef {
    pub id: &'static str,
    pub name: &'static str,
}

pub static MATERIALS: &[MaterialDef] = &[
    MaterialDef { id: "bandit_scrap", name: "Bandit Iron Scrap" },
    MaterialDef { id: "mythic_essence", name: "Mythic Essence" },
    MaterialDef { id: "shard_core", name: "Shard Core" },
    MaterialDef { id: "wolf_pelt", name: "Rift Wolf Pelt" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GearTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub grade: u32,
    pub rarity: Rarity,
    pub slot: Slot,
    pub element: Element,
}

pub static GEAR: &[GearTemplate] = &[
    GearTemplate {
        id: "crafted_wolfhide_bow",
        name: "Wolfhide Hunter Bow",
        grade: 4,
        rarity: Rarity::Rare,
        slot: Slot::Weapon,
        element: Element::None,
    },
    GearTemplate {
        id: "crafted_bandit_mail",
        name: "Banditforged Mail",
        grade: 4,
        rarity: Rarity::Rare,
        slot: Slot::Armor,
        element: Element::None,
    },
    GearTemplate {
        id: "crafted_shard_blade",
        name: "Shardsteel Blade",
        grade: 6,
        rarity: Rarity::Epic,
        slot: Slot::Weapon,
        element: Element::Lightning,
    },
    GearTemplate {
        id: "shattered_medal",
        name: "Shattered Champion Medal",
        grade: 7,
        rarity: Rarity::Epic,
        slot: Slot::Armor,
        element: Element::Earth,
    },
];

pub fn gear_template(id: &str) -> Option<&'static GearTemplate> {
    GEAR.iter().find(|g| g.id == id)
}

impl GearTemplate {
    /// A new item instance with a unique id derived from the template.
    pub fn mint(&self) -> Item {
        Item {
            id: format!("{}_{}", self.id, uuid::Uuid::new_v4().simple()),
            name: self.name.to_string(),
            grade: self.grade,
            rarity: self.rarity,
            slot: self.slot,
            element: self.element,
            legendary: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LootKind {
    Material,
    Gear,
}

/// One independent roll in a mob's loot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LootEntry {
    pub kind: LootKind,
    pub item_id: &'static str,
    /// Drop chance in basis points (10 000 = always).
    pub rate_bps: u32,
    pub min_qty: u32,
    pub max_qty: u32,
}

static LOOT_TABLES: &[(&str, &[LootEntry])] = &[
    (
        "mob_wolf_01",
        &[LootEntry {
            kind: LootKind::Material,
            item_id: "wolf_pelt",
            rate_bps: 10_000,
            min_qty: 1,
            max_qty: 2,
        }],
    ),
    (
        "mob_bandit_01",
        &[LootEntry {
            kind: LootKind::Material,
            item_id: "bandit_scrap",
            rate_bps: 8_500,
            min_qty: 1,
            max_qty: 3,
        }],
    ),
    (
        "mob_shard_01",
        &[
            LootEntry {
                kind: LootKind::Material,
                item_id: "shard_core",
                rate_bps: 7_000,
                min_qty: 1,
                max_qty: 2,
            },
            LootEntry {
                kind: LootKind::Gear,
                item_id: "crafted_shard_blade",
                rate_bps: 700,
                min_qty: 1,
                max_qty: 1,
            },
        ],
    ),
    (
        "mob_myth_01",
        &[LootEntry {
            kind: LootKind::Material,
            item_id: "mythic_essence",
            rate_bps: 8_000,
            min_qty: 1,
            max_qty: 2,
        }],
    ),
];

pub fn loot_table(mob_id: &str) -> &'static [LootEntry] {
    LOOT_TABLES
        .iter()
        .find(|(id, _)| *id == mob_id)
        .map(|(_, entries)| *entries)
        .unwrap_or(&[])
}

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// Largest quantity a single craft request may ask for.
pub const MAX_CRAFT_QTY: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeDef {
    pub id: &'static str,
    pub name: &'static str,
    pub min_level: u32,
    pub inputs: &'static [(&'static str, u32)],
    pub output_template: &'static str,
}

pub static RECIPES: &[RecipeDef] = &[
    RecipeDef {
        id: "bandit_mail",
        name: "Banditforged Mail",
        min_level: 20,
        inputs: &[("bandit_scrap", 5)],
        output_template: "crafted_bandit_mail",
    },
    RecipeDef {
        id: "shard_blade",
        name: "Shardsteel Blade",
        min_level: 55,
        inputs: &[("shard_core", 3), ("bandit_scrap", 2)],
        output_template: "crafted_shard_blade",
    },
    RecipeDef {
        id: "wolfhide_bow",
        name: "Wolfhide Hunter Bow",
        min_level: 20,
        inputs: &[("wolf_pelt", 1)],
        output_template: "crafted_wolfhide_bow",
    },
];

pub fn recipe(id: &str) -> Option<&'static RecipeDef> {
    RECIPES.iter().find(|r| r.id == id)
}

// ---------------------------------------------------------------------------
// Starter kits
// ---------------------------------------------------------------------------

fn starter_item(id: &str, name: &str, rarity: Rarity, slot: Slot) -> Item {
    Item {
        id: id.to_string(),
        name: name.to_string(),
        grade: 2,
        rarity,
        slot,
        element: Element::None,
        legendary: false,
    }
}

/// Items a new character of `class` starts with.
pub fn starter_kit(class: Class) -> Vec<Item> {
    let weapon = match class {
        Class::Archer => starter_item("starter_bow", "Scout Bow", Rarity::Common, Slot::Weapon),
        Class::Warrior => starter_item("starter_blade", "Recruit Blade", Rarity::Common, Slot::Weapon),
        Class::Mage => starter_item("starter_staff", "Apprentice Staff", Rarity::Common, Slot::Weapon),
        Class::Rogue => starter_item("starter_dagger", "Alley Dagger", Rarity::Common, Slot::Weapon),
    };
    let armor = match class {
        Class::Mage => starter_item("starter_robe", "Novice Robe", Rarity::Rare, Slot::Armor),
        _ => starter_item("starter_mail", "Pathfinder Mail", Rarity::Rare, Slot::Armor),
    };
    vec![weapon, armor]
}
