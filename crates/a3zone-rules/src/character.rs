//! The durable player character and its value types.
//!
//! A [`Character`] is the unit of persistence: one JSON document per
//! character, keyed by normalized name. Every field carries a serde
//! default so records written by older builds still load, and
//! [`Character::normalize`] repairs whatever the defaults can't express
//! (missing class skills, health out of range, dangling equipment).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use a3zone_protocol::{Position, WorldId};
use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::progression::max_hp_for_level;
use crate::Rejection;

/// Level a brand-new character starts at.
pub const STARTER_LEVEL: u32 = 45;

/// Skill points a brand-new character starts with.
pub const STARTER_SKILL_POINTS: u32 = 3;

/// Display name used when a login name normalizes to nothing.
pub const FALLBACK_NAME: &str = "Wanderer";

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Class {
    #[default]
    Archer,
    Warrior,
    Mage,
    Rogue,
}

impl Class {
    /// Case-insensitive parse; unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Class> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "archer" => Some(Class::Archer),
            "warrior" => Some(Class::Warrior),
            "mage" => Some(Class::Mage),
            "rogue" => Some(Class::Rogue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Class::Archer => "Archer",
            Class::Warrior => "Warrior",
            Class::Mage => "Mage",
            Class::Rogue => "Rogue",
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Unique,
}

/// Equipment slot. Serialized lowercase (`"weapon"`, `"armor"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Weapon,
    Armor,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    #[default]
    None,
    Fire,
    Ice,
    Lightning,
    Earth,
    Light,
    Dark,
}

impl Element {
    /// Case-insensitive parse. Anything unrecognized clears the affinity.
    pub fn parse(raw: &str) -> Element {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fire" => Element::Fire,
            "ice" => Element::Ice,
            "lightning" => Element::Lightning,
            "earth" => Element::Earth,
            "light" => Element::Light,
            "dark" => Element::Dark,
            _ => Element::None,
        }
    }
}

/// Which affinity slot a `SET_ELEMENT` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementTarget {
    Weapon,
    Armor,
    Pet,
}

impl ElementTarget {
    pub fn parse(raw: &str) -> Result<ElementTarget, Rejection> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "weapon" => Ok(ElementTarget::Weapon),
            "armor" => Ok(ElementTarget::Armor),
            "pet" => Ok(ElementTarget::Pet),
            _ => Err(Rejection::InvalidTarget),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub grade: u32,
    pub rarity: Rarity,
    pub slot: Slot,
    #[serde(default)]
    pub element: Element,
    #[serde(default)]
    pub legendary: bool,
}

impl Item {
    /// Attack contributed when equipped.
    pub fn attack_power(&self) -> u32 {
        let rarity_bonus = match self.rarity {
            Rarity::Epic => 2,
            Rarity::Unique => 4,
            Rarity::Common | Rarity::Rare => 0,
        };
        self.grade * 2 + rarity_bonus
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PetState {
    pub name: String,
    pub passive: String,
    pub summoned: bool,
}

impl Default for PetState {
    fn default() -> Self {
        Self {
            name: "Falcon".into(),
            passive: "Critical Focus".into(),
            summoned: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MercenaryState {
    pub class: Option<Class>,
    pub level: u32,
    pub recruited: bool,
}

impl Default for MercenaryState {
    fn default() -> Self {
        Self {
            class: None,
            level: 1,
            recruited: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestProgress {
    pub accepted: bool,
    pub complete: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Elemental {
    pub weapon: Element,
    pub armor: Element,
    pub pet: Element,
}

impl Elemental {
    pub fn set(&mut self, target: ElementTarget, element: Element) {
        match target {
            ElementTarget::Weapon => self.weapon = element,
            ElementTarget::Armor => self.armor = element,
            ElementTarget::Pet => self.pet = element,
        }
    }
}

// ---------------------------------------------------------------------------
// Character
// ---------------------------------------------------------------------------

/// A persistent player character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Character {
    pub name: String,
    pub class: Class,
    pub level: u32,
    pub aura_level: u32,
    pub world_id: WorldId,
    pub xp: u64,
    pub xp_debt: u64,
    pub hp: i32,
    pub max_hp: i32,
    pub unlocked_worlds: BTreeSet<WorldId>,
    pub trust: BTreeMap<String, i32>,
    pub quests: BTreeMap<String, QuestProgress>,
    pub inventory: Vec<Item>,
    pub equipped: BTreeMap<Slot, String>,
    pub pet: PetState,
    pub mercenary: MercenaryState,
    pub elemental: Elemental,
    pub skill_points: u32,
    pub skills: BTreeMap<String, u32>,
    pub pk_score: u32,
    pub honor: i64,
    pub corpse: Option<Position>,
    pub guild: Option<String>,
    pub materials: BTreeMap<String, u32>,
    pub storylines: BTreeSet<String>,
}

impl Default for Character {
    fn default() -> Self {
        Self::new(FALLBACK_NAME, Class::Archer)
    }
}

impl Character {
    /// A fresh character with the class starter kit.
    pub fn new(name: impl Into<String>, class: Class) -> Self {
        let level = STARTER_LEVEL;
        let max_hp = max_hp_for_level(level);

        let mut skills = BTreeMap::new();
        for (i, def) in catalog::skills_for(class).enumerate() {
            // The first skill of every tree comes pre-trained.
            skills.insert(def.id.to_string(), u32::from(i == 0));
        }

        let mut c = Self {
            name: name.into(),
            class,
            level,
            aura_level: 0,
            world_id: WorldId::KNOWN,
            xp: 0,
            xp_debt: 0,
            hp: max_hp,
            max_hp,
            unlocked_worlds: BTreeSet::from([WorldId::KNOWN]),
            trust: BTreeMap::new(),
            quests: BTreeMap::new(),
            inventory: catalog::starter_kit(class),
            equipped: BTreeMap::new(),
            pet: PetState::default(),
            mercenary: MercenaryState::default(),
            elemental: Elemental::default(),
            skill_points: STARTER_SKILL_POINTS,
            skills,
            pk_score: 0,
            honor: 0,
            corpse: None,
            guild: None,
            materials: BTreeMap::new(),
            storylines: BTreeSet::new(),
        };
        c.normalize();
        c
    }

    /// Repairs a loaded record so every invariant holds again.
    pub fn normalize(&mut self) {
        let trimmed = self.name.trim();
        self.name = if trimmed.is_empty() {
            FALLBACK_NAME.to_string()
        } else {
            trimmed.to_string()
        };

        self.level = self.level.max(1);
        self.unlocked_worlds.insert(WorldId::KNOWN);

        for def in catalog::skills_for(self.class) {
            let rank = self.skills.entry(def.id.to_string()).or_insert(0);
            *rank = (*rank).min(def.max_rank);
        }

        self.max_hp = max_hp_for_level(self.level);
        if self.hp <= 0 || self.hp > self.max_hp {
            self.hp = self.max_hp;
        }

        self.mercenary.level = self.mercenary.level.max(1);

        let inventory = &self.inventory;
        self.equipped
            .retain(|_, id| inventory.iter().any(|item| &item.id == id));

        if self.guild.as_deref().is_some_and(|g| g.trim().is_empty()) {
            self.guild = None;
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Items currently equipped, in slot order.
    pub fn equipped_items(&self) -> impl Iterator<Item = &Item> {
        self.equipped
            .values()
            .filter_map(|id| self.inventory.iter().find(|item| &item.id == id))
    }

    /// Sum of attack power over equipped items.
    pub fn gear_power(&self) -> u32 {
        self.equipped_items().map(Item::attack_power).sum()
    }

    /// Equips an inventory item into its slot.
    pub fn equip(&mut self, item_id: &str) -> Result<Item, Rejection> {
        let item = self
            .inventory
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or(Rejection::ItemNotFound)?;
        self.equipped.insert(item.slot, item.id.clone());
        Ok(item)
    }

    pub fn trust_of(&self, npc: &str) -> i32 {
        self.trust.get(npc).copied().unwrap_or(0)
    }

    /// Applies a trust delta and returns the new value.
    pub fn adjust_trust(&mut self, npc: &str, delta: i32) -> i32 {
        let trust = self.trust.entry(npc.to_string()).or_insert(0);
        *trust = trust.saturating_add(delta);
        *trust
    }

    pub fn add_material(&mut self, material: &str, qty: u32) {
        *self.materials.entry(material.to_string()).or_insert(0) += qty;
    }

    pub fn material(&self, material: &str) -> u32 {
        self.materials.get(material).copied().unwrap_or(0)
    }

    pub fn summon_pet(&mut self, name: Option<&str>) {
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            self.pet.name = name.to_string();
        }
        self.pet.summoned = true;
    }

    /// Recruits a mercenary at the character's level. Unknown or missing
    /// classes default to Warrior.
    pub fn recruit_mercenary(&mut self, class: Option<&str>) {
        let class = class.and_then(Class::parse).unwrap_or(Class::Warrior);
        self.mercenary = MercenaryState {
            class: Some(class),
            level: self.level,
            recruited: true,
        };
    }
}
