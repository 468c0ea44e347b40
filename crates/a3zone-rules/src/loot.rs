//! Mob loot rolls.

use serde::Serialize;

use crate::catalog::{self, LootEntry, LootKind};
use crate::character::{Character, Item};
use crate::dice::Roller;

/// Basis points that make a drop certain.
pub const CERTAIN_BPS: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LootDrop {
    pub kind: LootKind,
    pub item_id: String,
    pub qty: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

impl LootDrop {
    pub fn gear(item: Item) -> Self {
        Self {
            kind: LootKind::Gear,
            item_id: item.id.clone(),
            qty: 1,
            item: Some(item),
        }
    }
}

fn rolls_drop(rate_bps: u32, roller: &mut impl Roller) -> bool {
    match rate_bps {
        0 => false,
        r if r >= CERTAIN_BPS => true,
        r => roller.below(CERTAIN_BPS) < r,
    }
}

fn rolled_qty(entry: &LootEntry, roller: &mut impl Roller) -> u32 {
    let min = entry.min_qty.max(1);
    let max = entry.max_qty.max(min);
    min + roller.below(max - min + 1)
}

/// Rolls every entry of a mob's loot table independently and credits
/// the character. `bonus_qty` is added to each material drop.
pub fn roll_loot(
    c: &mut Character,
    mob_id: &str,
    bonus_qty: u32,
    roller: &mut impl Roller,
) -> Vec<LootDrop> {
    let mut drops = Vec::new();
    for entry in catalog::loot_table(mob_id) {
        if !rolls_drop(entry.rate_bps, roller) {
            continue;
        }
        let qty = rolled_qty(entry, roller);
        match entry.kind {
            LootKind::Material => {
                let qty = qty + bonus_qty;
                c.add_material(entry.item_id, qty);
                drops.push(LootDrop {
                    kind: LootKind::Material,
                    item_id: entry.item_id.to_string(),
                    qty,
                    item: None,
                });
            }
            LootKind::Gear => {
                let Some(template) = catalog::gear_template(entry.item_id) else {
                    tracing::warn!(mob_id, item_id = entry.item_id, "loot entry without gear template");
                    continue;
                };
                for _ in 0..qty {
                    let item = template.mint();
                    c.inventory.push(item.clone());
                    drops.push(LootDrop {
                        kind: LootKind::Gear,
                        item_id: entry.item_id.to_string(),
                        qty: 1,
                        item: Some(item),
                    });
                }
            }
        }
    }
    drops
}
