//! Crafting gear from materials.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{self, MaterialDef, RecipeDef, MAX_CRAFT_QTY};
use crate::character::{Character, Item};
use crate::Rejection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeOutput {
    pub template_id: &'static str,
    pub qty: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeView {
    pub id: &'static str,
    pub name: &'static str,
    pub min_level: u32,
    pub inputs: BTreeMap<&'static str, u32>,
    pub output: RecipeOutput,
}

impl From<&'static RecipeDef> for RecipeView {
    fn from(r: &'static RecipeDef) -> Self {
        Self {
            id: r.id,
            name: r.name,
            min_level: r.min_level,
            inputs: r.inputs.iter().copied().collect(),
            output: RecipeOutput {
                template_id: r.output_template,
                qty: 1,
            },
        }
    }
}

/// Payload of `GET_RECIPES`: recipes and materials sorted by id.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeBook {
    pub recipes: Vec<RecipeView>,
    pub materials: Vec<MaterialDef>,
}

pub fn recipe_book() -> RecipeBook {
    let mut recipes: Vec<RecipeView> = catalog::RECIPES.iter().map(RecipeView::from).collect();
    recipes.sort_by_key(|r| r.id);
    let mut materials = catalog::MATERIALS.to_vec();
    materials.sort_by_key(|m| m.id);
    RecipeBook { recipes, materials }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crafted {
    pub recipe_id: &'static str,
    pub recipe: &'static str,
    pub qty: u32,
    pub consumed: BTreeMap<&'static str, u32>,
    pub crafted: Vec<Item>,
    pub materials: BTreeMap<String, u32>,
    pub inventory: usize,
}

/// Crafts `qty` copies of a recipe.
///
/// All checks run before anything is deducted, so a rejection leaves
/// materials and inventory exactly as they were.
pub fn craft(c: &mut Character, recipe_id: &str, qty: i64) -> Result<Crafted, Rejection> {
    let qty = u32::try_from(qty)
        .ok()
        .filter(|q| (1..=MAX_CRAFT_QTY).contains(q))
        .ok_or(Rejection::InvalidQty)?;

    let recipe = catalog::recipe(recipe_id).ok_or(Rejection::RecipeNotFound)?;
    let template =
        catalog::gear_template(recipe.output_template).ok_or(Rejection::RecipeOutputInvalid)?;
    if c.level < recipe.min_level {
        return Err(Rejection::LevelTooLow);
    }
    if recipe
        .inputs
        .iter()
        .any(|(material, need)| c.material(material) < need * qty)
    {
        return Err(Rejection::InsufficientMaterials);
    }

    let mut consumed = BTreeMap::new();
    for (material, need) in recipe.inputs {
        let total = need * qty;
        if let Some(have) = c.materials.get_mut(*material) {
            *have -= total;
        }
        consumed.insert(*material, total);
    }

    let crafted: Vec<Item> = (0..qty).map(|_| template.mint()).collect();
    c.inventory.extend(crafted.iter().cloned());

    Ok(Crafted {
        recipe_id: recipe.id,
        recipe: recipe.name,
        qty,
        consumed,
        crafted,
        materials: c.materials.clone(),
        inventory: c.inventory.len(),
    })
}
