//! Skill trees: learning ranks and the damage they add.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::{self, SkillDef};
use crate::character::{Character, Class};
use crate::Rejection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillLearned {
    pub skill_id: String,
    pub new_rank: u32,
    pub skill_points: u32,
}

/// Spends one skill point on `skill_id`.
pub fn learn_skill(c: &mut Character, skill_id: &str) -> Result<SkillLearned, Rejection> {
    let def = catalog::class_skill(c.class, skill_id).ok_or(Rejection::SkillNotFound)?;
    if c.skill_points == 0 {
        return Err(Rejection::NoSkillPoints);
    }
    let current = c.skills.get(def.id).copied().unwrap_or(0);
    if current >= def.max_rank {
        return Err(Rejection::MaxRankReached);
    }

    c.skills.insert(def.id.to_string(), current + 1);
    c.skill_points -= 1;
    Ok(SkillLearned {
        skill_id: def.id.to_string(),
        new_rank: current + 1,
        skill_points: c.skill_points,
    })
}

/// Extra damage from using `skill_id`. Unknown or untrained skills add
/// nothing.
pub fn skill_bonus(c: &Character, skill_id: Option<&str>) -> u32 {
    let Some(def) = skill_id.and_then(|id| catalog::class_skill(c.class, id)) else {
        return 0;
    };
    def.base_bonus * c.skills.get(def.id).copied().unwrap_or(0)
}

/// Snapshot returned by the `SKILL_TREE` command.
#[derive(Debug, Serialize)]
pub struct SkillTreeView<'a> {
    pub class: Class,
    pub skill_points: u32,
    pub known_skills: &'a BTreeMap<String, u32>,
    pub catalog: BTreeMap<&'static str, &'static SkillDef>,
}

pub fn skill_tree(c: &Character) -> SkillTreeView<'_> {
    SkillTreeView {
        class: c.class,
        skill_points: c.skill_points,
        known_skills: &c.skills,
        catalog: catalog::skills_for(c.class).map(|s| (s.id, s)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learn_skill_spends_point() {
        let mut c = Character::new("Ayla", Class::Archer);
        let points = c.skill_points;
        let learned = learn_skill(&mut c, "burst_arrow").unwrap();
        assert_eq!(learned.new_rank, 1);
        assert_eq!(c.skill_points, points - 1);
        assert_eq!(learned.skill_points, c.skill_points);
    }

    #[test]
    fn test_learn_skill_other_class_not_found() {
        let mut c = Character::new("Ayla", Class::Archer);
        assert_eq!(learn_skill(&mut c, "cleave"), Err(Rejection::SkillNotFound));
    }

    #[test]
    fn test_learn_skill_without_points_rejected() {
        let mut c = Character::new("Ayla", Class::Archer);
        c.skill_points = 0;
        let before = c.clone();
        assert_eq!(learn_skill(&mut c, "burst_arrow"), Err(Rejection::NoSkillPoints));
        assert_eq!(c, before);
    }

    #[test]
    fn test_learn_skill_at_max_rank_rejected() {
        let mut c = Character::new("Ayla", Class::Archer);
        c.skills.insert("evasion_step".into(), 3);
        assert_eq!(learn_skill(&mut c, "evasion_step"), Err(Rejection::MaxRankReached));
    }

    #[test]
    fn test_skill_bonus_scales_with_rank() {
        let mut c = Character::new("Ayla", Class::Archer);
        assert_eq!(skill_bonus(&c, Some("precise_shot")), 7);
        c.skills.insert("precise_shot".into(), 3);
        assert_eq!(skill_bonus(&c, Some("precise_shot")), 21);
        assert_eq!(skill_bonus(&c, Some("burst_arrow")), 0);
        assert_eq!(skill_bonus(&c, None), 0);
        assert_eq!(skill_bonus(&c, Some("cleave")), 0);
    }

    #[test]
    fn test_skill_tree_lists_class_catalog() {
        let c = Character::new("Bran", Class::Warrior);
        let tree = skill_tree(&c);
        assert_eq!(tree.catalog.len(), 3);
        assert!(tree.catalog.contains_key("iron_wall"));
    }
}
