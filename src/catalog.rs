//! Static registry of queueable actions.
//!
//! Each action carries its effects as plain function pointers, so the engine
//! never dispatches on the id string.

use crate::{rules::Season, skills::SkillKind, world::Resources};

const RESEARCH_POPULATION_EXPONENT: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Produces every year, scaled linearly by population.
    Resource,
    /// Same scaling as resources, but feeds the army.
    Military,
    /// Completion only. More hands finish it faster, linearly.
    Building,
    /// Completion only. Population speeds it up with diminishing returns.
    Research,
}

impl Category {
    pub fn produces_each_tick(self) -> bool {
        matches!(self, Category::Resource | Category::Military)
    }

    /// Divisor applied to an action's duration for the given population.
    pub fn population_speedup(self, population: u32) -> f64 {
        let hands = population.max(1) as f64;
        match self {
            Category::Resource | Category::Military => 1.0,
            Category::Building => hands,
            Category::Research => hands.powf(RESEARCH_POPULATION_EXPONENT),
        }
    }

    pub fn population_output_multiplier(self, population: u32) -> f64 {
        if self.produces_each_tick() {
            population as f64
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlock {
    Always,
    Tech(&'static str),
}

impl Unlock {
    pub fn is_met(self, resources: &Resources) -> bool {
        match self {
            Unlock::Always => true,
            Unlock::Tech(id) => resources.has_tech(id),
        }
    }
}

pub struct EffectContext<'a> {
    pub action_id: &'a str,
    pub output: f64,
    pub season: Season,
}

pub type Effect = fn(&mut Resources, &EffectContext<'_>);

#[derive(Clone, Copy)]
pub struct ActionDef {
    pub id: &'static str,
    pub name: &'static str,
    pub skill: SkillKind,
    pub category: Category,
    /// Years at level zero, before population adjustments.
    pub base_duration: u32,
    /// Paid once, when the action starts.
    pub wood_cost: f64,
    pub unlock: Unlock,
    /// One-shot research that is skipped once researched.
    pub one_shot: bool,
    pub per_tick: Option<Effect>,
    pub on_complete: Option<Effect>,
}

impl ActionDef {
    /// Duration in whole years for a skill level and population. At least one.
    pub fn effective_duration(&self, skill_level: u32, population: u32) -> u32 {
        let years = self.base_duration as f64 * crate::skills::duration_multiplier(skill_level)
            / self.category.population_speedup(population);
        (years.ceil() as u32).max(1)
    }
}

impl std::fmt::Debug for ActionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDef")
            .field("id", &self.id)
            .field("category", &self.category)
            .field("base_duration", &self.base_duration)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TechBonus {
    pub tech: &'static str,
    pub action: &'static str,
    pub multiplier: f64,
}

const ACTIONS: &[ActionDef] = &[
    ActionDef {
        id: "farm",
        name: "Farm",
        skill: SkillKind::Farming,
        category: Category::Resource,
        base_duration: 1,
        wood_cost: 0.0,
        unlock: Unlock::Always,
        one_shot: false,
        per_tick: Some(farm),
        on_complete: None,
    },
    ActionDef {
        id: "gather_wood",
        name: "Gather Wood",
        skill: SkillKind::Building,
        category: Category::Resource,
        base_duration: 1,
        wood_cost: 0.0,
        unlock: Unlock::Always,
        one_shot: false,
        per_tick: Some(gather_wood),
        on_complete: None,
    },
    ActionDef {
        id: "preserve_food",
        name: "Preserve Food",
        skill: SkillKind::Farming,
        category: Category::Resource,
        base_duration: 1,
        wood_cost: 0.0,
        unlock: Unlock::Tech("research_preservation"),
        one_shot: false,
        per_tick: Some(preserve_food),
        on_complete: None,
    },
    ActionDef {
        id: "train_militia",
        name: "Train Militia",
        skill: SkillKind::Military,
        category: Category::Military,
        base_duration: 1,
        wood_cost: 0.0,
        unlock: Unlock::Always,
        one_shot: false,
        per_tick: Some(train_militia),
        on_complete: None,
    },
    ActionDef {
        id: "build_hut",
        name: "Build Hut",
        skill: SkillKind::Building,
        category: Category::Building,
        base_duration: 10,
        wood_cost: 10.0,
        unlock: Unlock::Always,
        one_shot: false,
        per_tick: None,
        on_complete: Some(finish_hut),
    },
    ActionDef {
        id: "build_granary",
        name: "Build Granary",
        skill: SkillKind::Building,
        category: Category::Building,
        base_duration: 15,
        wood_cost: 20.0,
        unlock: Unlock::Tech("research_agriculture"),
        one_shot: false,
        per_tick: None,
        on_complete: Some(finish_granary),
    },
    ActionDef {
        id: "build_wall",
        name: "Build Wall",
        skill: SkillKind::Building,
        category: Category::Building,
        base_duration: 20,
        wood_cost: 30.0,
        unlock: Unlock::Tech("research_masonry"),
        one_shot: false,
        per_tick: None,
        on_complete: Some(finish_wall),
    },
    ActionDef {
        id: "research_agriculture",
        name: "Research Agriculture",
        skill: SkillKind::Research,
        category: Category::Research,
        base_duration: 40,
        wood_cost: 0.0,
        unlock: Unlock::Always,
        one_shot: true,
        per_tick: None,
        on_complete: Some(finish_research),
    },
    ActionDef {
        id: "research_masonry",
        name: "Research Masonry",
        skill: SkillKind::Research,
        category: Category::Research,
        base_duration: 50,
        wood_cost: 0.0,
        unlock: Unlock::Always,
        one_shot: true,
        per_tick: None,
        on_complete: Some(finish_research),
    },
    ActionDef {
        id: "research_preservation",
        name: "Research Preservation",
        skill: SkillKind::Research,
        category: Category::Research,
        base_duration: 60,
        wood_cost: 0.0,
        unlock: Unlock::Tech("research_agriculture"),
        one_shot: true,
        per_tick: None,
        on_complete: Some(finish_preservation),
    },
    ActionDef {
        id: "research_bronze_working",
        name: "Research Bronze Working",
        skill: SkillKind::Research,
        category: Category::Research,
        base_duration: 80,
        wood_cost: 0.0,
        unlock: Unlock::Tech("research_masonry"),
        one_shot: true,
        per_tick: None,
        on_complete: Some(finish_research),
    },
];

const TECH_BONUSES: &[TechBonus] = &[
    TechBonus {
        tech: "research_agriculture",
        action: "farm",
        multiplier: 1.5,
    },
    TechBonus {
        tech: "research_masonry",
        action: "gather_wood",
        multiplier: 1.5,
    },
    TechBonus {
        tech: "research_bronze_working",
        action: "train_militia",
        multiplier: 1.5,
    },
];

const FARM_YIELD: f64 = 2.0;
const WOOD_YIELD: f64 = 0.5;
const PRESERVE_RATE: f64 = 1.0;
const MILITIA_YIELD: f64 = 0.5;
const HUT_CAPACITY: u32 = 5;
const GRANARY_CAPACITY: f64 = 100.0;
const WALL_DEFENSE: f64 = 10.0;
const PRESERVATION_STORAGE_BONUS: f64 = 1.25;

pub fn all() -> &'static [ActionDef] {
    ACTIONS
}

pub fn get_action_def(id: &str) -> Option<&'static ActionDef> {
    ACTIONS.iter().find(|def| def.id == id)
}

/// Product of every researched bonus that applies to `action_id`.
pub fn tech_multiplier<'a>(
    researched: impl IntoIterator<Item = &'a String>,
    action_id: &str,
) -> f64 {
    let mut multiplier = 1.0;
    for tech in researched {
        for bonus in TECH_BONUSES {
            if bonus.tech == tech.as_str() && bonus.action == action_id {
                multiplier *= bonus.multiplier;
            }
        }
    }
    multiplier
}

/// Ids of actions whose unlock condition the given resources satisfy.
pub fn newly_unlockable<'a>(
    resources: &'a Resources,
    already: &'a std::collections::BTreeSet<String>,
) -> impl Iterator<Item = &'static str> + 'a {
    ACTIONS
        .iter()
        .filter(move |def| !already.contains(def.id) && def.unlock.is_met(resources))
        .map(|def| def.id)
}

fn farm(resources: &mut Resources, ctx: &EffectContext<'_>) {
    if !ctx.season.winter {
        resources.food += FARM_YIELD * ctx.output;
    }
}

fn gather_wood(resources: &mut Resources, ctx: &EffectContext<'_>) {
    resources.wood += WOOD_YIELD * ctx.output;
}

fn preserve_food(resources: &mut Resources, ctx: &EffectContext<'_>) {
    let moved = resources.food.min(PRESERVE_RATE * ctx.output).max(0.0);
    resources.food -= moved;
    resources.preserved_food += moved;
}

fn train_militia(resources: &mut Resources, ctx: &EffectContext<'_>) {
    resources.military_strength += MILITIA_YIELD * ctx.output;
}

fn finish_hut(resources: &mut Resources, _ctx: &EffectContext<'_>) {
    resources.max_population += HUT_CAPACITY;
    resources.huts += 1;
}

fn finish_granary(resources: &mut Resources, _ctx: &EffectContext<'_>) {
    resources.food_storage += GRANARY_CAPACITY;
    resources.granaries += 1;
}

fn finish_wall(resources: &mut Resources, _ctx: &EffectContext<'_>) {
    resources.wall_defense += WALL_DEFENSE;
    resources.walls += 1;
}

fn finish_research(resources: &mut Resources, ctx: &EffectContext<'_>) {
    resources.researched_techs.insert(ctx.action_id.to_string());
}

fn finish_preservation(resources: &mut Resources, ctx: &EffectContext<'_>) {
    finish_research(resources, ctx);
    resources.food_storage *= PRESERVATION_STORAGE_BONUS;
}
