use crate::{
    engine::{EffectSink, System, SystemContext, TickWorld},
    rules,
    world::{Resources, Severity},
};

/// Consumption, starvation, spoilage and growth, in that order.
pub struct PopulationSystem;

impl PopulationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PopulationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for PopulationSystem {
    fn name(&self) -> &str {
        "population"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut TickWorld<'_>, sink: &mut dyn EffectSink) {
        let run = &mut *world.run;
        let food_per_pop = ctx.season.food_per_pop();

        let deaths = consume(&mut run.resources, food_per_pop);
        if deaths > 0 {
            run.stats.starvation_deaths += deaths;
            sink.log(
                ctx.year,
                Severity::Danger,
                format!("Famine: {deaths} people starved"),
            );
        }

        run.stats.food_spoiled += spoil(&mut run.resources);

        if !ctx.season.winter {
            grow(&mut run.resources, food_per_pop);
        }
    }
}

/// Eat a year's food. Shortfalls are drawn from preserved food, then paid in
/// lives: two units of missing food per death. Returns the deaths.
fn consume(resources: &mut Resources, food_per_pop: f64) -> u32 {
    resources.food -= resources.population as f64 * food_per_pop;
    if resources.food >= 0.0 {
        return 0;
    }

    let drawn = resources.preserved_food.min(-resources.food);
    resources.preserved_food -= drawn;
    resources.food += drawn;
    if resources.food >= 0.0 {
        return 0;
    }

    let deficit = -resources.food;
    let deaths = ((deficit / 2.0).ceil() as u32).min(resources.population);
    resources.population -= deaths;
    resources.food = 0.0;
    deaths
}

fn spoil(resources: &mut Resources) -> f64 {
    if resources.food <= 0.0 || resources.food_storage <= 0.0 {
        return 0.0;
    }
    let spoiled = (resources.food * resources.food / (rules::SPOILAGE_K * resources.food_storage))
        .min(resources.food);
    resources.food -= spoiled;
    spoiled
}

fn grow(resources: &mut Resources, food_per_pop: f64) {
    let needed = resources.population as f64 * food_per_pop + rules::GROWTH_SURPLUS;
    if resources.population < resources.max_population && resources.food > needed {
        resources.population += 1;
    }
}
