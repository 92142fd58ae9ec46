use tracing::debug;

use crate::{
    catalog::{self, ActionDef, EffectContext},
    engine::{EffectSink, System, SystemContext, TickWorld},
    rules, skills,
    world::{RunState, RunStatus, Severity},
};

/// Works one year on the active queue entry.
pub struct ActionSystem;

impl ActionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ActionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ActionSystem {
    fn name(&self) -> &str {
        "actions"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut TickWorld<'_>, sink: &mut dyn EffectSink) {
        let run = &mut *world.run;
        // Starvation emptied the settlement; bookkeeping ends the run.
        if run.resources.population == 0 {
            return;
        }
        let Some(index) = run.active_index() else {
            run.status = RunStatus::Paused;
            sink.log(
                ctx.year,
                Severity::Info,
                "The queue is empty. Waiting for new orders.".to_string(),
            );
            return;
        };

        let Some(def) = catalog::get_action_def(&run.queue[index].action_id) else {
            debug!(action = %run.queue[index].action_id, "skipping unknown action");
            advance(run);
            return;
        };

        if run.current_action_progress == 0 {
            if let Some(reason) = skip_reason(def, run) {
                sink.log(ctx.year, Severity::Warning, reason);
                run.stats.actions_skipped += 1;
                advance(run);
                return;
            }
            run.resources.wood -= def.wood_cost;
        }

        let level = world.skills.level(def.skill);
        let population = run.resources.population;
        let duration = def.effective_duration(level, population);
        let effect_ctx = EffectContext {
            action_id: def.id,
            output: skills::output_multiplier(level)
                * catalog::tech_multiplier(&run.resources.researched_techs, def.id)
                * def.category.population_output_multiplier(population),
            season: ctx.season,
        };

        if let Some(effect) = def.per_tick {
            effect(&mut run.resources, &effect_ctx);
        }

        if world.skills.award(def.skill, rules::XP_PER_TICK) > 0 {
            sink.log(
                ctx.year,
                Severity::Success,
                format!(
                    "{} skill reached level {}",
                    def.skill.name(),
                    world.skills.level(def.skill)
                ),
            );
        }

        run.current_action_progress += 1;
        if run.current_action_progress >= duration {
            if let Some(effect) = def.on_complete {
                effect(&mut run.resources, &effect_ctx);
                sink.log(ctx.year, Severity::Success, format!("Completed {}", def.name));
            }
            run.stats.actions_completed += 1;
            advance(run);
        }
    }
}

/// Why an action cannot start this year, if it cannot.
fn skip_reason(def: &ActionDef, run: &RunState) -> Option<String> {
    if def.one_shot && run.resources.has_tech(def.id) {
        return Some(format!("{} is already researched, skipping", def.name));
    }
    if run.resources.wood < def.wood_cost {
        return Some(format!(
            "Not enough wood for {}: need {:.0}, have {:.0}",
            def.name,
            def.wood_cost,
            run.resources.wood.floor()
        ));
    }
    None
}

fn advance(run: &mut RunState) {
    run.current_action_progress = 0;
    run.current_queue_index += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::SilentSink,
        queue::{QueueEntry, Repeat},
        rules::Season,
        skills::{SkillKind, Skills},
    };

    fn run_year(run: &mut RunState, skills: &mut Skills, year: u32) {
        let ctx = SystemContext {
            year,
            season: Season::for_year(year),
        };
        let mut world = TickWorld { run, skills };
        ActionSystem::new().run(&ctx, &mut world, &mut SilentSink);
    }

    fn running(queue: Vec<QueueEntry>) -> RunState {
        let mut run = RunState::with_queue(queue);
        run.status = RunStatus::Running;
        run
    }

    #[test]
    fn farming_scales_with_population_and_trains_the_skill() {
        let mut run = running(vec![QueueEntry::new(1, "farm", Repeat::Times(3))]);
        let mut skills = Skills::default();
        run_year(&mut run, &mut skills, 1);
        assert_eq!(run.resources.food, 100.0 + 2.0 * 5.0);
        assert_eq!(run.current_queue_index, 1);
        assert_eq!(skills.get(SkillKind::Farming).xp, rules::XP_PER_TICK);
    }

    #[test]
    fn missing_wood_skips_without_spending_a_year_of_effect() {
        let mut run = running(vec![
            QueueEntry::new(1, "build_hut", Repeat::Times(1)),
            QueueEntry::new(2, "farm", Repeat::Forever),
        ]);
        let mut skills = Skills::default();
        run_year(&mut run, &mut skills, 1);
        assert_eq!(run.current_queue_index, 1);
        assert_eq!(run.current_action_progress, 0);
        assert_eq!(run.stats.actions_skipped, 1);
        assert_eq!(run.resources.max_population, 10);
        assert_eq!(skills, Skills::default());
    }

    #[test]
    fn building_pays_once_and_completes() {
        let mut run = running(vec![QueueEntry::new(1, "build_hut", Repeat::Times(1))]);
        run.resources.wood = 15.0;
        let mut skills = Skills::default();
        // Five people build a ten year hut in two years.
        run_year(&mut run, &mut skills, 1);
        assert_eq!(run.resources.wood, 5.0);
        assert_eq!(run.current_action_progress, 1);
        run_year(&mut run, &mut skills, 2);
        assert_eq!(run.resources.wood, 5.0);
        assert_eq!(run.resources.max_population, 15);
        assert_eq!(run.resources.huts, 1);
        assert_eq!(run.current_queue_index, 1);
        assert_eq!(run.stats.actions_completed, 1);
    }

    #[test]
    fn researched_techs_are_skipped() {
        let mut run = running(vec![QueueEntry::new(1, "research_masonry", Repeat::Times(1))]);
        run.resources
            .researched_techs
            .insert("research_masonry".to_string());
        let mut skills = Skills::default();
        run_year(&mut run, &mut skills, 1);
        assert_eq!(run.current_queue_index, 1);
        assert_eq!(run.stats.actions_skipped, 1);
    }

    #[test]
    fn exhausted_queue_pauses_unless_repeating_last() {
        let mut run = running(Vec::new());
        let mut skills = Skills::default();
        run_year(&mut run, &mut skills, 1);
        assert_eq!(run.status, RunStatus::Paused);

        let mut run = running(vec![QueueEntry::new(1, "gather_wood", Repeat::Times(1))]);
        run.repeat_last_action = true;
        run_year(&mut run, &mut skills, 1);
        run_year(&mut run, &mut skills, 2);
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.resources.wood, 5.0);
    }

    #[test]
    fn an_empty_settlement_does_no_work() {
        let mut run = running(vec![QueueEntry::new(1, "train_militia", Repeat::Forever)]);
        run.resources.population = 0;
        let mut skills = Skills::default();
        run_year(&mut run, &mut skills, 1);
        assert_eq!(skills, Skills::default());
        assert_eq!(run.resources.military_strength, 0.0);
        assert_eq!(run.current_queue_index, 0);
    }

    #[test]
    fn unknown_actions_are_passed_over() {
        let mut run = running(vec![QueueEntry::new(1, "summon_dragon", Repeat::Times(2))]);
        let mut skills = Skills::default();
        run_year(&mut run, &mut skills, 1);
        assert_eq!(run.current_queue_index, 1);
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.stats.actions_skipped, 0);
    }
}
