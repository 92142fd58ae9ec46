use tracing::info;

use crate::{
    engine::{EffectSink, System, SystemContext, TickWorld},
    world::{RunState, RunStatus, Severity},
};

pub const DEPOPULATED_REASON: &str = "The last of your people have perished.";

/// End-of-year clamping and terminal checks.
pub struct BookkeepingSystem;

impl BookkeepingSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BookkeepingSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for BookkeepingSystem {
    fn name(&self) -> &str {
        "bookkeeping"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut TickWorld<'_>, sink: &mut dyn EffectSink) {
        let run = &mut *world.run;
        run.resources.clamp_non_negative();

        if run.resources.population == 0 {
            info!(year = ctx.year, "settlement depopulated");
            sink.log(ctx.year, Severity::Danger, DEPOPULATED_REASON.to_string());
            run.status = RunStatus::Collapsed;
            run.collapse_reason = Some(DEPOPULATED_REASON.to_string());
            return;
        }

        if run.status == RunStatus::Running && run.year >= run.max_year {
            declare_victory(run, sink);
        }
    }
}

pub(crate) fn declare_victory(run: &mut RunState, sink: &mut dyn EffectSink) {
    info!(year = run.year, "run reached victory");
    sink.log(
        run.year,
        Severity::Success,
        format!("Your civilization endured {} years.", run.year),
    );
    run.status = RunStatus::Victory;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::SilentSink, rules::Season, skills::Skills};

    fn close_year(run: &mut RunState) {
        let ctx = SystemContext {
            year: run.year,
            season: Season::for_year(run.year),
        };
        let mut skills = Skills::default();
        let mut world = TickWorld {
            run,
            skills: &mut skills,
        };
        BookkeepingSystem::new().run(&ctx, &mut world, &mut SilentSink);
    }

    #[test]
    fn depopulation_overrides_other_outcomes() {
        let mut run = RunState::new();
        run.year = 50;
        run.status = RunStatus::Collapsed;
        run.collapse_reason = Some("raiders".into());
        run.resources.population = 0;
        close_year(&mut run);
        assert_eq!(run.status, RunStatus::Collapsed);
        assert_eq!(run.collapse_reason.as_deref(), Some(DEPOPULATED_REASON));
    }

    #[test]
    fn reaching_the_last_year_is_a_victory() {
        let mut run = RunState::new();
        run.status = RunStatus::Running;
        run.year = run.max_year;
        run.resources.wood = -3.0;
        close_year(&mut run);
        assert_eq!(run.status, RunStatus::Victory);
        assert_eq!(run.resources.wood, 0.0);
    }

    #[test]
    fn paused_runs_do_not_win() {
        let mut run = RunState::new();
        run.status = RunStatus::Paused;
        run.year = run.max_year;
        close_year(&mut run);
        assert_eq!(run.status, RunStatus::Paused);
    }
}
