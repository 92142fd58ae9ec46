use tracing::info;

use crate::{
    engine::{EffectSink, System, SystemContext, TickWorld},
    rules,
    skills::SkillKind,
    world::{Disaster, EventKind, EventPopup, RunStatus, Severity},
};

/// Scripted events on the fixed timeline.
pub struct EventSystem;

impl EventSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EventSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for EventSystem {
    fn name(&self) -> &str {
        "events"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut TickWorld<'_>, sink: &mut dyn EffectSink) {
        if world.run.status.is_terminal() {
            return;
        }
        if ctx.season.raider_year {
            raiders(ctx, world, sink);
        }
        if ctx.year == rules::WINTER_START_YEAR {
            sink.disaster_encountered(Disaster::LongWinter);
            sink.log(
                ctx.year,
                Severity::Warning,
                "The long winter has begun. Fields lie frozen and food runs out twice as fast."
                    .to_string(),
            );
            raise(
                ctx,
                world,
                sink,
                EventKind::WinterStarted,
                "The Long Winter",
                "Snow covers the fields. Farming yields nothing until the thaw.",
            );
        }
        if ctx.year == rules::WINTER_END_YEAR {
            let resources = &world.run.resources;
            if resources.population > 0 && resources.food > 0.0 {
                sink.log(
                    ctx.year,
                    Severity::Success,
                    format!(
                        "The long winter is over. {} people survived it.",
                        resources.population
                    ),
                );
                raise(
                    ctx,
                    world,
                    sink,
                    EventKind::WinterEnded,
                    "The Thaw",
                    "The long winter has ended and the fields can be worked again.",
                );
            }
        }
    }
}

fn raiders(ctx: &SystemContext, world: &mut TickWorld<'_>, sink: &mut dyn EffectSink) {
    sink.disaster_encountered(Disaster::Raiders);
    let run = &mut *world.run;
    let defense = run.resources.total_defense();

    if defense < rules::RAIDER_DEFENSE_THRESHOLD {
        let reason = format!(
            "Raiders overran the settlement: total defense {:.0} against the {:.0} needed, a shortfall of {:.0}",
            defense.floor(),
            rules::RAIDER_DEFENSE_THRESHOLD,
            (rules::RAIDER_DEFENSE_THRESHOLD - defense).ceil()
        );
        info!(year = ctx.year, defense, "raiders won");
        sink.log(ctx.year, Severity::Danger, reason.clone());
        run.status = RunStatus::Collapsed;
        run.collapse_reason = Some(reason);
        return;
    }

    run.resources.food += rules::RAIDER_REWARD_FOOD;
    run.resources.wood += rules::RAIDER_REWARD_WOOD;
    world.skills.award(SkillKind::Military, rules::RAIDER_XP_BONUS);
    sink.log(
        ctx.year,
        Severity::Success,
        format!(
            "Raiders were driven off. Plundered {:.0} food and {:.0} wood from their camp.",
            rules::RAIDER_REWARD_FOOD,
            rules::RAIDER_REWARD_WOOD
        ),
    );
    raise(
        ctx,
        world,
        sink,
        EventKind::RaiderVictory,
        "Raiders Repelled",
        "Your defenders held the line and the raiders fled.",
    );
}

/// Hand a popup to the sink and pause a running run if it asks to.
fn raise(
    ctx: &SystemContext,
    world: &mut TickWorld<'_>,
    sink: &mut dyn EffectSink,
    kind: EventKind,
    title: &str,
    message: &str,
) {
    let pauses = sink.popup(EventPopup {
        kind,
        year: ctx.year,
        title: title.to_string(),
        message: message.to_string(),
    });
    if pauses && world.run.status == RunStatus::Running {
        world.run.status = RunStatus::Paused;
    }
}
