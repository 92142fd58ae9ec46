use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use civloop::{
    config::SessionConfig,
    preview::simulate_queue_preview,
    runtime::{self, RuntimeOptions},
    scenario::ScenarioLoader,
    session::{Command, Session},
    snapshot::{self, SnapshotWriter},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Idle civilization loop simulator")]
struct Cli {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Play a queue plan live, one year per tick
    Run {
        /// Path to the scenario YAML file
        #[arg(long, default_value = "scenarios/frontier.yaml")]
        scenario: PathBuf,

        /// Path to the session config
        #[arg(long, default_value = "civloop.yaml")]
        config: PathBuf,

        /// Stop after this many ticks
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Override the tick interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Continue from the save file instead of starting fresh
        #[arg(long)]
        resume: bool,
    },
    /// Project a whole run of a queue plan from a fresh start
    Preview {
        /// Path to the scenario YAML file
        #[arg(long, default_value = "scenarios/frontier.yaml")]
        scenario: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");

    match cli.command {
        Mode::Run {
            scenario,
            config,
            max_ticks,
            interval_ms,
            resume,
        } => {
            let config = SessionConfig::load_or_default(&config)?;
            init_tracing(&config.logging.level);

            let mut session = if resume {
                snapshot::load_snapshot(&config.save.path)
                    .with_context(|| {
                        format!("Failed to resume from {}", config.save.path.display())
                    })?
                    .into_session()
            } else {
                let plan = loader.load(&scenario)?;
                info!(scenario = %plan.name, "loaded scenario");
                plan.build_session()?
            };
            for kind in &config.auto_dismiss {
                session = session.apply(Command::SetAutoDismiss {
                    kind: *kind,
                    enabled: true,
                });
            }
            // No-ops unless the run is idle or was saved while paused.
            session = session.apply(Command::Start).apply(Command::Resume);

            let options = RuntimeOptions {
                tick_interval: Duration::from_millis(
                    interval_ms.unwrap_or(config.tick_interval_ms).max(1),
                ),
                max_ticks,
                max_runs: config.max_runs,
            };
            let writer = SnapshotWriter::new(&config.save.path, config.save.autosave_every_ticks);
            let (session, reason) = runtime::run_live(session, options, Some(writer)).await;

            let run = &session.state.run;
            println!(
                "Stopped ({reason:?}) in year {} after {} finished runs. Population {}, food {:.0}, military {:.0}.",
                run.year,
                session.total_runs,
                run.resources.population,
                run.resources.food.floor(),
                run.resources.military_strength.floor()
            );
            if let Some(reason) = &run.collapse_reason {
                println!("Collapse: {reason}");
            }
        }
        Mode::Preview { scenario, json } => {
            init_tracing("warn");
            let plan = loader.load(&scenario)?;
            let queue = plan.build_queue()?;
            let result =
                simulate_queue_preview(&queue, Session::new().skills(), plan.repeat_last_action);
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                let outcome = if result.victory {
                    "victory".to_string()
                } else if result.collapsed {
                    format!(
                        "collapse while running {}",
                        result.collapse_action_id.as_deref().unwrap_or("nothing")
                    )
                } else {
                    "queue exhausted".to_string()
                };
                println!(
                    "Scenario '{}': {} after {} years. Population {}/{}, food {:.0}, wood {:.0}, defense {:.0}, spoiled {:.0}.",
                    plan.name,
                    outcome,
                    result.years_used,
                    result.resources.population,
                    result.resources.max_population,
                    result.resources.food.floor(),
                    result.resources.wood.floor(),
                    result.resources.total_defense().floor(),
                    result.food_spoiled.floor()
                );
            }
        }
    }
    Ok(())
}
