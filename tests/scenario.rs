use std::path::PathBuf;

use civloop::{
    queue::{get_queue_logical_size, is_infinite, Repeat},
    scenario::ScenarioLoader,
    session::Command,
    world::RunStatus,
};

fn scenario_loader() -> ScenarioLoader {
    ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"))
}

fn scenario_path(file: &str) -> PathBuf {
    PathBuf::from("scenarios").join(file)
}

#[test]
fn scenario_loader_reads_fixtures() {
    let loader = scenario_loader();
    for file in ["farmers.yaml", "militia.yaml", "frontier.yaml"] {
        let scenario = loader.load(scenario_path(file)).expect("scenario parses");
        let queue = scenario.build_queue().unwrap();
        assert!(!queue.is_empty(), "{file}");
        assert!(is_infinite(&queue), "{file} should end in a forever entry");
    }
}

#[test]
fn frontier_groups_are_numbered_in_order() {
    let scenario = scenario_loader()
        .load(scenario_path("frontier.yaml"))
        .unwrap();
    assert_eq!(scenario.name, "frontier");
    assert!(scenario.description.is_some());

    let queue = scenario.build_queue().unwrap();
    let groups: Vec<_> = queue.iter().filter_map(|entry| entry.group).collect();
    assert_eq!(groups.len(), 4);
    assert_eq!(groups[0].id, 1);
    assert_eq!(groups[0].repeat, 3);
    assert_eq!(groups[3].id, 2);
    assert_eq!(groups[3].repeat, 30);
    assert_eq!(queue.last().unwrap().repeat, Repeat::Forever);

    // Everything before the final forever entry is finite.
    let finite = &queue[..queue.len() - 1];
    assert_eq!(
        get_queue_logical_size(finite),
        Some(10 + 1 + 12 + 6 + 10 + 1 + 3 * 6 + 1 + 15 + 1 + 30 * 4)
    );
}

#[test]
fn missing_scenarios_report_the_path() {
    let err = scenario_loader()
        .load(scenario_path("atlantis.yaml"))
        .unwrap_err();
    assert!(format!("{err:#}").contains("atlantis.yaml"));
}

#[test]
fn sessions_from_scenarios_can_start() {
    let scenario = scenario_loader()
        .load(scenario_path("militia.yaml"))
        .unwrap();
    let session = scenario.build_session().unwrap();
    assert_eq!(session.state.run.status, RunStatus::Idle);
    assert_eq!(session.next_entry_id, 4);

    let started = session.apply(Command::Start);
    assert_eq!(started.state.run.status, RunStatus::Running);
    assert_eq!(started.advance().state.run.year, 1);
}
