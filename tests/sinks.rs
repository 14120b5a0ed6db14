use std::fs;

use gutflora::{
    engine::{EngineBuilder, EngineSettings},
    log::CsvLog,
    record::TickRecord,
    scenario::ScenarioLoader,
    snapshot::SnapshotWriter,
};
use tempfile::tempdir;

#[test]
fn csv_log_has_header_and_one_row_per_tick() {
    let scenario = ScenarioLoader::new(".")
        .load("scenarios/two_colonies.yaml")
        .expect("scenario should load");
    let mut ecosystem = scenario.build_ecosystem().expect("ecosystem builds");
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("run.csv");

    let columns = TickRecord::columns(&ecosystem);
    let log = CsvLog::create(&path, &ecosystem).expect("log created");
    let mut engine = EngineBuilder::new(EngineSettings {
        scenario_name: scenario.name.clone(),
    })
    .with_sink(log)
    .build();
    engine.run(&mut ecosystem, 5).expect("run succeeds");

    let text = fs::read_to_string(&path).expect("log readable");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], columns.join(","));
    assert!(lines[0].starts_with("tick,colony_1_id,colony_1_population,colony_1_speed"));
    assert!(lines[0].ends_with("chem-05,eat_timer,exploration,host_reward"));
    for (tick, line) in lines[1..].iter().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), columns.len());
        assert_eq!(fields[0], tick.to_string());
        assert_eq!(fields[1], "1");
    }
}

#[test]
fn snapshot_writer_respects_interval() {
    let scenario = ScenarioLoader::new(".")
        .load("scenarios/two_colonies.yaml")
        .expect("scenario should load");
    let mut ecosystem = scenario.build_ecosystem().expect("ecosystem builds");
    let temp = tempdir().expect("tempdir");

    let mut engine = EngineBuilder::new(EngineSettings {
        scenario_name: scenario.name.clone(),
    })
    .with_sink(SnapshotWriter::new(temp.path(), 2, &scenario.name))
    .build();
    engine.run(&mut ecosystem, 5).expect("run succeeds");

    let dir = temp.path().join("two_colonies");
    let mut files: Vec<String> = fs::read_dir(&dir)
        .expect("snapshot dir exists")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["tick_000002.json", "tick_000004.json"]);

    let text = fs::read_to_string(dir.join("tick_000004.json")).expect("snapshot readable");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["scenario"], "two_colonies");
    assert_eq!(value["record"]["tick"], 4);
    assert!(value["written_at"].is_string());
}
