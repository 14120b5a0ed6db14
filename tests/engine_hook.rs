use gutflora::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
};

#[test]
fn engine_runs_hook_each_tick() {
    let loader = ScenarioLoader::new(".");
    let scenario = loader
        .load("scenarios/two_colonies.yaml")
        .expect("scenario should load");
    let mut ecosystem = scenario.build_ecosystem().expect("ecosystem builds");
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
    };
    let mut engine = EngineBuilder::new(settings).build();

    let mut ticks = Vec::new();
    let summary = engine
        .run_with_hook(&mut ecosystem, 25, |record| ticks.push(record.tick))
        .expect("run succeeds");

    assert_eq!(ticks.len(), 25);
    assert_eq!(ticks.first().copied(), Some(0));
    assert_eq!(ticks.last().copied(), Some(24));
    assert_eq!(ecosystem.tick(), 25);

    // eat interval 10: meals on ticks 10 and 20
    assert_eq!(summary.ticks, 25);
    assert_eq!(summary.meals, 2);
    assert!(summary.cumulative_host_reward.is_finite());
    let ids: Vec<u32> = summary.final_populations.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![1, 2]);
}
