use gutflora::{
    scenario::ScenarioLoader,
    state::StateVector,
};
use tempfile::tempdir;

#[test]
fn saved_host_model_reloads_through_scenario() {
    let mut scenario = ScenarioLoader::new(".")
        .load("scenarios/two_colonies.yaml")
        .expect("scenario should load");
    let mut ecosystem = scenario.build_ecosystem().expect("ecosystem builds");
    for _ in 0..30 {
        ecosystem.step().expect("step");
    }

    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("host.json");
    let trained = ecosystem.host().learner().policy();
    trained.save(&path).expect("model saved");

    scenario.host.policy.model_path = Some(path);
    let reloaded = scenario.build_ecosystem().expect("reloaded ecosystem");

    let sample = StateVector::from_rows(vec![vec![1.0, 0.5, 0.0, 2.0, 0.25]]).expect("one row");
    let before = trained.values(&sample).expect("values");
    let after = reloaded
        .host()
        .learner()
        .policy()
        .values(&sample)
        .expect("values");
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn model_for_other_catalog_is_rejected() {
    let mut scenario = ScenarioLoader::new(".")
        .load("scenarios/two_colonies.yaml")
        .expect("scenario should load");
    let ecosystem = scenario.build_ecosystem().expect("ecosystem builds");
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("colony.json");
    // colony 1 reads 4 components and has 2 actions; the host needs 5 and 5
    ecosystem
        .colony(1)
        .and_then(|colony| colony.learner())
        .expect("colony 1 learns")
        .policy()
        .save(&path)
        .expect("model saved");

    scenario.host.policy.model_path = Some(path);
    assert!(matches!(
        scenario.build_ecosystem(),
        Err(gutflora::SimError::ModelIncompatible { .. })
    ));
}
