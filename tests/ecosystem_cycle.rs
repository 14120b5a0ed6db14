use gutflora::{
    colony::POPULATION_FLOOR,
    scenario::{Scenario, ScenarioLoader},
    Ecosystem,
};

fn fixture() -> Ecosystem {
    ScenarioLoader::new(".")
        .load("scenarios/two_colonies.yaml")
        .expect("scenario should load")
        .build_ecosystem()
        .expect("ecosystem builds")
}

fn speed_scenario(speed_one: f64, speed_two: f64) -> Ecosystem {
    let text = format!(
        r#"
name: speeds
seed: 11
components: [comp-01]
foods: [food-01]
chemicals: [chem-01]
food_profile:
  food-01: {{ comp-01: 100 }}
chemical_profile:
  chem-01: {{ kick: 1.0 }}
host:
  resilience: {{ chem-01: 10 }}
colonies:
  - id: 1
    speed: {speed_one}
    likes: {{ comp-01: 1.0 }}
    produces: [chem-01]
  - id: 2
    speed: {speed_two}
    likes: {{ comp-01: 1.0 }}
    produces: [chem-01]
"#
    );
    Scenario::from_yaml(&text)
        .expect("valid scenario")
        .build_ecosystem()
        .expect("ecosystem builds")
}

#[test]
fn host_decides_once_per_interval() {
    let mut ecosystem = fixture();
    assert_eq!(ecosystem.host().eat_timer(), 10);
    assert_eq!(ecosystem.host().exploration(), 1.0);

    for tick in 0..10 {
        let outcome = ecosystem.step().expect("step");
        assert_eq!(outcome.tick, tick);
        assert!(outcome.host_action.is_none());
        assert!(outcome.host_reward.is_none());
    }
    assert_eq!(ecosystem.host().eat_timer(), 0);
    assert_eq!(ecosystem.host().exploration(), 1.0);
    assert!(ecosystem.host().food().is_empty());

    let outcome = ecosystem.step().expect("step");
    assert_eq!(outcome.tick, 10);
    let action = outcome.host_action.expect("host eats on tick 10");
    assert!(action < 5);
    assert!(outcome.host_reward.is_some());
    assert!((ecosystem.host().exploration() - 0.99).abs() < 1e-12);
    assert_eq!(ecosystem.host().eat_timer(), 9);
    assert_eq!(ecosystem.host().food().total(), 1.0);

    for _ in 0..9 {
        assert!(ecosystem.step().expect("step").host_action.is_none());
    }
    assert!(ecosystem.step().expect("step").host_action.is_some());
}

#[test]
fn faster_colonies_act_first() {
    let mut ecosystem = speed_scenario(1.0, 5.0);
    ecosystem.step().expect("step");
    let order: Vec<u32> = ecosystem.colonies().iter().map(|c| c.id()).collect();
    assert_eq!(order, vec![2, 1]);
}

#[test]
fn equal_speeds_keep_their_order() {
    let mut ecosystem = speed_scenario(2.0, 2.0);
    for _ in 0..3 {
        ecosystem.step().expect("step");
        let order: Vec<u32> = ecosystem.colonies().iter().map(|c| c.id()).collect();
        assert_eq!(order, vec![1, 2]);
    }
}

#[test]
fn pools_and_populations_stay_bounded() {
    let mut ecosystem = fixture();
    for _ in 0..300 {
        ecosystem.step().expect("step");
        let host = ecosystem.host();
        for pool in [host.food(), host.components(), host.chemicals()] {
            assert!(pool.iter().all(|(_, amount)| amount >= 0.0));
        }
        for colony in ecosystem.colonies() {
            assert!(colony.population() >= POPULATION_FLOOR);
            assert!(colony.population().is_finite());
        }
    }
}

#[test]
fn same_seed_gives_identical_runs() {
    let mut first = fixture();
    let mut second = fixture();
    for _ in 0..120 {
        first.step().expect("step");
        second.step().expect("step");
        assert_eq!(first.record(), second.record());
    }
}
