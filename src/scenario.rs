use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    colony::{Colony, ColonyParams},
    ecosystem::Ecosystem,
    error::SimError,
    host::{Host, HostParams},
    learner::Learner,
    policy::{Policy, PolicyConfig},
    rng::RngManager,
    state::ObservationMode,
    substance::{Catalog, ChemicalTraits, FoodComposition, Pool},
};

fn default_eat_interval() -> u32 {
    10
}

fn default_food_consume_rate() -> f64 {
    1.0
}

fn default_chemical_decay_rate() -> f64 {
    0.01
}

fn default_population() -> f64 {
    100.0
}

fn default_one() -> f64 {
    1.0
}

fn default_eat_rate() -> f64 {
    0.01
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("scenario parse error: {0}")]
    Parse(String),
    #[error("scenario validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    #[serde(default)]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub observation: ObservationMode,
    pub components: Vec<String>,
    pub foods: Vec<String>,
    pub chemicals: Vec<String>,
    pub food_profile: BTreeMap<String, FoodComposition>,
    pub chemical_profile: BTreeMap<String, ChemicalTraits>,
    pub host: HostConfig,
    #[serde(default)]
    pub colonies: Vec<ColonyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Initial amounts; must be finite and non-negative.
    #[serde(default)]
    pub food: BTreeMap<String, f64>,
    #[serde(default)]
    pub components: BTreeMap<String, f64>,
    #[serde(default)]
    pub chemicals: BTreeMap<String, f64>,
    pub resilience: BTreeMap<String, f64>,
    #[serde(default = "default_eat_interval")]
    pub eat_interval: u32,
    #[serde(default = "default_food_consume_rate")]
    pub food_consume_rate: f64,
    #[serde(default = "default_chemical_decay_rate")]
    pub chemical_decay_rate: f64,
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColonyConfig {
    pub id: u32,
    #[serde(default = "default_population")]
    pub population: f64,
    #[serde(default)]
    pub likes: BTreeMap<String, f64>,
    #[serde(default)]
    pub produces: Vec<String>,
    #[serde(default)]
    pub inducers: BTreeMap<String, f64>,
    #[serde(default = "default_one")]
    pub production_rate: f64,
    #[serde(default = "default_eat_rate")]
    pub eat_rate: f64,
    #[serde(default = "default_one")]
    pub speed: f64,
    #[serde(default = "default_one")]
    pub production_boost: f64,
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
}

/// Host-side knobs tuned by the hyper-parameter search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hyperparameters {
    pub eat_interval: u32,
    pub learning_rate: f64,
    pub alpha: f64,
    pub gamma: f64,
    pub exploration_decay: f64,
}

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario = Scenario::from_yaml(&data)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        debug!(
            scenario = %scenario.name,
            colonies = scenario.colonies.len(),
            "scenario loaded"
        );
        Ok(scenario)
    }
}

impl Scenario {
    /// Parses and validates a scenario document.
    pub fn from_yaml(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario =
            serde_yaml::from_str(text).map_err(|err| ScenarioError::Parse(err.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        for (label, names) in [
            ("components", &self.components),
            ("foods", &self.foods),
            ("chemicals", &self.chemicals),
        ] {
            if names.is_empty() {
                return invalid(format!("scenario must list at least one of {label}"));
            }
            let unique: BTreeSet<&String> = names.iter().collect();
            if unique.len() != names.len() {
                return invalid(format!("{label} contain a duplicate name"));
            }
        }

        for food in &self.foods {
            let Some(composition) = self.food_profile.get(food) else {
                return invalid(format!("food {food} has no profile"));
            };
            for component in composition.keys() {
                self.require_component(component, &format!("food {food}"))?;
            }
        }
        for food in self.food_profile.keys() {
            if !self.foods.contains(food) {
                return invalid(format!("food profile names unknown food {food}"));
            }
        }

        for chemical in &self.chemicals {
            if !self.chemical_profile.contains_key(chemical) {
                return invalid(format!("chemical {chemical} has no kick"));
            }
            match self.host.resilience.get(chemical) {
                None => return invalid(format!("chemical {chemical} has no host resilience")),
                Some(value) if *value == 0.0 => {
                    return invalid(format!("chemical {chemical} has zero host resilience"))
                }
                Some(_) => {}
            }
        }
        for chemical in self
            .chemical_profile
            .keys()
            .chain(self.host.resilience.keys())
        {
            self.require_chemical(chemical, "chemical tables")?;
        }

        for (pool, amounts) in [
            ("food", &self.host.food),
            ("components", &self.host.components),
            ("chemicals", &self.host.chemicals),
        ] {
            if let Some((name, amount)) = amounts
                .iter()
                .find(|(_, amount)| !amount.is_finite() || **amount < 0.0)
            {
                return invalid(format!(
                    "host {pool} amount for {name} must be finite and non-negative, got {amount}"
                ));
            }
        }
        for food in self.host.food.keys() {
            if !self.foods.contains(food) {
                return invalid(format!("host food names unknown food {food}"));
            }
        }
        for component in self.host.components.keys() {
            self.require_component(component, "host components")?;
        }
        for chemical in self.host.chemicals.keys() {
            self.require_chemical(chemical, "host chemicals")?;
        }

        if self.host.eat_interval == 0 {
            return invalid("host eat_interval must be at least 1".to_string());
        }
        let decay = self.host.chemical_decay_rate;
        if decay.is_nan() || decay <= 0.0 || decay > 1.0 {
            return invalid(format!("host chemical_decay_rate must lie in (0, 1], got {decay}"));
        }
        self.host
            .policy
            .validate()
            .map_err(|err| ScenarioError::Validation(format!("host policy: {err}")))?;

        let mut ids = BTreeSet::new();
        for colony in &self.colonies {
            let owner = format!("colony {}", colony.id);
            if !ids.insert(colony.id) {
                return invalid(format!("colony id {} defined more than once", colony.id));
            }
            if colony.eat_rate.is_nan() || colony.eat_rate <= 0.0 {
                return invalid(format!("{owner} eat_rate must be positive"));
            }
            for component in colony.likes.keys() {
                self.require_component(component, &owner)?;
            }
            for chemical in colony.produces.iter().chain(colony.inducers.keys()) {
                self.require_chemical(chemical, &owner)?;
            }
            if let Some(policy) = &colony.policy {
                if colony.produces.is_empty() {
                    return invalid(format!("{owner} has a policy but produces nothing"));
                }
                policy
                    .validate()
                    .map_err(|err| ScenarioError::Validation(format!("{owner} policy: {err}")))?;
            }
        }
        Ok(())
    }

    pub fn catalog(&self) -> Catalog {
        Catalog {
            components: self.components.clone(),
            foods: self.foods.clone(),
            chemicals: self.chemicals.clone(),
            food_profile: self.food_profile.clone(),
            chemical_profile: self.chemical_profile.clone(),
        }
    }

    /// Builds the host and colonies, each policy on its own seeded stream.
    pub fn build_ecosystem(&self) -> Result<Ecosystem, SimError> {
        let catalog = self.catalog();
        let mut rngs = RngManager::new(self.seed);

        let host_policy = Policy::new(
            catalog.chemicals.len(),
            catalog.foods.len(),
            &self.host.policy,
            rngs.stream("host"),
        )?;
        let host = Host::new(
            HostParams {
                food: Pool::from(self.host.food.clone()),
                components: Pool::from(self.host.components.clone()),
                chemicals: Pool::from(self.host.chemicals.clone()),
                resilience: self.host.resilience.clone(),
                eat_interval: self.host.eat_interval,
                food_consume_rate: self.host.food_consume_rate,
                chemical_decay_rate: self.host.chemical_decay_rate,
            },
            Learner::new(host_policy, self.observation),
            &catalog,
        )?;

        let mut colonies = Vec::with_capacity(self.colonies.len());
        for config in &self.colonies {
            let learner = match &config.policy {
                Some(policy) => {
                    let policy = Policy::new(
                        catalog.components.len(),
                        config.produces.len(),
                        policy,
                        rngs.stream(&format!("colony-{}", config.id)),
                    )?;
                    Some(Learner::new(policy, self.observation))
                }
                None => None,
            };
            colonies.push(Colony::new(
                ColonyParams {
                    id: config.id,
                    population: config.population,
                    likes: config.likes.clone(),
                    produces: config.produces.clone(),
                    inducers: config.inducers.clone(),
                    production_rate: config.production_rate,
                    eat_rate: config.eat_rate,
                    speed: config.speed,
                    production_boost: config.production_boost,
                },
                learner,
            )?);
        }

        Ecosystem::new(catalog, host, colonies)
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(2000)
    }

    /// Copy of this scenario with the host's tunable knobs replaced.
    pub fn with_hyperparameters(&self, params: &Hyperparameters) -> Scenario {
        let mut scenario = self.clone();
        scenario.host.eat_interval = params.eat_interval;
        let policy = &mut scenario.host.policy;
        policy.learning_rate = params.learning_rate;
        policy.alpha = params.alpha;
        policy.gamma = params.gamma;
        policy.exploration_decay = params.exploration_decay;
        scenario
    }

    fn require_component(&self, name: &str, owner: &str) -> Result<(), ScenarioError> {
        if self.components.iter().any(|known| known == name) {
            Ok(())
        } else {
            invalid(format!("{owner} references unknown component {name}"))
        }
    }

    fn require_chemical(&self, name: &str, owner: &str) -> Result<(), ScenarioError> {
        if self.chemicals.iter().any(|known| known == name) {
            Ok(())
        } else {
            invalid(format!("{owner} references unknown chemical {name}"))
        }
    }
}

fn invalid<T>(message: String) -> Result<T, ScenarioError> {
    Err(ScenarioError::Validation(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name: minimal
seed: 7
components: [comp-01]
foods: [food-01]
chemicals: [chem-01]
food_profile:
  food-01: { comp-01: 100 }
chemical_profile:
  chem-01: { kick: 2.0 }
host:
  resilience: { chem-01: 10 }
colonies:
  - id: 1
    likes: { comp-01: 1.0 }
    produces: [chem-01]
"#;

    #[test]
    fn defaults_fill_missing_fields() {
        let scenario = Scenario::from_yaml(MINIMAL).expect("valid scenario");
        assert_eq!(scenario.ticks(None), 2000);
        assert_eq!(scenario.ticks(Some(5)), 5);
        assert_eq!(scenario.snapshot_interval_ticks, 0);
        assert_eq!(scenario.observation, ObservationMode::Window);
        assert_eq!(scenario.host.eat_interval, 10);
        assert_eq!(scenario.host.policy, PolicyConfig::default());
        let colony = &scenario.colonies[0];
        assert_eq!(colony.population, 100.0);
        assert_eq!(colony.eat_rate, 0.01);
        assert!(colony.policy.is_none());
    }

    #[test]
    fn rejects_unknown_references() {
        let text = MINIMAL.replace("likes: { comp-01: 1.0 }", "likes: { comp-09: 1.0 }");
        let err = Scenario::from_yaml(&text).unwrap_err();
        assert!(matches!(err, ScenarioError::Validation(msg) if msg.contains("comp-09")));
    }

    #[test]
    fn rejects_zero_resilience() {
        let text = MINIMAL.replace("resilience: { chem-01: 10 }", "resilience: { chem-01: 0 }");
        assert!(matches!(
            Scenario::from_yaml(&text),
            Err(ScenarioError::Validation(_))
        ));
    }

    #[test]
    fn rejects_negative_initial_amounts() {
        for (pool, entry) in [
            ("components", "{ comp-01: -50.0 }"),
            ("chemicals", "{ chem-01: -7.0 }"),
            ("food", "{ food-01: .nan }"),
        ] {
            let text = MINIMAL.replace(
                "resilience: { chem-01: 10 }",
                &format!("resilience: {{ chem-01: 10 }}\n  {pool}: {entry}"),
            );
            let err = Scenario::from_yaml(&text).unwrap_err();
            assert!(
                matches!(&err, ScenarioError::Validation(msg) if msg.contains(pool)),
                "{pool}: {err}"
            );
        }
    }

    #[test]
    fn initial_amounts_reach_the_host() {
        let text = MINIMAL.replace(
            "resilience: { chem-01: 10 }",
            "resilience: { chem-01: 10 }\n  components: { comp-01: 12.5 }",
        );
        let ecosystem = Scenario::from_yaml(&text)
            .expect("valid scenario")
            .build_ecosystem()
            .expect("ecosystem");
        assert_eq!(ecosystem.host().components().get("comp-01"), 12.5);
    }

    #[test]
    fn rejects_bad_yaml() {
        assert!(matches!(
            Scenario::from_yaml("name: [unterminated"),
            Err(ScenarioError::Parse(_))
        ));
    }

    #[test]
    fn hyperparameters_only_touch_host() {
        let scenario = Scenario::from_yaml(MINIMAL).expect("valid scenario");
        let tuned = scenario.with_hyperparameters(&Hyperparameters {
            eat_interval: 3,
            learning_rate: 0.5,
            alpha: 0.2,
            gamma: 0.3,
            exploration_decay: 0.4,
        });
        assert_eq!(tuned.host.eat_interval, 3);
        assert_eq!(tuned.host.policy.learning_rate, 0.5);
        assert_eq!(tuned.host.policy.exploration_decay, 0.4);
        assert_eq!(tuned.colonies[0].eat_rate, scenario.colonies[0].eat_rate);
    }

    #[test]
    fn builds_ecosystem_with_catalog_shapes() {
        let scenario = Scenario::from_yaml(MINIMAL).expect("valid scenario");
        let ecosystem = scenario.build_ecosystem().expect("ecosystem");
        assert_eq!(ecosystem.colonies().len(), 1);
        assert_eq!(ecosystem.host().learner().policy().input_shape(), (1, 1));
        assert_eq!(ecosystem.host().learner().policy().action_count(), 1);
    }
}
