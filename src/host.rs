use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, SimError};
use crate::learner::Learner;
use crate::substance::{Catalog, FoodComposition, Pool};

#[derive(Debug, Clone)]
pub struct HostParams {
    pub food: Pool,
    pub components: Pool,
    pub chemicals: Pool,
    /// Per-chemical divisor applied to chemical changes in the reward.
    pub resilience: BTreeMap<String, f64>,
    pub eat_interval: u32,
    pub food_consume_rate: f64,
    /// Fraction of every chemical retained from one tick to the next.
    pub chemical_decay_rate: f64,
}

impl Default for HostParams {
    fn default() -> Self {
        Self {
            food: Pool::new(),
            components: Pool::new(),
            chemicals: Pool::new(),
            resilience: BTreeMap::new(),
            eat_interval: 10,
            food_consume_rate: 1.0,
            chemical_decay_rate: 0.01,
        }
    }
}

/// The organism holding the shared reservoirs. It picks a food every
/// `eat_interval` ticks and is rewarded by resilience-weighted chemical kicks.
#[derive(Debug)]
pub struct Host {
    food: Pool,
    components: Pool,
    chemicals: Pool,
    resilience: BTreeMap<String, f64>,
    eat_interval: u32,
    eat_timer: u32,
    food_consume_rate: f64,
    chemical_decay_rate: f64,
    learner: Learner,
    reward: f64,
}

impl Host {
    /// Fails if any tracked chemical lacks a non-zero resilience, or if the
    /// policy shape does not match the catalog.
    pub fn new(params: HostParams, learner: Learner, catalog: &Catalog) -> Result<Self> {
        for chemical in &catalog.chemicals {
            match params.resilience.get(chemical) {
                None => return Err(SimError::MissingResilience(chemical.clone())),
                Some(value) if *value == 0.0 => {
                    return Err(SimError::ZeroResilience(chemical.clone()))
                }
                Some(_) => {}
            }
        }
        if params.eat_interval == 0 {
            return Err(SimError::InvalidParameter(
                "eat_interval must be at least 1".to_string(),
            ));
        }
        if !(params.chemical_decay_rate > 0.0 && params.chemical_decay_rate <= 1.0) {
            return Err(SimError::InvalidParameter(format!(
                "chemical_decay_rate must lie in (0, 1], got {}",
                params.chemical_decay_rate
            )));
        }
        let (rows, width) = learner.policy().input_shape();
        if width != catalog.chemicals.len() {
            return Err(SimError::StateShape {
                expected_rows: rows,
                expected_width: width,
                rows,
                width: catalog.chemicals.len(),
            });
        }
        if learner.policy().action_count() != catalog.foods.len() {
            return Err(SimError::InvalidParameter(format!(
                "host policy has {} actions but the catalog lists {} foods",
                learner.policy().action_count(),
                catalog.foods.len()
            )));
        }
        Ok(Self {
            food: params.food,
            components: params.components,
            chemicals: params.chemicals,
            resilience: params.resilience,
            eat_interval: params.eat_interval,
            eat_timer: params.eat_interval,
            food_consume_rate: params.food_consume_rate,
            chemical_decay_rate: params.chemical_decay_rate,
            learner,
            reward: 0.0,
        })
    }

    pub fn food(&self) -> &Pool {
        &self.food
    }

    pub fn components(&self) -> &Pool {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut Pool {
        &mut self.components
    }

    pub fn chemicals(&self) -> &Pool {
        &self.chemicals
    }

    pub fn eat_timer(&self) -> u32 {
        self.eat_timer
    }

    pub fn eat_interval(&self) -> u32 {
        self.eat_interval
    }

    /// Whether this tick is a deciding tick.
    pub fn is_hungry(&self) -> bool {
        self.eat_timer == 0
    }

    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub fn last_action(&self) -> Option<usize> {
        self.learner.action()
    }

    pub fn exploration(&self) -> f64 {
        self.learner.policy().exploration()
    }

    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    pub fn observe_current(&mut self, chemical_names: &[String]) -> Result<()> {
        let observation = self.chemicals.amounts(chemical_names);
        self.learner.observe_current(&observation)
    }

    pub fn observe_next(&mut self, chemical_names: &[String]) -> Result<()> {
        let observation = self.chemicals.amounts(chemical_names);
        self.learner.observe_next(&observation)
    }

    /// Picks a food index from the current observation.
    pub fn decide(&mut self) -> Result<usize> {
        self.learner.decide()
    }

    pub fn eat(&mut self, food_name: &str, composition: &FoodComposition) {
        self.food.add(food_name, self.food_consume_rate);
        for (component, ratio) in composition {
            self.components
                .add(component, self.food_consume_rate * ratio);
        }
        self.eat_timer = self.eat_interval;
        debug!(food = food_name, "host ate");
    }

    pub fn decay_chemicals(&mut self) {
        self.chemicals.scale(self.chemical_decay_rate);
    }

    pub fn receive_chemicals(&mut self, produced: &Pool) {
        self.chemicals.absorb(produced);
    }

    /// Sum over tracked chemicals of `kick * (after - before) / resilience`,
    /// comparing the observations around the last action.
    pub fn compute_reward(&mut self, catalog: &Catalog) -> Result<f64> {
        let before = self.learner.current().latest();
        let after = self.learner.next().latest();
        let mut reward = 0.0;
        for (index, chemical) in catalog.chemicals.iter().enumerate() {
            let resilience = *self
                .resilience
                .get(chemical)
                .ok_or_else(|| SimError::MissingResilience(chemical.clone()))?;
            if resilience == 0.0 {
                return Err(SimError::ZeroResilience(chemical.clone()));
            }
            let delta = after.get(index).copied().unwrap_or(0.0)
                - before.get(index).copied().unwrap_or(0.0);
            reward += catalog.kick(chemical)? * delta / resilience;
        }
        self.reward = reward;
        Ok(reward)
    }

    pub fn train(&mut self) -> Result<()> {
        self.learner.train(self.reward)
    }

    /// Counts the eat timer down one tick, never below zero.
    pub fn tick_timer(&mut self) {
        self.eat_timer = self.eat_timer.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Policy, PolicyConfig};
    use crate::rng::PolicyRng;
    use crate::state::ObservationMode;
    use crate::substance::ChemicalTraits;
    use rand::SeedableRng;

    fn catalog() -> Catalog {
        let mut food_profile = BTreeMap::new();
        food_profile.insert(
            "food-01".to_string(),
            [("comp-01".to_string(), 100.0)].into_iter().collect(),
        );
        food_profile.insert(
            "food-02".to_string(),
            [("comp-01".to_string(), 50.0), ("comp-02".to_string(), 50.0)]
                .into_iter()
                .collect(),
        );
        let mut chemical_profile = BTreeMap::new();
        chemical_profile.insert("chem-01".to_string(), ChemicalTraits { kick: 10.0 });
        chemical_profile.insert("chem-02".to_string(), ChemicalTraits { kick: 3.0 });
        Catalog {
            components: vec!["comp-01".into(), "comp-02".into()],
            foods: vec!["food-01".into(), "food-02".into()],
            chemicals: vec!["chem-01".into(), "chem-02".into()],
            food_profile,
            chemical_profile,
        }
    }

    fn params() -> HostParams {
        HostParams {
            resilience: [("chem-01".to_string(), 10.0), ("chem-02".to_string(), 50.0)]
                .into_iter()
                .collect(),
            ..HostParams::default()
        }
    }

    fn learner() -> Learner {
        let policy = Policy::new(
            2,
            2,
            &PolicyConfig::default(),
            PolicyRng::seed_from_u64(11),
        )
        .unwrap();
        Learner::new(policy, ObservationMode::Window)
    }

    #[test]
    fn starts_waiting_with_full_timer() {
        let host = Host::new(params(), learner(), &catalog()).unwrap();
        assert_eq!(host.eat_timer(), 10);
        assert!(!host.is_hungry());
    }

    #[test]
    fn eat_fills_food_and_components_and_resets_timer() {
        let catalog = catalog();
        let mut host = Host::new(params(), learner(), &catalog).unwrap();
        for _ in 0..4 {
            host.tick_timer();
        }
        let (name, composition) = catalog.food(1).unwrap();
        host.eat(name, composition);
        assert_eq!(host.food().get("food-02"), 1.0);
        assert_eq!(host.components().get("comp-01"), 50.0);
        assert_eq!(host.components().get("comp-02"), 50.0);
        assert_eq!(host.eat_timer(), 10);
    }

    #[test]
    fn chemicals_decay_and_accumulate() {
        let mut host = Host::new(params(), learner(), &catalog()).unwrap();
        let produced: Pool = [("chem-01".to_string(), 200.0)].into_iter().collect();
        host.receive_chemicals(&produced);
        host.receive_chemicals(&produced);
        assert_eq!(host.chemicals().get("chem-01"), 400.0);
        host.decay_chemicals();
        assert!((host.chemicals().get("chem-01") - 4.0).abs() < 1e-12);
    }

    #[test]
    fn reward_weights_kick_over_resilience() {
        let catalog = catalog();
        let mut host = Host::new(params(), learner(), &catalog).unwrap();
        host.observe_current(&catalog.chemicals).unwrap();
        let produced: Pool = [("chem-01".to_string(), 20.0), ("chem-02".to_string(), 100.0)]
            .into_iter()
            .collect();
        host.receive_chemicals(&produced);
        host.observe_next(&catalog.chemicals).unwrap();
        let reward = host.compute_reward(&catalog).unwrap();
        // 10 * 20 / 10 + 3 * 100 / 50
        assert!((reward - 26.0).abs() < 1e-9);
        assert_eq!(host.reward(), reward);
    }

    #[test]
    fn zero_resilience_is_rejected() {
        let mut bad = params();
        bad.resilience.insert("chem-02".into(), 0.0);
        assert!(matches!(
            Host::new(bad, learner(), &catalog()),
            Err(SimError::ZeroResilience(name)) if name == "chem-02"
        ));
    }

    #[test]
    fn missing_resilience_is_rejected() {
        let mut bad = params();
        bad.resilience.remove("chem-01");
        assert!(matches!(
            Host::new(bad, learner(), &catalog()),
            Err(SimError::MissingResilience(_))
        ));
    }

    #[test]
    fn timer_saturates_at_zero() {
        let mut host = Host::new(params(), learner(), &catalog()).unwrap();
        for _ in 0..15 {
            host.tick_timer();
        }
        assert_eq!(host.eat_timer(), 0);
        assert!(host.is_hungry());
    }
}
