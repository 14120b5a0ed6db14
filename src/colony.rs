use std::collections::BTreeMap;

use crate::error::{Result, SimError};
use crate::learner::Learner;
use crate::substance::Pool;

/// Added to the edible total so an empty pool still leaves room to grow.
pub const FOOD_FLOOR: f64 = 0.01;
/// Populations never drop below this; colonies are never removed.
pub const POPULATION_FLOOR: f64 = 0.01;

#[derive(Debug, Clone)]
pub struct ColonyParams {
    pub id: u32,
    pub population: f64,
    /// Component → preference weight.
    pub likes: BTreeMap<String, f64>,
    pub produces: Vec<String>,
    /// Chemical → speed change per unit present.
    pub inducers: BTreeMap<String, f64>,
    pub production_rate: f64,
    pub eat_rate: f64,
    pub speed: f64,
    pub production_boost: f64,
}

impl Default for ColonyParams {
    fn default() -> Self {
        Self {
            id: 0,
            population: 100.0,
            likes: BTreeMap::new(),
            produces: Vec::new(),
            inducers: BTreeMap::new(),
            production_rate: 1.0,
            eat_rate: 0.01,
            speed: 1.0,
            production_boost: 1.0,
        }
    }
}

#[derive(Debug)]
pub struct Colony {
    id: u32,
    population: f64,
    previous_population: f64,
    likes: BTreeMap<String, f64>,
    produces: Vec<String>,
    inducers: BTreeMap<String, f64>,
    production_rate: f64,
    eat_rate: f64,
    speed: f64,
    production_boost: f64,
    learner: Option<Learner>,
    reward: f64,
}

impl Colony {
    pub fn new(params: ColonyParams, learner: Option<Learner>) -> Result<Self> {
        if params.eat_rate.is_nan() || params.eat_rate <= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "colony {} eat_rate must be positive, got {}",
                params.id, params.eat_rate
            )));
        }
        if let Some(learner) = &learner {
            let actions = learner.policy().action_count();
            if actions != params.produces.len() {
                return Err(SimError::InvalidParameter(format!(
                    "colony {} policy has {} actions but produces {} chemicals",
                    params.id,
                    actions,
                    params.produces.len()
                )));
            }
        }
        let population = params.population.max(POPULATION_FLOOR);
        Ok(Self {
            id: params.id,
            population,
            previous_population: population,
            likes: params.likes,
            produces: params.produces,
            inducers: params.inducers,
            production_rate: params.production_rate,
            eat_rate: params.eat_rate,
            speed: params.speed,
            production_boost: params.production_boost,
            learner,
            reward: 0.0,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn population(&self) -> f64 {
        self.population
    }

    pub fn previous_population(&self) -> f64 {
        self.previous_population
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub fn produces(&self) -> &[String] {
        &self.produces
    }

    pub fn learner(&self) -> Option<&Learner> {
        self.learner.as_ref()
    }

    /// One logistic growth step against the shared pool.
    ///
    /// Every liked component present in `nutrients` is read at its current
    /// amount and then depleted by `population * eat_rate`, so colonies
    /// processed later in the same tick see what is left.
    pub fn growth(&mut self, nutrients: &mut Pool, total_population: f64) -> f64 {
        let access_share = if total_population > 0.0 {
            self.population / total_population
        } else {
            0.0
        };

        let mut available = FOOD_FLOOR;
        for (component, weight) in &self.likes {
            if nutrients.contains(component) {
                available += nutrients.get(component) * weight;
                nutrients.deplete(component, self.population * self.eat_rate);
            }
        }

        let capacity = (access_share * available / self.eat_rate).max(f64::MIN_POSITIVE);
        let change = self.eat_rate * self.population * (1.0 - self.population / capacity);

        self.previous_population = self.population;
        self.population = (self.population + change).max(POPULATION_FLOOR);
        change
    }

    /// Baseline output of every produced chemical, with the policy's chosen
    /// chemical boosted when a policy is present.
    pub fn produce_chemicals(&mut self) -> Result<Pool> {
        let mut rates = vec![self.production_rate; self.produces.len()];
        if let Some(learner) = self.learner.as_mut() {
            let action = learner.decide()?;
            let actions = rates.len();
            let rate = rates
                .get_mut(action)
                .ok_or(SimError::ActionOutOfRange { action, actions })?;
            *rate += self.production_boost;
        }
        Ok(self
            .produces
            .iter()
            .zip(rates)
            .map(|(chemical, rate)| (chemical.clone(), self.population * rate))
            .collect())
    }

    pub fn react_to_inducers(&mut self, chemicals: &Pool) {
        for (chemical, weight) in &self.inducers {
            self.speed += chemicals.get(chemical) * weight;
        }
    }

    pub fn compute_reward(&mut self) -> f64 {
        self.reward = self.population - self.previous_population;
        self.reward
    }

    pub fn observe_current(&mut self, component_names: &[String], nutrients: &Pool) -> Result<()> {
        match self.learner.as_mut() {
            Some(learner) => learner.observe_current(&nutrients.amounts(component_names)),
            None => Ok(()),
        }
    }

    pub fn observe_next(&mut self, component_names: &[String], nutrients: &Pool) -> Result<()> {
        match self.learner.as_mut() {
            Some(learner) => learner.observe_next(&nutrients.amounts(component_names)),
            None => Ok(()),
        }
    }

    pub fn train(&mut self) -> Result<()> {
        match self.learner.as_mut() {
            Some(learner) => learner.train(self.reward),
            None => Ok(()),
        }
    }
}
