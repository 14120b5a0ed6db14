//! Random hyper-parameter search over the host's learning knobs.
//!
//! Each trial rebuilds the ecosystem from the base scenario with freshly
//! sampled parameters, runs it to completion and keeps one scalar: the
//! cumulative host reward.

use std::ops::RangeInclusive;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    engine::{EngineBuilder, EngineSettings},
    error::{Result, SimError},
    scenario::{Hyperparameters, Scenario},
};

#[derive(Debug, Clone)]
pub struct SearchBounds {
    pub eat_interval: RangeInclusive<u32>,
    pub learning_rate: RangeInclusive<f64>,
    pub alpha: RangeInclusive<f64>,
    pub gamma: RangeInclusive<f64>,
    pub exploration_decay: RangeInclusive<f64>,
}

impl Default for SearchBounds {
    fn default() -> Self {
        Self {
            eat_interval: 1..=10,
            learning_rate: 0.001..=1.0,
            alpha: 0.01..=1.0,
            gamma: 0.0..=1.0,
            exploration_decay: 0.0..=1.0,
        }
    }
}

impl SearchBounds {
    fn validate(&self) -> Result<()> {
        if self.eat_interval.is_empty() || *self.eat_interval.start() == 0 {
            return Err(SimError::InvalidParameter(
                "eat interval bounds must be non-empty and start at 1 or more".to_string(),
            ));
        }
        for (label, range) in [
            ("learning_rate", &self.learning_rate),
            ("alpha", &self.alpha),
            ("gamma", &self.gamma),
            ("exploration_decay", &self.exploration_decay),
        ] {
            if range.is_empty() {
                return Err(SimError::InvalidParameter(format!(
                    "{label} bounds {range:?} are empty"
                )));
            }
        }
        Ok(())
    }

    fn sample(&self, rng: &mut ChaCha8Rng) -> Hyperparameters {
        Hyperparameters {
            eat_interval: rng.gen_range(self.eat_interval.clone()),
            learning_rate: rng.gen_range(self.learning_rate.clone()),
            alpha: rng.gen_range(self.alpha.clone()),
            gamma: rng.gen_range(self.gamma.clone()),
            exploration_decay: rng.gen_range(self.exploration_decay.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Trial {
    pub index: usize,
    pub params: Hyperparameters,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub trials: Vec<Trial>,
    pub best: Option<Trial>,
}

pub struct RandomSearch {
    pub trials: usize,
    pub ticks: u64,
    pub seed: u64,
    pub bounds: SearchBounds,
}

impl RandomSearch {
    pub fn new(trials: usize, ticks: u64, seed: u64) -> Self {
        Self {
            trials,
            ticks,
            seed,
            bounds: SearchBounds::default(),
        }
    }

    pub fn with_bounds(mut self, bounds: SearchBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn run(&self, base: &Scenario) -> Result<SearchReport> {
        self.bounds.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut trials = Vec::with_capacity(self.trials);
        for index in 0..self.trials {
            let params = self.bounds.sample(&mut rng);
            let score = evaluate(base, &params, self.ticks)?;
            info!(trial = index, ?params, score, "trial finished");
            trials.push(Trial {
                index,
                params,
                score,
            });
        }

        let best = trials
            .iter()
            .filter(|trial| trial.score.is_finite())
            .max_by(|a, b| a.score.total_cmp(&b.score))
            .cloned();
        if best.is_none() && !trials.is_empty() {
            warn!("no trial produced a finite score");
        }
        Ok(SearchReport { trials, best })
    }
}

/// Runs one full simulation and reduces it to the cumulative host reward.
pub fn evaluate(base: &Scenario, params: &Hyperparameters, ticks: u64) -> Result<f64> {
    let scenario = base.with_hyperparameters(params);
    let mut ecosystem = scenario.build_ecosystem()?;
    let mut engine = EngineBuilder::new(EngineSettings {
        scenario_name: scenario.name.clone(),
    })
    .build();
    let summary = engine.run(&mut ecosystem, ticks)?;
    Ok(summary.cumulative_host_reward)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_within_bounds() {
        let bounds = SearchBounds::default();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let params = bounds.sample(&mut rng);
            assert!(bounds.eat_interval.contains(&params.eat_interval));
            assert!(bounds.learning_rate.contains(&params.learning_rate));
            assert!(bounds.alpha.contains(&params.alpha));
            assert!(bounds.gamma.contains(&params.gamma));
            assert!(bounds.exploration_decay.contains(&params.exploration_decay));
        }
    }

    #[test]
    fn zero_eat_interval_bound_is_rejected() {
        let bounds = SearchBounds {
            eat_interval: 0..=4,
            ..SearchBounds::default()
        };
        assert!(matches!(
            bounds.validate(),
            Err(SimError::InvalidParameter(_))
        ));
    }
}
