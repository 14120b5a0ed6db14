//! Action-value estimation and epsilon-greedy control.
//!
//! A [`Policy`] wraps a trainable [`Approximator`] that maps a
//! [`StateVector`] to one value per discrete action. Decisions explore
//! uniformly with the current exploration probability and otherwise pick
//! uniformly among the maximal actions; training applies a one-step Bellman
//! update to the taken action and fits the approximator to the result.

mod adam;
mod dense;
mod recurrent;

use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use dense::DenseNetwork;
pub use recurrent::RecurrentNetwork;

use crate::error::{Result, SimError};
use crate::rng::PolicyRng;
use crate::state::StateVector;

fn default_learning_rate() -> f64 {
    0.01
}

fn default_alpha() -> f64 {
    0.1
}

fn default_gamma() -> f64 {
    0.9
}

fn default_exploration() -> f64 {
    1.0
}

fn default_exploration_decay() -> f64 {
    0.94
}

fn default_epochs() -> usize {
    10
}

fn default_hidden() -> usize {
    10
}

fn default_recurrent_hidden() -> usize {
    32
}

fn default_memory() -> usize {
    2
}

/// Approximator topology, resolved once when the policy is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkConfig {
    Dense {
        #[serde(default = "default_hidden")]
        hidden: usize,
    },
    Recurrent {
        #[serde(default = "default_memory")]
        memory: usize,
        #[serde(default = "default_recurrent_hidden")]
        hidden: usize,
    },
}

impl NetworkConfig {
    /// Number of observation rows the approximator reads.
    pub fn memory(&self) -> usize {
        match self {
            NetworkConfig::Dense { .. } => 1,
            NetworkConfig::Recurrent { memory, .. } => (*memory).max(1),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig::Dense {
            hidden: default_hidden(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    #[serde(default = "default_exploration")]
    pub exploration: f64,
    #[serde(default = "default_exploration_decay")]
    pub exploration_decay: f64,
    /// Gradient steps per training call.
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default)]
    pub network: NetworkConfig,
    /// Load a previously saved approximator instead of building a fresh one.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            alpha: default_alpha(),
            gamma: default_gamma(),
            exploration: default_exploration(),
            exploration_decay: default_exploration_decay(),
            epochs: default_epochs(),
            network: NetworkConfig::default(),
            model_path: None,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(SimError::InvalidParameter(format!(
                "alpha must lie in [0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(SimError::InvalidParameter(format!(
                "gamma must lie in [0, 1], got {}",
                self.gamma
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration) {
            return Err(SimError::InvalidParameter(format!(
                "exploration must lie in [0, 1], got {}",
                self.exploration
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration_decay) {
            return Err(SimError::InvalidParameter(format!(
                "exploration_decay must lie in [0, 1], got {}",
                self.exploration_decay
            )));
        }
        Ok(())
    }
}

/// Uniform capability shared by every approximator topology.
pub trait ValueModel {
    /// `(rows, width)` of the state buffers this model accepts.
    fn input_shape(&self) -> (usize, usize);
    fn action_count(&self) -> usize;
    fn predict(&self, state: &StateVector) -> Vec<f64>;
    fn fit(&mut self, state: &StateVector, target: &[f64], epochs: usize);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "topology", rename_all = "snake_case")]
pub enum Approximator {
    Dense(DenseNetwork),
    Recurrent(RecurrentNetwork),
}

impl Approximator {
    pub fn build(
        network: &NetworkConfig,
        width: usize,
        actions: usize,
        learning_rate: f64,
        rng: &mut PolicyRng,
    ) -> Self {
        match network {
            NetworkConfig::Dense { hidden } => {
                Approximator::Dense(DenseNetwork::new(width, actions, *hidden, learning_rate, rng))
            }
            NetworkConfig::Recurrent { memory, hidden } => Approximator::Recurrent(
                RecurrentNetwork::new(*memory, width, *hidden, actions, learning_rate, rng),
            ),
        }
    }

    /// Reads a saved approximator and checks it against the expected shape.
    pub fn load(path: &Path, width: usize, actions: usize) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| SimError::ModelIo {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Approximator =
            serde_json::from_str(&text).map_err(|source| SimError::ModelFormat {
                path: path.to_path_buf(),
                source,
            })?;
        let structure = match &model {
            Approximator::Dense(net) => net.validate(),
            Approximator::Recurrent(net) => net.validate(),
        };
        if let Err(reason) = structure {
            return Err(SimError::ModelIncompatible {
                path: path.to_path_buf(),
                reason,
            });
        }
        let (_, model_width) = model.input_shape();
        if model_width != width || model.action_count() != actions {
            return Err(SimError::ModelIncompatible {
                path: path.to_path_buf(),
                reason: format!(
                    "expected width {width} and {actions} actions, found width {model_width} and {} actions",
                    model.action_count()
                ),
            });
        }
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self).map_err(|source| SimError::ModelFormat {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SimError::ModelIo {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl ValueModel for Approximator {
    fn input_shape(&self) -> (usize, usize) {
        match self {
            Approximator::Dense(net) => (1, net.inputs()),
            Approximator::Recurrent(net) => (net.memory(), net.width()),
        }
    }

    fn action_count(&self) -> usize {
        match self {
            Approximator::Dense(net) => net.actions(),
            Approximator::Recurrent(net) => net.actions(),
        }
    }

    fn predict(&self, state: &StateVector) -> Vec<f64> {
        match self {
            Approximator::Dense(net) => net.predict(state.as_slice()),
            Approximator::Recurrent(net) => net.predict(state.as_slice()),
        }
    }

    fn fit(&mut self, state: &StateVector, target: &[f64], epochs: usize) {
        match self {
            Approximator::Dense(net) => net.fit(state.as_slice(), target, epochs),
            Approximator::Recurrent(net) => net.fit(state.as_slice(), target, epochs),
        }
    }
}

#[derive(Debug)]
pub struct Policy {
    model: Approximator,
    rng: PolicyRng,
    exploration: f64,
    exploration_decay: f64,
    alpha: f64,
    gamma: f64,
    epochs: usize,
}

impl Policy {
    /// Builds a fresh approximator, or loads one when `config.model_path` is set.
    pub fn new(
        width: usize,
        actions: usize,
        config: &PolicyConfig,
        mut rng: PolicyRng,
    ) -> Result<Self> {
        config.validate()?;
        if actions == 0 {
            return Err(SimError::InvalidParameter(
                "a policy needs at least one action".to_string(),
            ));
        }
        let model = match &config.model_path {
            Some(path) => {
                let model = Approximator::load(path, width, actions)?;
                if model.input_shape().0 != config.network.memory() {
                    return Err(SimError::ModelIncompatible {
                        path: path.clone(),
                        reason: format!(
                            "model reads {} rows but the configured network reads {}",
                            model.input_shape().0,
                            config.network.memory()
                        ),
                    });
                }
                model
            }
            None => Approximator::build(
                &config.network,
                width,
                actions,
                config.learning_rate,
                &mut rng,
            ),
        };
        Ok(Self::from_model(model, config, rng))
    }

    fn from_model(model: Approximator, config: &PolicyConfig, rng: PolicyRng) -> Self {
        Self {
            model,
            rng,
            exploration: config.exploration,
            exploration_decay: config.exploration_decay,
            alpha: config.alpha,
            gamma: config.gamma,
            epochs: config.epochs,
        }
    }

    pub fn exploration(&self) -> f64 {
        self.exploration
    }

    pub fn action_count(&self) -> usize {
        self.model.action_count()
    }

    pub fn input_shape(&self) -> (usize, usize) {
        self.model.input_shape()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.model.save(path)
    }

    fn check_shape(&self, state: &StateVector) -> Result<()> {
        let (rows, width) = self.model.input_shape();
        if state.rows() != rows || state.width() != width {
            return Err(SimError::StateShape {
                expected_rows: rows,
                expected_width: width,
                rows: state.rows(),
                width: state.width(),
            });
        }
        Ok(())
    }

    pub fn values(&self, state: &StateVector) -> Result<Vec<f64>> {
        self.check_shape(state)?;
        Ok(self.model.predict(state))
    }

    /// Epsilon-greedy choice; ties among maximal values are broken uniformly.
    /// Exploration decays after every call.
    pub fn decide(&mut self, state: &StateVector) -> Result<usize> {
        let values = self.values(state)?;
        let actions = values.len();
        let roll: f64 = self.rng.gen();
        let action = if roll < self.exploration {
            self.rng.gen_range(0..actions)
        } else {
            let best = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let candidates: Vec<usize> = values
                .iter()
                .enumerate()
                .filter(|(_, value)| **value == best)
                .map(|(index, _)| index)
                .collect();
            match candidates.choose(&mut self.rng) {
                Some(action) => *action,
                None => self.rng.gen_range(0..actions),
            }
        };
        self.exploration *= self.exploration_decay;
        Ok(action)
    }

    /// One-step temporal-difference update toward
    /// `reward + gamma * max(values(next_state))` for the taken action.
    pub fn train(
        &mut self,
        state: &StateVector,
        next_state: &StateVector,
        action: usize,
        reward: f64,
    ) -> Result<()> {
        let mut values = self.values(state)?;
        let next_values = self.values(next_state)?;
        let actions = values.len();
        let slot = values
            .get_mut(action)
            .ok_or(SimError::ActionOutOfRange { action, actions })?;
        let best_next = next_values
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let best_next = if best_next.is_finite() { best_next } else { 0.0 };
        let target = reward + self.gamma * best_next;
        *slot = (1.0 - self.alpha) * *slot + self.alpha * target;
        debug!(action, reward, target, "policy update");
        self.model.fit(state, &values, self.epochs);
        Ok(())
    }
}
