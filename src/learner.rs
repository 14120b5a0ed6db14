use crate::error::Result;
use crate::policy::Policy;
use crate::state::{ObservationMode, StateVector};

/// A policy together with the observation buffers it learns from.
///
/// `current` is refreshed before acting; `next` is `current` advanced by the
/// observation made after acting.
#[derive(Debug)]
pub struct Learner {
    policy: Policy,
    mode: ObservationMode,
    current: StateVector,
    next: StateVector,
    action: Option<usize>,
}

impl Learner {
    pub fn new(policy: Policy, mode: ObservationMode) -> Self {
        let (rows, width) = policy.input_shape();
        Self {
            policy,
            mode,
            current: StateVector::zeros(rows, width),
            next: StateVector::zeros(rows, width),
            action: None,
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn current(&self) -> &StateVector {
        &self.current
    }

    pub fn next(&self) -> &StateVector {
        &self.next
    }

    pub fn action(&self) -> Option<usize> {
        self.action
    }

    pub fn observe_current(&mut self, observation: &[f64]) -> Result<()> {
        self.current.observe(observation, self.mode)
    }

    pub fn observe_next(&mut self, observation: &[f64]) -> Result<()> {
        self.next = self.current.advanced(observation, self.mode)?;
        Ok(())
    }

    pub fn decide(&mut self) -> Result<usize> {
        let action = self.policy.decide(&self.current)?;
        self.action = Some(action);
        Ok(action)
    }

    /// Trains on the last decision. Does nothing if no decision was made yet.
    pub fn train(&mut self, reward: f64) -> Result<()> {
        match self.action {
            Some(action) => self
                .policy
                .train(&self.current, &self.next, action, reward),
            None => Ok(()),
        }
    }
}
