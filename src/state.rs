use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// How a new observation is folded into a state buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    /// Keep the most recent `rows` observations, oldest first.
    #[default]
    Window,
    /// Overwrite the first row, then rotate the whole flattened buffer one
    /// slot to the left. Retained for comparing against older recorded runs;
    /// it does not build up a history.
    LegacyRoll,
}

/// Fixed-shape observation buffer fed to a policy: `rows` past observations of
/// `width` substances each, plus the raw most recent observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    rows: usize,
    width: usize,
    values: Vec<f64>,
    latest: Vec<f64>,
}

impl StateVector {
    pub fn zeros(rows: usize, width: usize) -> Self {
        let rows = rows.max(1);
        Self {
            rows,
            width,
            values: vec![0.0; rows * width],
            latest: vec![0.0; width],
        }
    }

    /// Builds a buffer from explicit rows, oldest first. All rows must share
    /// one width; an empty list gives a single zero-width row.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(bad) = rows.iter().find(|row| row.len() != width) {
            return Err(SimError::StateShape {
                expected_rows: rows.len(),
                expected_width: width,
                rows: rows.len(),
                width: bad.len(),
            });
        }
        let count = rows.len().max(1);
        let latest = rows.last().cloned().unwrap_or_default();
        let values: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Self {
            rows: count,
            width,
            values,
            latest,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.width..(index + 1) * self.width]
    }

    /// The observation most recently written, before any rotation.
    pub fn latest(&self) -> &[f64] {
        &self.latest
    }

    /// Folds `observation` into the buffer. The observation must be exactly
    /// `width` wide.
    pub fn observe(&mut self, observation: &[f64], mode: ObservationMode) -> Result<()> {
        if observation.len() != self.width {
            return Err(SimError::StateShape {
                expected_rows: self.rows,
                expected_width: self.width,
                rows: 1,
                width: observation.len(),
            });
        }
        let fresh = observation.to_vec();
        match mode {
            ObservationMode::Window => {
                self.values.rotate_left(self.width);
                let start = (self.rows - 1) * self.width;
                self.values[start..].copy_from_slice(&fresh);
            }
            ObservationMode::LegacyRoll => {
                self.values[..self.width].copy_from_slice(&fresh);
                if !self.values.is_empty() {
                    self.values.rotate_left(1);
                }
            }
        }
        self.latest = fresh;
        Ok(())
    }

    /// A copy of this buffer with `observation` folded in.
    pub fn advanced(&self, observation: &[f64], mode: ObservationMode) -> Result<Self> {
        let mut next = self.clone();
        next.observe(observation, mode)?;
        Ok(next)
    }
}
