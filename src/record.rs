use serde::{Deserialize, Serialize};

use crate::ecosystem::Ecosystem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColonyRecord {
    pub id: u32,
    pub population: f64,
    pub speed: f64,
    pub reward: f64,
}

/// One row of the per-tick log, taken at the start of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    /// Sorted by colony id so columns stay stable when processing order changes.
    pub colonies: Vec<ColonyRecord>,
    pub components: Vec<f64>,
    pub chemicals: Vec<f64>,
    pub eat_timer: u32,
    pub exploration: f64,
    pub host_reward: f64,
    /// Food chosen by the host during the previous deciding tick.
    pub host_action: Option<usize>,
}

impl TickRecord {
    pub fn capture(ecosystem: &Ecosystem) -> Self {
        let mut colonies: Vec<ColonyRecord> = ecosystem
            .colonies()
            .iter()
            .map(|colony| ColonyRecord {
                id: colony.id(),
                population: colony.population(),
                speed: colony.speed(),
                reward: colony.reward(),
            })
            .collect();
        colonies.sort_by_key(|colony| colony.id);

        let catalog = ecosystem.catalog();
        let host = ecosystem.host();
        Self {
            tick: ecosystem.tick(),
            colonies,
            components: host.components().amounts(&catalog.components),
            chemicals: host.chemicals().amounts(&catalog.chemicals),
            eat_timer: host.eat_timer(),
            exploration: host.exploration(),
            host_reward: host.reward(),
            host_action: host.last_action(),
        }
    }

    /// Column names in the order [`TickRecord::values`] emits them.
    pub fn columns(ecosystem: &Ecosystem) -> Vec<String> {
        let mut ids: Vec<u32> = ecosystem.colonies().iter().map(|c| c.id()).collect();
        ids.sort_unstable();

        let mut columns = vec!["tick".to_string()];
        for id in ids {
            for field in ["id", "population", "speed", "reward"] {
                columns.push(format!("colony_{id}_{field}"));
            }
        }
        let catalog = ecosystem.catalog();
        columns.extend(catalog.components.iter().cloned());
        columns.extend(catalog.chemicals.iter().cloned());
        columns.extend(
            ["eat_timer", "exploration", "host_reward"]
                .into_iter()
                .map(String::from),
        );
        columns
    }

    pub fn values(&self) -> Vec<f64> {
        let mut values = vec![self.tick as f64];
        for colony in &self.colonies {
            values.extend([
                colony.id as f64,
                colony.population,
                colony.speed,
                colony.reward,
            ]);
        }
        values.extend(&self.components);
        values.extend(&self.chemicals);
        values.extend([self.eat_timer as f64, self.exploration, self.host_reward]);
        values
    }

    pub fn colony(&self, id: u32) -> Option<&ColonyRecord> {
        self.colonies.iter().find(|colony| colony.id == id)
    }
}
