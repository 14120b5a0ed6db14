//! In-memory run history and the series used for plotting. Fed from the
//! engine's run hook so the caller keeps ownership after the run.

use crate::record::TickRecord;

#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<TickRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TickRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TickRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn ticks(&self) -> Vec<u64> {
        self.records.iter().map(|record| record.tick).collect()
    }

    /// Population of one colony per tick; `None` if the colony never appears.
    pub fn population_series(&self, id: u32) -> Option<Vec<f64>> {
        self.colony_series(id, |colony| colony.population)
    }

    pub fn host_reward_series(&self) -> Vec<f64> {
        self.records.iter().map(|record| record.host_reward).collect()
    }

    pub fn component_series(&self, index: usize) -> Vec<f64> {
        self.records
            .iter()
            .map(|record| record.components.get(index).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn chemical_series(&self, index: usize) -> Vec<f64> {
        self.records
            .iter()
            .map(|record| record.chemicals.get(index).copied().unwrap_or(0.0))
            .collect()
    }

    /// Counts the host's latest food choice over consecutive windows of
    /// `window` ticks. Row `w` covers ticks `w*window..(w+1)*window`; a
    /// trailing partial window is dropped.
    pub fn food_choices_per_window(&self, window: usize, food_count: usize) -> Vec<Vec<u32>> {
        if window == 0 {
            return Vec::new();
        }
        self.records
            .chunks_exact(window)
            .map(|chunk| {
                let mut counts = vec![0; food_count];
                for action in chunk.iter().filter_map(|record| record.host_action) {
                    if let Some(count) = counts.get_mut(action) {
                        *count += 1;
                    }
                }
                counts
            })
            .collect()
    }

    fn colony_series<F>(&self, id: u32, field: F) -> Option<Vec<f64>>
    where
        F: Fn(&crate::record::ColonyRecord) -> f64,
    {
        self.records
            .iter()
            .map(|record| record.colony(id).map(&field))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ColonyRecord;

    fn record(tick: u64, population: f64, action: Option<usize>) -> TickRecord {
        TickRecord {
            tick,
            colonies: vec![ColonyRecord {
                id: 1,
                population,
                speed: 1.0,
                reward: 0.0,
            }],
            components: vec![tick as f64],
            chemicals: vec![],
            eat_timer: 0,
            exploration: 1.0,
            host_reward: tick as f64 * 0.5,
            host_action: action,
        }
    }

    #[test]
    fn series_follow_records() {
        let mut history = History::new();
        for tick in 0..3 {
            history.push(record(tick, 100.0 + tick as f64, None));
        }
        assert_eq!(history.population_series(1), Some(vec![100.0, 101.0, 102.0]));
        assert_eq!(history.population_series(9), None);
        assert_eq!(history.component_series(0), vec![0.0, 1.0, 2.0]);
        assert_eq!(history.chemical_series(0), vec![0.0, 0.0, 0.0]);
        assert_eq!(history.host_reward_series(), vec![0.0, 0.5, 1.0]);
        assert_eq!(history.len(), 3);
        assert!(!history.is_empty());
        assert_eq!(history.ticks(), vec![0, 1, 2]);
        assert_eq!(history.records()[2].colony(1).map(|c| c.population), Some(102.0));
    }

    #[test]
    fn food_histogram_counts_per_window() {
        let mut history = History::new();
        let actions = [None, Some(0), Some(0), Some(2), Some(2), Some(2), Some(1)];
        for (tick, action) in actions.into_iter().enumerate() {
            history.push(record(tick as u64, 1.0, action));
        }
        let counts = history.food_choices_per_window(3, 3);
        assert_eq!(counts, vec![vec![2, 0, 0], vec![0, 0, 3]]);
        assert!(history.food_choices_per_window(0, 3).is_empty());
    }
}
