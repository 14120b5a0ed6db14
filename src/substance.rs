use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Amounts of named substances. Absent names read as zero and every stored
/// amount stays non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct Pool(BTreeMap<String, f64>);

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> f64 {
        self.0.get(name).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn add(&mut self, name: &str, amount: f64) {
        let entry = self.0.entry(name.to_string()).or_insert(0.0);
        *entry = (*entry + amount).max(0.0);
    }

    /// Subtracts from an existing entry, flooring at zero. Missing entries are
    /// left absent. Returns the amount actually removed.
    pub fn deplete(&mut self, name: &str, amount: f64) -> f64 {
        match self.0.get_mut(name) {
            Some(stock) => {
                let before = *stock;
                *stock = (before - amount).max(0.0);
                before - *stock
            }
            None => 0.0,
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for amount in self.0.values_mut() {
            *amount = (*amount * factor).max(0.0);
        }
    }

    pub fn absorb(&mut self, other: &Pool) {
        for (name, amount) in other.iter() {
            self.add(name, amount);
        }
    }

    /// Reads the pool in catalog order.
    pub fn amounts(&self, names: &[String]) -> Vec<f64> {
        names.iter().map(|name| self.get(name)).collect()
    }

    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, amount)| (name.as_str(), *amount))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for Pool {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut pool = Pool::new();
        for (name, amount) in iter {
            pool.add(&name, amount);
        }
        pool
    }
}

impl From<BTreeMap<String, f64>> for Pool {
    fn from(map: BTreeMap<String, f64>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Pool> for BTreeMap<String, f64> {
    fn from(pool: Pool) -> Self {
        pool.0
    }
}

/// Component make-up of one food, as component → ratio.
pub type FoodComposition = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChemicalTraits {
    pub kick: f64,
}

/// Static names and profile tables shared by the host and every colony.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub components: Vec<String>,
    pub foods: Vec<String>,
    pub chemicals: Vec<String>,
    pub food_profile: BTreeMap<String, FoodComposition>,
    pub chemical_profile: BTreeMap<String, ChemicalTraits>,
}

impl Catalog {
    /// Resolves a host action to the food it names.
    pub fn food(&self, action: usize) -> Result<(&str, &FoodComposition)> {
        let name = self.foods.get(action).ok_or(SimError::ActionOutOfRange {
            action,
            actions: self.foods.len(),
        })?;
        let composition = self
            .food_profile
            .get(name)
            .ok_or_else(|| SimError::UnknownFood(name.clone()))?;
        Ok((name.as_str(), composition))
    }

    pub fn kick(&self, chemical: &str) -> Result<f64> {
        self.chemical_profile
            .get(chemical)
            .map(|traits| traits.kick)
            .ok_or_else(|| SimError::MissingKick(chemical.to_string()))
    }
}
