//! Tick orchestration for one host and its colonies.
//!
//! A tick runs strictly in order: snapshot, host observation, colony ordering
//! by speed, the optional host meal, every colony acting against the shared
//! component pool, host training, chemical decay and the clock. Colonies act
//! one after another on the same pool, so order is part of the outcome.

use tracing::{debug, trace};

use crate::colony::Colony;
use crate::error::{Result, SimError};
use crate::host::Host;
use crate::record::TickRecord;
use crate::substance::Catalog;

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub tick: u64,
    /// Food index eaten this tick, if the host was due to eat.
    pub host_action: Option<usize>,
    pub host_reward: Option<f64>,
}

#[derive(Debug)]
pub struct Ecosystem {
    tick: u64,
    catalog: Catalog,
    host: Host,
    colonies: Vec<Colony>,
}

impl Ecosystem {
    pub fn new(catalog: Catalog, host: Host, colonies: Vec<Colony>) -> Result<Self> {
        let mut ids: Vec<u32> = colonies.iter().map(Colony::id).collect();
        ids.sort_unstable();
        if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(SimError::InvalidParameter(format!(
                "colony id {} is used more than once",
                pair[0]
            )));
        }
        let width = catalog.components.len();
        for colony in &colonies {
            if let Some(learner) = colony.learner() {
                let (rows, expected_width) = learner.policy().input_shape();
                if expected_width != width {
                    return Err(SimError::StateShape {
                        expected_rows: rows,
                        expected_width,
                        rows,
                        width,
                    });
                }
            }
        }
        Ok(Self {
            tick: 0,
            catalog,
            host,
            colonies,
        })
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Colonies in the order they acted during the last tick.
    pub fn colonies(&self) -> &[Colony] {
        &self.colonies
    }

    pub fn colony(&self, id: u32) -> Option<&Colony> {
        self.colonies.iter().find(|colony| colony.id() == id)
    }

    pub fn total_population(&self) -> f64 {
        self.colonies.iter().map(Colony::population).sum()
    }

    pub fn record(&self) -> TickRecord {
        TickRecord::capture(self)
    }

    pub fn step(&mut self) -> Result<TickOutcome> {
        self.step_with(|_| Ok(()))
    }

    /// Runs one tick, handing the start-of-tick record to `observe` first.
    pub fn step_with<F>(&mut self, mut observe: F) -> Result<TickOutcome>
    where
        F: FnMut(&TickRecord) -> Result<()>,
    {
        observe(&self.record())?;

        self.host.observe_current(&self.catalog.chemicals)?;
        self.sort_colonies();

        let mut outcome = TickOutcome {
            tick: self.tick,
            host_action: None,
            host_reward: None,
        };

        if self.host.is_hungry() {
            let action = self.host_eat()?;
            self.colonies_act()?;
            self.host.observe_next(&self.catalog.chemicals)?;
            let reward = self.host.compute_reward(&self.catalog)?;
            self.host.train()?;
            debug!(tick = self.tick, action, reward, "host decided");
            outcome.host_action = Some(action);
            outcome.host_reward = Some(reward);
        } else {
            self.colonies_act()?;
            self.host.observe_next(&self.catalog.chemicals)?;
        }

        self.host.decay_chemicals();
        self.tick += 1;
        self.host.tick_timer();
        Ok(outcome)
    }

    /// Fastest first; equal speeds keep their previous relative order.
    fn sort_colonies(&mut self) {
        self.colonies
            .sort_by(|a, b| b.speed().total_cmp(&a.speed()));
    }

    fn host_eat(&mut self) -> Result<usize> {
        let action = self.host.decide()?;
        let (food, composition) = self.catalog.food(action)?;
        self.host.eat(food, composition);
        Ok(action)
    }

    fn colonies_act(&mut self) -> Result<()> {
        let total_population = self.total_population();
        let components = &self.catalog.components;
        for colony in self.colonies.iter_mut() {
            colony.observe_current(components, self.host.components())?;
            colony.growth(self.host.components_mut(), total_population);
            let produced = colony.produce_chemicals()?;
            self.host.receive_chemicals(&produced);
            colony.react_to_inducers(self.host.chemicals());
            colony.observe_next(components, self.host.components())?;
            let reward = colony.compute_reward();
            colony.train()?;
            trace!(
                tick = self.tick,
                colony = colony.id(),
                population = colony.population(),
                speed = colony.speed(),
                reward,
                "colony acted"
            );
        }
        Ok(())
    }
}
