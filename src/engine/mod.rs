use tracing::{debug, info};

use crate::{ecosystem::Ecosystem, error::Result, record::TickRecord};

/// Consumer of the per-tick log records.
pub trait TickSink {
    fn name(&self) -> &str;
    fn record(&mut self, record: &TickRecord) -> Result<()>;
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct EngineSettings {
    pub scenario_name: String,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    sinks: Vec<Box<dyn TickSink>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: impl TickSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            sinks: self.sinks,
            settings: self.settings,
        }
    }
}

/// Totals gathered over one call to [`Engine::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub meals: u64,
    pub cumulative_host_reward: f64,
    /// `(colony id, population)` sorted by id.
    pub final_populations: Vec<(u32, f64)>,
}

pub struct Engine {
    sinks: Vec<Box<dyn TickSink>>,
    settings: EngineSettings,
}

impl Engine {
    pub fn run(&mut self, ecosystem: &mut Ecosystem, ticks: u64) -> Result<RunSummary> {
        self.run_with_hook(ecosystem, ticks, |_| {})
    }

    /// Like [`Engine::run`], also handing every start-of-tick record to `hook`.
    pub fn run_with_hook<F>(
        &mut self,
        ecosystem: &mut Ecosystem,
        ticks: u64,
        mut hook: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&TickRecord),
    {
        info!(
            scenario = %self.settings.scenario_name,
            ticks,
            colonies = ecosystem.colonies().len(),
            "run started"
        );
        let mut meals = 0;
        let mut cumulative_host_reward = 0.0;
        for _ in 0..ticks {
            let sinks = &mut self.sinks;
            let outcome = ecosystem.step_with(|record| {
                hook(record);
                for sink in sinks.iter_mut() {
                    sink.record(record)?;
                }
                Ok(())
            })?;
            if let Some(reward) = outcome.host_reward {
                meals += 1;
                cumulative_host_reward += reward;
            }
            debug!(tick = outcome.tick, action = ?outcome.host_action, "tick complete");
        }
        for sink in &mut self.sinks {
            sink.finish()?;
            debug!(sink = sink.name(), "sink finished");
        }

        let mut final_populations: Vec<(u32, f64)> = ecosystem
            .colonies()
            .iter()
            .map(|colony| (colony.id(), colony.population()))
            .collect();
        final_populations.sort_by_key(|(id, _)| *id);
        info!(
            scenario = %self.settings.scenario_name,
            meals,
            cumulative_host_reward,
            "run finished"
        );
        Ok(RunSummary {
            ticks,
            meals,
            cumulative_host_reward,
            final_populations,
        })
    }
}
