pub mod colony;
pub mod ecosystem;
pub mod engine;
pub mod error;
pub mod history;
pub mod host;
pub mod learner;
pub mod log;
pub mod policy;
pub mod record;
pub mod rng;
pub mod scenario;
pub mod search;
pub mod snapshot;
pub mod state;
pub mod substance;
pub mod web;

pub use ecosystem::{Ecosystem, TickOutcome};
pub use engine::{Engine, EngineBuilder, EngineSettings, RunSummary, TickSink};
pub use error::{Result, SimError};
pub use record::TickRecord;
pub use scenario::{Scenario, ScenarioLoader};
