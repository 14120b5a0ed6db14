use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::{
    engine::TickSink,
    error::{Result, SimError},
    record::TickRecord,
};

#[derive(Serialize)]
struct SnapshotFile<'a> {
    scenario: &'a str,
    written_at: String,
    record: &'a TickRecord,
}

/// Writes `<dir>/<scenario>/tick_XXXXXX.json` every `interval_ticks` ticks.
/// An interval of zero disables snapshots.
pub struct SnapshotWriter {
    base_dir: PathBuf,
    interval_ticks: u64,
    scenario: String,
}

impl SnapshotWriter {
    pub fn new(base_dir: impl AsRef<Path>, interval_ticks: u64, scenario: &str) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
            interval_ticks,
            scenario: scenario.to_string(),
        }
    }

    pub fn should_write(&self, tick: u64) -> bool {
        self.interval_ticks > 0 && tick > 0 && tick % self.interval_ticks == 0
    }

    fn write(&mut self, record: &TickRecord) -> Result<PathBuf> {
        let dir = self.base_dir.join(&self.scenario);
        fs::create_dir_all(&dir).map_err(|source| self.error(source))?;
        let path = dir.join(format!("tick_{:06}.json", record.tick));
        let file = SnapshotFile {
            scenario: &self.scenario,
            written_at: chrono::Utc::now().to_rfc3339(),
            record,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|err| self.error(std::io::Error::other(err)))?;
        fs::write(&path, json).map_err(|source| self.error(source))?;
        Ok(path)
    }

    fn error(&self, source: std::io::Error) -> SimError {
        SimError::Sink {
            sink: format!("snapshot {}", self.base_dir.display()),
            source,
        }
    }
}

impl TickSink for SnapshotWriter {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn record(&mut self, record: &TickRecord) -> Result<()> {
        if self.should_write(record.tick) {
            let path = self.write(record)?;
            debug!(path = %path.display(), "snapshot written");
        }
        Ok(())
    }
}
