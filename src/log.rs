use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::{
    ecosystem::Ecosystem,
    engine::TickSink,
    error::{Result, SimError},
    record::TickRecord,
};

/// Append-only CSV of tick records; the header is written on creation.
pub struct CsvLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl CsvLog {
    pub fn create(path: impl AsRef<Path>, ecosystem: &Ecosystem) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| io_error(&path, source))?;
        let mut log = Self {
            writer: BufWriter::new(file),
            path,
        };
        let header = TickRecord::columns(ecosystem).join(",");
        log.write_line(&header)?;
        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{line}").map_err(|source| io_error(&self.path, source))
    }
}

impl TickSink for CsvLog {
    fn name(&self) -> &str {
        "csv"
    }

    fn record(&mut self, record: &TickRecord) -> Result<()> {
        let row = record
            .values()
            .iter()
            .map(|value| value.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.write_line(&row)
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|source| io_error(&self.path, source))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> SimError {
    SimError::Sink {
        sink: format!("csv {}", path.display()),
        source,
    }
}
