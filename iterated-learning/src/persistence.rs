//! JSON run artifacts.
//!
//! Layout: `<directory>/<run-id>/<suffix>/parameters.json` and one
//! `generation_<n>.json` per generation. A tradeoff analysis writes
//! `tradeoff.json` instead of generations.

use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::config::{OutputConfig, SimulationConfig};
use crate::tradeoff::TradeoffSummary;
use crate::types::{GenerationRecord, Result};

/// A fresh run identifier: UTC timestamp plus a short random tag.
pub fn new_run_id() -> String {
    let tag = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), &tag[..8])
}

/// Writes the artifacts of one run.
#[derive(Debug, Clone)]
pub struct RunWriter {
    dir: PathBuf,
}

impl RunWriter {
    /// Create the run directory.
    pub fn create(output: &OutputConfig, run_id: &str) -> Result<Self> {
        let mut dir = output.directory.join(run_id);
        if !output.suffix.is_empty() {
            dir.push(&output.suffix);
        }
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Created run directory");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_parameters(&self, config: &SimulationConfig) -> Result<PathBuf> {
        self.write_json("parameters.json", config)
    }

    pub fn write_generation(&self, record: &GenerationRecord) -> Result<PathBuf> {
        self.write_json(&format!("generation_{}.json", record.index), record)
    }

    pub fn write_tradeoff(&self, summary: &TradeoffSummary) -> Result<PathBuf> {
        self.write_json("tradeoff.json", summary)
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.dir.join(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
        Ok(path)
    }
}
