//! Engine configuration.

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine knobs. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    /// Elements each component processes per tick.
    pub chunk: usize,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
    /// Largest buffer, in elements, any connection may allocate.
    pub max_buffer: Option<usize>,
    /// Block modules to load before building the topology.
    pub plugin_paths: Vec<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            chunk: 1,
            max_ticks: None,
            max_buffer: None,
            plugin_paths: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Parse from JSON and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read from a JSON file and validate.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Reject values the driver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk == 0 {
            return Err(SimError::InvalidConfig("chunk must be non-zero".into()));
        }
        if self.max_buffer == Some(0) {
            return Err(SimError::InvalidConfig("max_buffer must be non-zero".into()));
        }
        Ok(())
    }

    /// Set the elements per tick.
    pub fn with_chunk(mut self, chunk: usize) -> Self {
        self.chunk = chunk;
        self
    }

    /// Stop after `ticks` ticks.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Cap buffer capacity.
    pub fn with_max_buffer(mut self, elements: usize) -> Self {
        self.max_buffer = Some(elements);
        self
    }

    /// Add a block module to load.
    pub fn with_plugin(mut self, path: impl Into<PathBuf>) -> Self {
        self.plugin_paths.push(path.into());
        self
    }
}
