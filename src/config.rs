//! Console settings, loadable from JSON.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Execute undocumented opcodes; when false they halt the CPU.
    pub illegal_opcodes: bool,
    /// Host loop cadence in Hz.
    pub frame_rate: f64,
    /// Log one line per executed instruction at trace level.
    pub trace: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            illegal_opcodes: true,
            frame_rate: 60.0,
            trace: false,
        }
    }
}

impl ConsoleConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&contents)
    }
}
