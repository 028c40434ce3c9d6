// SPDX-License-Identifier: PMPL-1.0-or-later

//! Tool configuration
//!
//! Read from a YAML or JSON file when one is given; every field has a
//! default so an empty file (or none at all) is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineConfig,
    pub compiler: CompilerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest clause nesting a resolution may reach before the branch fails
    pub max_depth: usize,
    /// Stop after this many solutions per goal
    pub max_solutions: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_solutions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Warn when one rule lowers into more alternatives than this
    pub expansion_warning: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            expansion_warning: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { color: true }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            serde_json::from_str(&data).context("parsing config json")
        } else if data.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yaml::from_str(&data).context("parsing config yaml")
        }
    }

    /// Load `path` if given, otherwise defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}
