//! CLI configuration
//!
//! Per-phase log levels plus the optional JSON settings file
//! (`--config ebs.json`).

use ebs_config::{LimitConfig, Phase};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::Level;

/// CLI log configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    pub phases: HashMap<Phase, Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::WARN,
            phases: HashMap::new(),
        }
    }
}

impl LogConfig {
    pub fn level_for(&self, phase: Phase) -> Level {
        self.phases.get(&phase).copied().unwrap_or(self.global)
    }

    /// Apply a `phase=level` override, e.g. `parser=trace`
    pub fn apply_override(&mut self, spec: &str) -> Result<(), String> {
        let (phase, level) = spec
            .split_once('=')
            .ok_or_else(|| format!("Expected PHASE=LEVEL, got '{spec}'"))?;
        let phase = parse_phase(phase)?;
        self.phases.insert(phase, parse_level(level)?);
        Ok(())
    }
}

/// Contents of the settings file; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    pub limits: Option<LimitConfig>,
    pub log_level: Option<String>,
    /// Phase name to level
    pub log: HashMap<String, String>,
}

impl FileSettings {
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))
    }

    /// Fold the file's log settings into `log`
    pub fn apply_to(&self, log: &mut LogConfig) -> Result<(), String> {
        if let Some(level) = &self.log_level {
            log.global = parse_level(level)?;
        }
        for (phase, level) in &self.log {
            log.phases.insert(parse_phase(phase)?, parse_level(level)?);
        }
        Ok(())
    }
}

pub fn parse_level(s: &str) -> Result<Level, String> {
    match s.to_lowercase().as_str() {
        // silent = only errors
        "silent" | "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(format!("Unknown log level '{s}'")),
    }
}

fn parse_phase(s: &str) -> Result<Phase, String> {
    Phase::ALL
        .into_iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("Unknown phase '{s}'"))
}
