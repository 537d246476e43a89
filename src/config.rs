//! Evaluation settings for a session.

use crate::types::Collation;
use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

/// Largest accepted `div_precision_increment`, as in MySQL.
pub const MAX_DIV_PRECISION_INCREMENT: u32 = 30;

/// Session variables that influence expression evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Digits added to the scale of a division result (default: 4)
    pub div_precision_increment: u32,
    /// Warnings kept per session; later ones are only counted (default: 64)
    pub max_warnings: usize,
    /// Collation given to text literals
    pub default_collation: Collation,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            div_precision_increment: 4,
            max_warnings: 64,
            default_collation: Collation::default(),
        }
    }
}

impl EvalConfig {
    /// Load config from a JSON file, with environment variable overrides.
    /// Falls back to defaults if the file is not found.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut cfg = match fs::read_to_string(path.as_ref()) {
            Ok(s) => serde_json::from_str(&s)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!(
                    "config file {} not found, using defaults",
                    path.as_ref().display()
                );
                EvalConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Apply VIBEXPR_* environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("VIBEXPR_DIV_PRECISION_INCREMENT") {
            match v.parse::<u32>() {
                Ok(n) => self.div_precision_increment = n,
                Err(_) => log::warn!("ignoring VIBEXPR_DIV_PRECISION_INCREMENT={}", v),
            }
        }

        if let Ok(v) = env::var("VIBEXPR_MAX_WARNINGS") {
            match v.parse::<usize>() {
                Ok(n) => self.max_warnings = n,
                Err(_) => log::warn!("ignoring VIBEXPR_MAX_WARNINGS={}", v),
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.div_precision_increment > MAX_DIV_PRECISION_INCREMENT {
            bail!(
                "div_precision_increment must be at most {}, got {}",
                MAX_DIV_PRECISION_INCREMENT,
                self.div_precision_increment
            );
        }
        Ok(())
    }
}
