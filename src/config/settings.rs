// src/config/settings.rs
//! Calculation settings.
//!
//! Lookup order, later sources winning:
//! 1. Built-in defaults
//! 2. `<config dir>/rangecalc/config.ron` (optional)
//! 3. `RANGECALC_*` environment variables, e.g. `RANGECALC_ITERATIONS=50000`
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Serialize, Deserialize};

use crate::error::CalcError;

pub const DEFAULT_ITERATIONS: usize = 10_000;
pub const DEFAULT_HISTOGRAM_BINS: usize = 23;
pub const MAX_ITERATIONS: usize = 10_000_000;
pub const MAX_HISTOGRAM_BINS: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub iterations: usize,
    pub histogram_bins: usize,
    /// Percentiles (0-100) reported for every simulation.
    pub percentiles: Vec<f64>,
    /// Extra confidence level reported next to the 90/95/99% intervals.
    pub confidence: f64,
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            percentiles: vec![5.0, 25.0, 50.0, 75.0, 95.0],
            confidence: 0.9995,
            seed: None,
        }
    }
}

impl Settings {
    /// Loads settings from the default config file location and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path().as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("RANGECALC")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("percentiles"),
        );

        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), CalcError> {
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(CalcError::Config(format!(
                "iterations must be between 1 and {}",
                MAX_ITERATIONS
            )));
        }
        if !(1..=MAX_HISTOGRAM_BINS).contains(&self.histogram_bins) {
            return Err(CalcError::Config(format!(
                "histogram_bins must be between 1 and {}",
                MAX_HISTOGRAM_BINS
            )));
        }
        if let Some(p) = self.percentiles.iter().find(|p| !(0.0..=100.0).contains(*p)) {
            return Err(CalcError::Config(format!("percentile {} is outside 0-100", p)));
        }
        if !(0.0..1.0).contains(&self.confidence) {
            return Err(CalcError::Config(format!(
                "confidence {} must be in [0, 1)",
                self.confidence
            )));
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rangecalc").join("config.ron"))
}
