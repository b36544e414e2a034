//! Run configuration: per-simulator configs and the named-variant registry.
//!
//! A run is parametrized by a single variant name. The variant fully
//! determines which config files, bathymetry dataset directory and file-name
//! suffix are used for the whole run; nothing is selected by ambient flags
//! after startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::timeline::Ma;

/// Declarative configuration of one simulator.
///
/// Only the time axis and the output location are interpreted here; every
/// other key is solver-specific and passed through opaquely.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub time_start: Ma,
    pub time_end: Ma,
    pub time_step: Ma,
    pub output_path: PathBuf,
    /// Solver executable override; defaults to `<model>-solver` when absent.
    #[serde(default)]
    pub solver_command: Option<PathBuf>,
    /// Solver parameters the orchestrator never inspects.
    #[serde(flatten)]
    pub solver: toml::Table,
}

impl SimulationConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_step <= 0 {
            return Err(ConfigError::NonPositiveStep(self.time_step));
        }
        if self.time_start > self.time_end {
            return Err(ConfigError::InvertedRange {
                start: self.time_start,
                end: self.time_end,
            });
        }
        Ok(())
    }

    pub fn time_axis(&self) -> (Ma, Ma, Ma) {
        (self.time_start, self.time_end, self.time_step)
    }

    /// The coupled loop requires both simulators to march the same slices.
    pub fn require_matching_axes(atm: &Self, hyd: &Self) -> Result<(), ConfigError> {
        if atm.time_axis() != hyd.time_axis() {
            return Err(ConfigError::TimeAxisMismatch {
                atm: atm.time_axis(),
                hyd: hyd.time_axis(),
            });
        }
        Ok(())
    }
}

/// One named configuration/dataset variant.
#[derive(Debug, Clone, Deserialize)]
pub struct RunVariant {
    pub config_atm: PathBuf,
    pub config_hyd: PathBuf,
    /// Directory holding the per-time bathymetry grids.
    pub topo_dir: PathBuf,
    /// Dataset file-name suffix, e.g. `Golonka` in `140Ma_Golonka.xyz`.
    pub topo_suffix: String,
}

/// Registry mapping variant names to their config and dataset selection.
///
/// Adding a reconstruction dataset means adding a registry entry, not a new
/// branch in the driver.
#[derive(Debug, Deserialize)]
pub struct VariantRegistry {
    variants: BTreeMap<String, RunVariant>,
}

impl VariantRegistry {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    pub fn get(&self, name: &str) -> Result<&RunVariant, ConfigError> {
        self.variants
            .get(name)
            .ok_or_else(|| ConfigError::UnknownVariant {
                name: name.to_string(),
                available: self.names(),
            })
    }

    pub fn names(&self) -> Vec<String> {
        self.variants.keys().cloned().collect()
    }
}
