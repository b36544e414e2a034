//! The narrow contract to the opaque, stateful physical solvers.
//!
//! The orchestrator never touches solver internals: it loads a config,
//! reads the time axis, and advances one slice at a time. Internal state is
//! carried across slices by the solver itself, so advances must happen in
//! strictly increasing time order and a failed advance poisons the model for
//! the rest of the run.

use std::path::PathBuf;
use std::process::Command;

use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::errors::SimulatorError;
use crate::timeline::Ma;

/// Capability contract of a stateful simulator.
///
/// `run_time_slice` advances internal state to `time` and writes per-field
/// grids under `config().output_path/<field>/<time>Ma_<field>.xyz`. Each call
/// depends on all prior calls to the same simulator having completed.
pub trait Simulator {
    fn name(&self) -> &str;

    fn config(&self) -> &SimulationConfig;

    fn run_time_slice(&mut self, time: Ma) -> Result<(), SimulatorError>;
}

/// A simulator backed by a native solver executable.
///
/// Each advance invokes `<command> --config <path> --time <t>`; the solver
/// owns its own state persistence between invocations. A non-zero exit is
/// fatal because the solver's state after a failed step is not trusted.
#[derive(Debug)]
pub struct ProcessSimulator {
    name: String,
    config: SimulationConfig,
    config_path: PathBuf,
    command: PathBuf,
    reached: Option<Ma>,
}

impl ProcessSimulator {
    pub fn new(name: impl Into<String>, config_path: PathBuf, config: SimulationConfig) -> Self {
        let name = name.into();
        let command = config
            .solver_command
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{name}-solver")));
        Self {
            name,
            config,
            config_path,
            command,
            reached: None,
        }
    }

    /// Load the config file and wrap it in a facade.
    pub fn from_config_file(
        name: impl Into<String>,
        config_path: PathBuf,
    ) -> Result<Self, crate::errors::ConfigError> {
        let config = SimulationConfig::from_file(&config_path)?;
        Ok(Self::new(name, config_path, config))
    }

    /// Last time this simulator was advanced to, if any.
    pub fn reached(&self) -> Option<Ma> {
        self.reached
    }
}

impl Simulator for ProcessSimulator {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn run_time_slice(&mut self, time: Ma) -> Result<(), SimulatorError> {
        if let Some(reached) = self.reached {
            if time <= reached {
                return Err(SimulatorError::OutOfOrder {
                    model: self.name.clone(),
                    requested: time,
                    reached,
                });
            }
        }

        info!(model = %self.name, time, "advancing simulator");
        let output = Command::new(&self.command)
            .arg("--config")
            .arg(&self.config_path)
            .arg("--time")
            .arg(time.to_string())
            .output()
            .map_err(|source| SimulatorError::Spawn {
                model: self.name.clone(),
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(5)..].join("; ");
            return Err(SimulatorError::Fatal {
                model: self.name.clone(),
                time,
                message: format!("solver exited with {}: {tail}", output.status),
            });
        }

        debug!(model = %self.name, time, "slice complete");
        self.reached = Some(time);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        toml::from_str("time_start = 0\ntime_end = 10\ntime_step = 5\noutput_path = \"out\"")
            .unwrap()
    }

    fn simulator(command: &str) -> ProcessSimulator {
        let mut config = config();
        config.solver_command = Some(PathBuf::from(command));
        ProcessSimulator::new("atmosphere", PathBuf::from("config_atm.toml"), config)
    }

    #[test]
    fn successful_advance_records_reached_time() {
        let mut sim = simulator("true");
        assert_eq!(sim.reached(), None);
        sim.run_time_slice(0).unwrap();
        assert_eq!(sim.reached(), Some(0));
        sim.run_time_slice(5).unwrap();
        assert_eq!(sim.reached(), Some(5));
    }

    #[test]
    fn out_of_order_advance_is_rejected() {
        let mut sim = simulator("true");
        sim.run_time_slice(5).unwrap();

        let err = sim.run_time_slice(5).unwrap_err();
        assert!(
            matches!(
                err,
                SimulatorError::OutOfOrder {
                    requested: 5,
                    reached: 5,
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn failing_solver_is_fatal_and_does_not_update_state() {
        let mut sim = simulator("false");
        let err = sim.run_time_slice(0).unwrap_err();
        assert!(matches!(err, SimulatorError::Fatal { time: 0, .. }), "{err}");
        assert_eq!(sim.reached(), None);
    }

    #[test]
    fn unlaunchable_solver_reports_spawn_error() {
        let mut sim = simulator("/nonexistent/paleodrift-solver");
        let err = sim.run_time_slice(0).unwrap_err();
        assert!(matches!(err, SimulatorError::Spawn { .. }), "{err}");
    }

    #[test]
    fn default_command_derives_from_model_name() {
        let sim = ProcessSimulator::new("hydrosphere", PathBuf::from("config.toml"), config());
        assert_eq!(sim.command, PathBuf::from("hydrosphere-solver"));
    }
}
