//! Error taxonomy for a paleoclimate run.
//!
//! Each enum covers one failure domain because the domains differ in
//! fatality: a [`ConfigError`] aborts before the loop starts, a
//! [`SimulatorError`] aborts the remaining slices, a [`ReconstructionError`]
//! is contained to one field/interval, and a [`MapError`] is contained at the
//! outermost boundary after the simulation has already succeeded.
//!
//! Nothing here retries: every failure stems from bad configuration or
//! missing/corrupt upstream data, which retrying cannot fix.

use std::path::PathBuf;

use thiserror::Error;

use crate::timeline::Ma;
use crate::xyz::XyzError;

/// Invalid run parameters, detected before any simulator is advanced.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("time_step must be positive, got {0}")]
    NonPositiveStep(Ma),

    #[error("time_start {start} Ma is after time_end {end} Ma")]
    InvertedRange { start: Ma, end: Ma },

    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },

    /// The two simulator configs must describe the same time axis, otherwise
    /// the coupled loop has no well-defined slice sequence.
    #[error(
        "atmosphere and hydrosphere configs disagree on the time axis: \
         (start, end, step) = {atm:?} vs {hyd:?}"
    )]
    TimeAxisMismatch { atm: (Ma, Ma, Ma), hyd: (Ma, Ma, Ma) },

    #[error("unknown variant {name:?}, available variants: {available:?}")]
    UnknownVariant {
        name: String,
        available: Vec<String>,
    },
}

/// Fatal failure inside a simulator advance.
///
/// Solver state after a failed advance is not trusted, so these always abort
/// the remaining slices.
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("{model} solver failed at {time} Ma: {message}")]
    Fatal {
        model: String,
        time: Ma,
        message: String,
    },

    /// Slices must be advanced in strictly increasing order; solver state
    /// only moves forward.
    #[error("{model} advance out of order: {requested} Ma requested after reaching {reached} Ma")]
    OutOfOrder {
        model: String,
        requested: Ma,
        reached: Ma,
    },

    #[error("failed to launch {model} solver {}", command.display())]
    Spawn {
        model: String,
        command: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reconstructing one field over one interval.
///
/// Contained per field/interval: the orchestrator records it and continues
/// with the other fields and the following intervals.
#[derive(Debug, Error)]
pub enum ReconstructionError {
    #[error("missing simulator output for {field} at {time} Ma: {}", path.display())]
    MissingInput {
        field: &'static str,
        time: Ma,
        path: PathBuf,
    },

    #[error(
        "mask grids for {time_a} Ma and {time_b} Ma have incompatible shapes \
         {shape_a:?} vs {shape_b:?}"
    )]
    MaskMismatch {
        time_a: Ma,
        time_b: Ma,
        shape_a: (usize, usize),
        shape_b: (usize, usize),
    },

    #[error("{field} grid at {time} Ma has shape {grid:?} but the mask has shape {mask:?}")]
    GridMismatch {
        field: &'static str,
        time: Ma,
        grid: (usize, usize),
        mask: (usize, usize),
    },

    #[error(transparent)]
    Grid(#[from] XyzError),
}

/// Failure inside the batch map-generation stage.
///
/// Caught at the top-level boundary only; the simulation results already
/// persisted stay valid.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer failed for {}: {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error(transparent)]
    Grid(#[from] XyzError),
}

/// Top-level failure of a run: either the run never started, or a simulator
/// died mid-loop at a known slice.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("run aborted at slice {time} Ma")]
    Simulator {
        time: Ma,
        #[source]
        source: SimulatorError,
    },
}
