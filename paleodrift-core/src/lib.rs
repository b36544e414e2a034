//! Core orchestration for coupled paleoclimate simulation runs.
//!
//! A run advances two stateful simulators (atmosphere and hydrosphere) across
//! a sequence of discrete geological time slices. Between each pair of
//! adjacent slices, scalar fields (temperature, precipitation, salinity) are
//! reconstructed onto the evolving land/sea configuration so that downstream
//! map rendering always works with grids that are physically valid at both
//! endpoints of the interval.
//!
//! The crate is organised around the control loop, not the physics:
//!
//! - [`orchestrator`] drives the slice loop and owns failure isolation,
//! - [`simulator`] is the narrow contract to the opaque solver processes,
//! - [`reconstruct`] implements the interval reconstruction contract,
//! - [`bathymetry`] resolves land/sea masks per time and dataset variant,
//! - [`maps`] is the batch map-generation boundary that runs after the loop.
//!
//! The solvers themselves, the plotting backend and config-schema evolution
//! are external collaborators consumed through these seams.

pub mod bathymetry;
pub mod config;
pub mod errors;
pub mod grid;
pub mod maps;
pub mod orchestrator;
pub mod reconstruct;
pub mod simulator;
pub mod timeline;
pub mod xyz;
