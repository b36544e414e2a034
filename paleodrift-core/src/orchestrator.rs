//! The time-slice control loop.
//!
//! Drives both simulators across the time sequence in strictly increasing
//! order, reconstructs the tracked fields for each completed interval, and
//! finishes with the batch map stage. Failure isolation follows the fatality
//! of each domain: a simulator failure aborts the remaining slices, a
//! reconstruction failure is recorded and the loop continues, and a map
//! failure is caught at this boundary without changing the run outcome.

use tracing::{error, info, warn};

use crate::config::SimulationConfig;
use crate::errors::RunError;
use crate::maps::{MapStage, MapSummary};
use crate::reconstruct::{Field, ReconstructionEngine, TRACKED_FIELDS};
use crate::simulator::Simulator;
use crate::timeline::{Ma, TimeSequence};

/// One recorded reconstruction failure.
#[derive(Debug)]
pub struct FailedInterval {
    pub field: Field,
    pub time_a: Ma,
    pub time_b: Ma,
    pub reason: String,
}

/// Structured outcome of a completed run.
///
/// A run that finished with recorded reconstruction failures is degraded but
/// successful; the report makes the missing intervals explicit instead of
/// letting partial output pass for complete output.
#[derive(Debug)]
pub struct RunReport {
    pub times: Vec<Ma>,
    pub completed_slices: usize,
    pub reconstructed_intervals: usize,
    pub failed_intervals: Vec<FailedInterval>,
    /// `None` when no map stage was configured or it failed.
    pub maps: Option<MapSummary>,
    pub map_failure: Option<String>,
}

impl RunReport {
    fn new(times: Vec<Ma>) -> Self {
        Self {
            times,
            completed_slices: 0,
            reconstructed_intervals: 0,
            failed_intervals: Vec::new(),
            maps: None,
            map_failure: None,
        }
    }

    /// True when every slice and interval completed and maps (if configured)
    /// rendered.
    pub fn is_degraded(&self) -> bool {
        !self.failed_intervals.is_empty() || self.map_failure.is_some()
    }
}

/// Drives one coupled run end to end.
pub struct Orchestrator<A, H> {
    atm: A,
    hyd: H,
    engine: ReconstructionEngine,
    map_stage: Option<MapStage>,
}

impl<A, H> Orchestrator<A, H>
where
    A: Simulator + Send + Sync,
    H: Simulator + Send + Sync,
{
    pub fn new(atm: A, hyd: H, engine: ReconstructionEngine) -> Self {
        Self {
            atm,
            hyd,
            engine,
            map_stage: None,
        }
    }

    /// Attach the batch map stage to run after the loop.
    pub fn with_map_stage(mut self, stage: MapStage) -> Self {
        self.map_stage = Some(stage);
        self
    }

    /// Run the full loop: advance, reconstruct, then generate maps.
    pub fn run(&mut self) -> Result<RunReport, RunError> {
        SimulationConfig::require_matching_axes(self.atm.config(), self.hyd.config())?;
        let config = self.atm.config();
        let sequence =
            TimeSequence::new(config.time_start, config.time_end, config.time_step)?;
        info!(
            start = sequence.first(),
            end = sequence.last(),
            step = sequence.step(),
            slices = sequence.len(),
            "starting coupled run"
        );

        let times = sequence.times().to_vec();
        let mut report = RunReport::new(times.clone());

        for (index, &time) in times.iter().enumerate() {
            // The two models are independent within a slice; both must finish
            // before the interval ending at this slice is reconstructed.
            let (atm_result, hyd_result) = rayon::join(
                || self.atm.run_time_slice(time),
                || self.hyd.run_time_slice(time),
            );
            atm_result.map_err(|source| RunError::Simulator { time, source })?;
            hyd_result.map_err(|source| RunError::Simulator { time, source })?;
            report.completed_slices += 1;

            // Outputs now exist at both endpoints of the interval ending
            // here, so it can be reconstructed.
            if index > 0 {
                self.reconstruct_interval(times[index - 1], time, &mut report);
            }
        }

        if let Some(stage) = &self.map_stage {
            // Only the declared map taxonomy is caught here; the simulation
            // having completed is the primary success criterion.
            match stage.create_all_maps(&sequence) {
                Ok(summary) => report.maps = Some(summary),
                Err(map_error) => {
                    error!(
                        error = %map_error,
                        "map generation failed; simulation outputs remain valid"
                    );
                    report.map_failure = Some(map_error.to_string());
                }
            }
        }

        info!(
            slices = report.completed_slices,
            intervals = report.reconstructed_intervals,
            failed_intervals = report.failed_intervals.len(),
            degraded = report.is_degraded(),
            "run complete"
        );
        for failure in &report.failed_intervals {
            warn!(
                field = %failure.field,
                time_a = failure.time_a,
                time_b = failure.time_b,
                reason = %failure.reason,
                "interval missing from reconstructed output"
            );
        }
        Ok(report)
    }

    /// Reconstruct every tracked field over `(time_a, time_b)`.
    ///
    /// Fields are independent: a failure in one is recorded without touching
    /// the others or the following intervals.
    fn reconstruct_interval(&self, time_a: Ma, time_b: Ma, report: &mut RunReport) {
        use rayon::prelude::*;

        let results: Vec<_> = TRACKED_FIELDS
            .par_iter()
            .map(|&field| (field, self.engine.reconstruct(field, time_a, time_b)))
            .collect();

        for (field, result) in results {
            match result {
                Ok(_) => report.reconstructed_intervals += 1,
                Err(reason) => {
                    warn!(%field, time_a, time_b, %reason, "reconstruction failed");
                    report.failed_intervals.push(FailedInterval {
                        field,
                        time_a,
                        time_b,
                        reason: reason.to_string(),
                    });
                }
            }
        }
    }
}
