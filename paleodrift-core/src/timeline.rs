//! The geological time sequence a run is driven by.
//!
//! Time is measured in whole megayears (Ma). The sequence is generated once
//! from `(time_start, time_end, time_step)` and is immutable afterwards;
//! every other component receives slices from it rather than recomputing
//! ranges.

use crate::errors::ConfigError;

/// Geological time in megayears.
pub type Ma = i64;

/// The ordered set of time slices for one run.
///
/// Slices are `start, start + step, ...` up to the largest whole-step value
/// not exceeding `end`. The sequence is never empty: `start` itself is always
/// a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSequence {
    times: Vec<Ma>,
    step: Ma,
}

impl TimeSequence {
    /// Generate the sequence, validating the run parameters.
    pub fn new(start: Ma, end: Ma, step: Ma) -> Result<Self, ConfigError> {
        if step <= 0 {
            return Err(ConfigError::NonPositiveStep(step));
        }
        if start > end {
            return Err(ConfigError::InvertedRange { start, end });
        }

        let mut times = Vec::with_capacity(((end - start) / step + 1) as usize);
        let mut t = start;
        while t <= end {
            times.push(t);
            t += step;
        }
        Ok(Self { times, step })
    }

    pub fn times(&self) -> &[Ma] {
        &self.times
    }

    pub fn step(&self) -> Ma {
        self.step
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> Ma {
        self.times[0]
    }

    pub fn last(&self) -> Ma {
        *self.times.last().unwrap()
    }

    /// Adjacent slice pairs, in order: `(t_0, t_1), (t_1, t_2), ...`
    ///
    /// Reconstruction is only ever invoked for these pairs.
    pub fn intervals(&self) -> impl Iterator<Item = (Ma, Ma)> + '_ {
        self.times.windows(2).map(|w| (w[0], w[1]))
    }
}
