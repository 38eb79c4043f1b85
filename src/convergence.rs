use crate::model::State;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default iteration ceiling of a simulation.
pub const MAX_ITER: usize = 1000;

/// Reason a simulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// The state at `iteration` repeats the state at `matched`.
    Cycle { iteration: usize, matched: usize },
    /// The ceiling was exceeded without any repeated state.
    IterationLimit { iteration: usize },
    /// With a single option every state is the same; no step is taken.
    SingleOption,
}

impl Termination {
    pub fn found_cycle(&self) -> bool {
        matches!(self, Termination::Cycle { .. } | Termination::SingleOption)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Cycle { iteration, matched } => write!(
                f,
                "cycle detected at iteration {iteration} matching iteration {matched}"
            ),
            Termination::IterationLimit { iteration } => write!(
                f,
                "iteration limit exceeded at iteration {iteration}, no equilibrium cycle found"
            ),
            Termination::SingleOption => write!(f, "single option, already at a fixed point"),
        }
    }
}

/// Stops a simulation on a repeated state or after too many iterations.
#[derive(Debug, Clone, Copy)]
pub struct Detector {
    max_iter: usize,
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(MAX_ITER)
    }
}

impl Detector {
    pub fn new(max_iter: usize) -> Self {
        Self { max_iter }
    }

    pub fn max_iter(&self) -> usize {
        self.max_iter
    }

    /// Decide whether to stop after the state at `iteration` was produced.
    ///
    /// `history[iteration]` must be the newest state; the caller appends
    /// exactly one state per iteration. A cycle takes precedence over the
    /// ceiling when both happen at the same iteration.
    ///
    /// # Panics
    /// Panics in debug builds if `history` does not end at `iteration`.
    pub fn should_stop(&self, iteration: usize, history: &[State]) -> Option<Termination> {
        debug_assert_eq!(
            history.len(),
            iteration + 1,
            "history must end at iteration {iteration}"
        );
        let newest = history.get(iteration)?;

        let matched = history[..iteration]
            .iter()
            .position(|earlier| earlier.equiv(newest));
        if let Some(matched) = matched {
            return Some(Termination::Cycle { iteration, matched });
        }

        (iteration > self.max_iter).then_some(Termination::IterationLimit { iteration })
    }
}
