use crate::analysis::{Observer, Readout};
use crate::convergence::{Detector, Termination};
use crate::dynamics::{McnDraw, StepRule};
use crate::model::{InitialPositions, Scenario, State};
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Simulation engine.
///
/// Holds the scenario, the selected step rule, the random number generator
/// and the history of states, and runs the dynamics until the detector stops them.
pub struct Engine {
    scenario: Scenario,
    step_rule: StepRule,
    mcn_draw: McnDraw,
    detector: Detector,
    rng: ChaCha12Rng,
    history: Vec<State>,
}

impl Engine {
    /// Create a new `Engine` whose history starts from the given assignment policy.
    pub fn new(
        scenario: Scenario,
        initial: InitialPositions,
        step_rule: StepRule,
        mcn_draw: McnDraw,
        detector: Detector,
        seed: u64,
    ) -> Result<Self> {
        let state =
            State::initial(&scenario, initial).context("failed to generate initial state")?;
        Ok(Self {
            scenario,
            step_rule,
            mcn_draw,
            detector,
            rng: ChaCha12Rng::seed_from_u64(seed),
            history: vec![state],
        })
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn history(&self) -> &[State] {
        &self.history
    }

    pub fn last_state(&self) -> &State {
        &self.history[self.history.len() - 1]
    }

    /// Advance the dynamics until a repeated state or the iteration ceiling.
    pub fn run(&mut self, observer: &mut dyn Observer) -> Result<Termination> {
        observer.on_state(0, &self.history[0], &self.scenario);

        if self.scenario.n_options() == 1 {
            let termination = Termination::SingleOption;
            observer.on_stop(&termination);
            return Ok(termination);
        }

        log::debug!("iteration ceiling is {}", self.detector.max_iter());
        let mut iteration = 0;
        loop {
            let state = self
                .step_rule
                .step(
                    &self.scenario,
                    &self.history[iteration],
                    self.mcn_draw,
                    &mut self.rng,
                )
                .with_context(|| {
                    format!(
                        "failed to perform step at iteration {iteration} ({} actors, {} options)",
                        self.scenario.n_actors(),
                        self.scenario.n_options()
                    )
                })?;
            self.history.push(state);
            iteration += 1;

            observer.on_state(iteration, &self.history[iteration], &self.scenario);

            if let Some(termination) = self.detector.should_stop(iteration, &self.history) {
                observer.on_stop(&termination);
                return Ok(termination);
            }
        }
    }

    /// Distribution and expected utilities of the last state.
    pub fn readout(&self) -> Result<Readout> {
        Readout::new(self.last_state(), &self.scenario)
    }
}
