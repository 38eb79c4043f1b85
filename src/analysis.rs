use crate::convergence::Termination;
use crate::fit::FitResult;
use crate::model::{Perspective, Scenario, State};
use anyhow::{Context, Result};
use rmp_serde::encode;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Receives the progress of a simulation.
pub trait Observer {
    fn on_state(&mut self, iteration: usize, state: &State, scenario: &Scenario);
    fn on_stop(&mut self, termination: &Termination);
}

/// Forwards simulation progress to the `log` facade.
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_state(&mut self, iteration: usize, state: &State, _scenario: &Scenario) {
        log::debug!("state {iteration}: {:?}", state.positions());
    }

    fn on_stop(&mut self, termination: &Termination) {
        log::info!("{termination}");
    }
}

/// Final distribution of a simulation, restricted to the occupied options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Readout {
    pub distribution: Vec<f64>,
    pub occupied_options: Vec<usize>,
    pub slots: Vec<usize>,
    pub expected_utilities: Vec<f64>,
}

impl Readout {
    pub fn new(state: &State, scenario: &Scenario) -> Result<Self> {
        let dist = state
            .prob_dist(scenario, Perspective::All)
            .context("failed to compute final distribution")?;
        let expected_utilities = state.expected_utilities(scenario)?;
        Ok(Self {
            distribution: dist.prob.clone(),
            occupied_options: dist.options.clone(),
            slots: dist.slots.clone(),
            expected_utilities,
        })
    }

    pub fn log(&self, scenario: &Scenario) {
        log::info!("occupied options: {:?}", self.occupied_options);
        for (opt, prob) in self.occupied_options.iter().zip(&self.distribution) {
            log::info!("{opt:2}: {prob:.4}");
        }
        for (actor, eu) in scenario.actors().iter().zip(&self.expected_utilities) {
            log::info!("expected utility of {}: {eu:.4}", actor.name);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub label: String,
    pub seed: u64,
    pub actors: Vec<String>,
    pub weights: Vec<f64>,
    pub history: Vec<Vec<usize>>,
    pub termination: Termination,
    pub readout: Readout,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Report {
    pub runs: Vec<RunReport>,
    pub fit: Option<FitResult>,
}

impl Report {
    /// Save the report as MessagePack.
    pub fn save<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, self).context("failed to serialize report")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}
