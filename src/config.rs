use crate::convergence::MAX_ITER;
use crate::dynamics::{McnDraw, StepRule};
use crate::model::InitialPositions;
use crate::pce::{MAX_PASSES, PceVariant, VotingRule};
use crate::utils::check_num;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Configuration parameters.
///
/// Every field has a default, so a partial (or missing) file is valid.
/// See [`Config::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub model: ModelConfig,
    pub fit: FitConfig,
}

/// Simulation parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub voting_rule: VotingRule,
    pub pce_variant: PceVariant,
    pub step_rule: StepRule,
    pub mcn_draw: McnDraw,
    /// Starting policy; when unset, random scenarios toss a coin and
    /// explicit scenarios start self-interested.
    pub initial: Option<InitialPositions>,
    /// Iteration ceiling.
    pub max_iter: usize,
    /// Refinement passes allowed to the iterative equilibrium.
    pub max_passes: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            voting_rule: VotingRule::default(),
            pce_variant: PceVariant::default(),
            step_rule: StepRule::default(),
            mcn_draw: McnDraw::default(),
            initial: None,
            max_iter: MAX_ITER,
            max_passes: MAX_PASSES,
        }
    }
}

/// Weight fitting parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FitConfig {
    /// Risk attitude applied to rescaled outcome values.
    pub risk: f64,
    /// Probability error at which the search stops.
    pub tolerance: f64,
    /// Number of candidates per generation.
    pub population: usize,
    /// Number of generations of the population search.
    pub generations: usize,
    /// Number of hill-climbing sweeps refining the best candidate.
    pub refine_steps: usize,
    /// Standard deviation of mutation noise.
    pub mutation_std_dev: f64,
    /// Error slack, relative to the best error, allowed for the shifted regime.
    pub shift_slack: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            risk: 0.5,
            tolerance: 1e-4,
            population: 48,
            generations: 120,
            refine_steps: 200,
            mutation_std_dev: 0.1,
            shift_slack: 2.0,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.model.validate().context("invalid model parameters")?;
        self.fit.validate().context("invalid fit parameters")?;
        Ok(())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.max_iter, 1..=100_000).context("invalid iteration ceiling")?;
        check_num(self.max_passes, 1..=1024).context("invalid number of equilibrium passes")?;
        Ok(())
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        check_num(self.risk, -1.0..=1.0).context("invalid risk attitude")?;
        check_num(self.tolerance, 0.0..1.0).context("invalid fitting tolerance")?;
        check_num(self.population, 4..=10_000).context("invalid population size")?;
        check_num(self.generations, 1..=100_000).context("invalid number of generations")?;
        check_num(self.refine_steps, 0..=100_000).context("invalid number of refine steps")?;
        check_num(self.mutation_std_dev, 0.0..1.0)
            .context("invalid mutation standard deviation")?;
        check_num(self.shift_slack, 1.0..=1e6).context("invalid shift slack")?;
        Ok(())
    }
}
