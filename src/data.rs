use crate::utils::{check_mat, check_num, check_vec};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

fn read_toml<T, P>(file: P) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let file = file.as_ref();
    let contents = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
    toml::from_str(&contents).with_context(|| format!("failed to deserialize {file:?}"))
}

/// Explicit scenario: actor names, weights and utilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioData {
    pub actors: Vec<String>,
    pub weights: Vec<f64>,
    /// One row per actor, one column per option.
    pub utilities: Vec<Vec<f64>>,
}

impl ScenarioData {
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        read_toml(file)
    }
}

/// Observed outcome data to fit weights against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Outcomes {
    pub actors: Vec<String>,
    /// Raw outcome value of every option for every actor (one row per actor).
    pub values: Vec<Vec<f64>>,
    /// Observed per-option outcome scores, if measured directly.
    #[serde(default)]
    pub scores: Option<Vec<f64>>,
}

impl Outcomes {
    pub fn new(
        actors: Vec<String>,
        values: Vec<Vec<f64>>,
        scores: Option<Vec<f64>>,
    ) -> Result<Self> {
        let outcomes = Self {
            actors,
            values,
            scores,
        };
        outcomes.validate()?;
        Ok(outcomes)
    }

    /// Load [`Outcomes`] from a TOML file and validate them.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let outcomes: Self = read_toml(file)?;
        outcomes.validate().context("failed to validate outcomes")?;
        Ok(outcomes)
    }

    pub fn n_actors(&self) -> usize {
        self.actors.len()
    }

    pub fn n_options(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_num(self.n_actors(), 1..).context("invalid number of actors")?;
        check_num(self.n_options(), 1..).context("invalid number of options")?;
        check_mat(&self.values, (self.n_actors(), self.n_options()))
            .context("invalid outcome values")?;
        if let Some(scores) = &self.scores {
            check_vec(scores, self.n_options(), false).context("invalid outcome scores")?;
        }
        Ok(())
    }
}
