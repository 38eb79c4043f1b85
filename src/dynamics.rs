//! Step rules advancing one state to the next.

use crate::model::{Perspective, Scenario, State};
use crate::utils::arg_max;
use anyhow::{Context, Result};
use rand::Rng;
use rand_distr::{Distribution, weighted::WeightedIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimum gain in expected utility for a move to be worth making.
pub const IMPROVE_TOL: f64 = 1e-10;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepRule {
    /// Sequential unilateral best responses.
    Susn,
    /// Pairwise coalition bargaining.
    Bcn,
    /// Positions drawn from the equilibrium itself.
    #[default]
    Mcn,
}

/// How the Markov coalition rule turns the distribution into positions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum McnDraw {
    #[default]
    Sample,
    Mode,
}

impl StepRule {
    pub fn step<R: Rng>(
        self,
        scenario: &Scenario,
        state: &State,
        draw: McnDraw,
        rng: &mut R,
    ) -> Result<State> {
        let positions = match self {
            StepRule::Susn => step_susn(scenario, state)?,
            StepRule::Bcn => step_bcn(scenario, state)?,
            StepRule::Mcn => step_mcn(scenario, state, draw, rng)?,
        };
        State::new(scenario, positions)
    }
}

fn step_susn(scenario: &Scenario, state: &State) -> Result<Vec<usize>> {
    let mut positions = state.positions().to_vec();

    for actor in 0..scenario.n_actors() {
        let current = positions[actor];
        let base = scenario.expected_utilities(&positions)?[actor];

        let candidates: Vec<(usize, f64)> = (0..scenario.n_options())
            .into_par_iter()
            .filter(|&opt| opt != current)
            .map(|opt| -> Result<(usize, f64)> {
                let mut trial = positions.clone();
                trial[actor] = opt;
                let eu = scenario.expected_utilities(&trial)?[actor];
                Ok((opt, eu))
            })
            .collect::<Result<_>>()
            .with_context(|| format!("failed to evaluate moves of actor {actor}"))?;

        let mut best: Option<(usize, f64)> = None;
        for (opt, eu) in candidates {
            if eu > base + IMPROVE_TOL && best.is_none_or(|(_, best_eu)| eu > best_eu) {
                best = Some((opt, eu));
            }
        }

        if let Some((opt, eu)) = best {
            log::trace!("actor {actor} moves {current} -> {opt} (eu {base:.4} -> {eu:.4})");
            positions[actor] = opt;
        }
    }

    Ok(positions)
}

struct Proposal {
    partner: usize,
    option: usize,
    gain: f64,
}

fn step_bcn(scenario: &Scenario, state: &State) -> Result<Vec<usize>> {
    let n_act = scenario.n_actors();
    let n_opt = scenario.n_options();
    let mut positions = state.positions().to_vec();

    for actor in 0..n_act {
        let base = scenario.expected_utilities(&positions)?;

        let pairs: Vec<(usize, usize)> = (0..n_act)
            .filter(|&partner| partner != actor)
            .flat_map(|partner| (0..n_opt).map(move |option| (partner, option)))
            .filter(|&(partner, option)| (positions[actor], positions[partner]) != (option, option))
            .collect();

        let proposals: Vec<Option<Proposal>> = pairs
            .par_iter()
            .map(|&(partner, option)| -> Result<Option<Proposal>> {
                let mut trial = positions.clone();
                trial[actor] = option;
                trial[partner] = option;
                let eu = scenario.expected_utilities(&trial)?;
                let gain_actor = eu[actor] - base[actor];
                let gain_partner = eu[partner] - base[partner];
                let improving = gain_actor > IMPROVE_TOL && gain_partner > IMPROVE_TOL;
                Ok(improving.then_some(Proposal {
                    partner,
                    option,
                    gain: gain_actor + gain_partner,
                }))
            })
            .collect::<Result<_>>()
            .with_context(|| format!("failed to evaluate proposals of actor {actor}"))?;

        let mut best: Option<Proposal> = None;
        for proposal in proposals.into_iter().flatten() {
            if best.as_ref().is_none_or(|b| proposal.gain > b.gain) {
                best = Some(proposal);
            }
        }

        if let Some(Proposal {
            partner, option, ..
        }) = best
        {
            log::trace!("actors {actor} and {partner} join at option {option}");
            positions[actor] = option;
            positions[partner] = option;
        }
    }

    Ok(positions)
}

fn step_mcn<R: Rng>(
    scenario: &Scenario,
    state: &State,
    draw: McnDraw,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let dist = state.prob_dist(scenario, Perspective::All)?;
    let n_act = scenario.n_actors();

    let positions = match draw {
        McnDraw::Sample => {
            let option_dist =
                WeightedIndex::new(&dist.prob).context("failed to build option distribution")?;
            (0..n_act)
                .map(|_| dist.options[option_dist.sample(rng)])
                .collect()
        }
        McnDraw::Mode => {
            let mode = arg_max(&dist.prob).unwrap_or(0);
            vec![dist.options[mode]; n_act]
        }
    };

    Ok(positions)
}
