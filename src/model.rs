use crate::pce::{MAX_PASSES, PceVariant, Victory, VotingRule, equilibrium_within};
use crate::utils::{arg_max, check_mat, check_num, check_vec};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Simulated decision-maker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub name: String,
    pub weight: f64,
}

/// Actors, their utilities over the options and the voting setup.
///
/// Immutable once constructed. The pairwise victory probabilities over the
/// full option space do not depend on positions, so they are computed once
/// and restricted to the occupied options of each state.
#[derive(Debug, Clone)]
pub struct Scenario {
    actors: Vec<Actor>,
    weights: Vec<f64>,
    utilities: Vec<Vec<f64>>,
    voting_rule: VotingRule,
    pce_variant: PceVariant,
    max_passes: usize,
    victory: Victory,
}

impl Scenario {
    /// Create a new `Scenario`.
    ///
    /// # Errors
    /// Returns an error if there are no actors or options, if the dimensions
    /// of `names`, `weights` and `utilities` disagree, or if the weights are
    /// negative or all zero.
    pub fn new(
        names: Vec<String>,
        weights: Vec<f64>,
        utilities: Vec<Vec<f64>>,
        voting_rule: VotingRule,
        pce_variant: PceVariant,
    ) -> Result<Self> {
        let n_act = names.len();
        check_num(n_act, 1..).context("invalid number of actors")?;
        let n_opt = utilities.first().map_or(0, Vec::len);
        check_num(n_opt, 1..).context("invalid number of options")?;

        check_vec(&weights, n_act, true).context("invalid weights")?;
        check_mat(&utilities, (n_act, n_opt)).context("invalid utilities")?;

        let victory = Victory::new(&weights, &utilities, voting_rule);
        let actors = names
            .into_iter()
            .zip(&weights)
            .map(|(name, &weight)| Actor { name, weight })
            .collect();

        Ok(Self {
            actors,
            weights,
            utilities,
            voting_rule,
            pce_variant,
            max_passes: MAX_PASSES,
            victory,
        })
    }

    /// Limit the refinement passes of the iterative equilibrium.
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    pub fn n_actors(&self) -> usize {
        self.actors.len()
    }

    pub fn n_options(&self) -> usize {
        self.victory.n_options()
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn utilities(&self) -> &[Vec<f64>] {
        &self.utilities
    }

    pub fn voting_rule(&self) -> VotingRule {
        self.voting_rule
    }

    pub fn pce_variant(&self) -> PceVariant {
        self.pce_variant
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Aggregate weighted utility of every option (`W x U`).
    pub fn zeta(&self) -> Vec<f64> {
        (0..self.n_options())
            .map(|j| {
                self.weights
                    .iter()
                    .zip(&self.utilities)
                    .map(|(w, row)| w * row[j])
                    .sum()
            })
            .collect()
    }

    /// Option maximizing aggregate weighted utility.
    pub fn central_option(&self) -> usize {
        arg_max(&self.zeta()).unwrap_or(0)
    }

    /// Option maximizing the utility of `actor`.
    pub fn favorite_option(&self, actor: usize) -> usize {
        arg_max(&self.utilities[actor]).unwrap_or(0)
    }

    /// Equilibrium over the full option space.
    pub fn equilibrium(&self) -> Result<Vec<f64>> {
        equilibrium_within(&self.victory, self.pce_variant, self.max_passes)
    }

    /// Equilibrium restricted to the distinct options occupied by `positions`.
    pub fn position_dist(&self, positions: &[usize]) -> Result<PDist> {
        let (options, slots) = occupied(positions);
        let victory = self.victory.restrict(&options);
        let prob = equilibrium_within(&victory, self.pce_variant, self.max_passes)
            .with_context(|| format!("failed to compute equilibrium over options {options:?}"))?;
        Ok(PDist {
            prob,
            options,
            slots,
        })
    }

    /// Expected utility of every actor given `positions`.
    pub fn expected_utilities(&self, positions: &[usize]) -> Result<Vec<f64>> {
        let dist = self.position_dist(positions)?;
        Ok(self
            .utilities
            .iter()
            .map(|row| dist.expected_utility(row))
            .collect())
    }
}

/// Policy assigning actors to their first positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitialPositions {
    /// Everyone starts at the option maximizing aggregate weighted utility.
    Central,
    /// Everyone starts at their own favorite option.
    SelfInterested,
}

/// Viewpoint from which a state's distribution is assessed.
///
/// Utilities are common knowledge, so every actor shares the view of
/// the whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    All,
    Actor(usize),
}

/// Equilibrium probability mass over the options occupied in a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PDist {
    /// Probability of each occupied option.
    pub prob: Vec<f64>,
    /// Occupied options, in order of first occurrence.
    pub options: Vec<usize>,
    /// Position slot (actor index) where each option first occurs.
    pub slots: Vec<usize>,
}

impl PDist {
    fn expected_utility(&self, row: &[f64]) -> f64 {
        self.prob
            .iter()
            .zip(&self.options)
            .map(|(p, &opt)| p * row[opt])
            .sum()
    }
}

/// Distinct options in `positions` and the slot of their first occurrence.
pub fn occupied(positions: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut options = Vec::new();
    let mut slots = Vec::new();
    for (slot, &opt) in positions.iter().enumerate() {
        if !options.contains(&opt) {
            options.push(opt);
            slots.push(slot);
        }
    }
    (options, slots)
}

/// Assignment of every actor to an option at one time step.
///
/// Derived quantities are computed on first use and never change afterwards.
#[derive(Debug)]
pub struct State {
    positions: Vec<usize>,
    util_cache: OnceLock<Vec<Vec<f64>>>,
    dist_cache: OnceLock<PDist>,
}

impl State {
    /// Create a new `State`.
    ///
    /// # Errors
    /// Returns an error if there is not exactly one position per actor or if
    /// a position is not a valid option.
    pub fn new(scenario: &Scenario, positions: Vec<usize>) -> Result<Self> {
        let n_act = scenario.n_actors();
        if positions.len() != n_act {
            bail!(
                "state must have {n_act} positions, but has {}",
                positions.len()
            );
        }
        let n_opt = scenario.n_options();
        for (actor, &opt) in positions.iter().enumerate() {
            check_num(opt, 0..n_opt)
                .with_context(|| format!("invalid position of actor {actor}"))?;
        }
        Ok(Self {
            positions,
            util_cache: OnceLock::new(),
            dist_cache: OnceLock::new(),
        })
    }

    /// Initial state under the given assignment policy.
    pub fn initial(scenario: &Scenario, policy: InitialPositions) -> Result<Self> {
        let positions = match policy {
            InitialPositions::Central => vec![scenario.central_option(); scenario.n_actors()],
            InitialPositions::SelfInterested => (0..scenario.n_actors())
                .map(|actor| scenario.favorite_option(actor))
                .collect(),
        };
        Self::new(scenario, positions)
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn position(&self, actor: usize) -> usize {
        self.positions[actor]
    }

    /// Utility of every actor (rows) for every actor's current position (columns).
    pub fn util_over_positions(&self, scenario: &Scenario) -> &[Vec<f64>] {
        self.util_cache.get_or_init(|| {
            scenario
                .utilities()
                .iter()
                .map(|row| self.positions.iter().map(|&opt| row[opt]).collect())
                .collect()
        })
    }

    /// Equilibrium distribution over the distinct options occupied in this state.
    pub fn prob_dist(&self, scenario: &Scenario, perspective: Perspective) -> Result<&PDist> {
        if let Perspective::Actor(actor) = perspective {
            check_num(actor, 0..scenario.n_actors()).context("invalid perspective")?;
        }
        if let Some(dist) = self.dist_cache.get() {
            return Ok(dist);
        }
        let dist = scenario.position_dist(&self.positions)?;
        Ok(self.dist_cache.get_or_init(|| dist))
    }

    /// Expected utility of every actor: utility over positions times the
    /// distribution, mapped back through the first-occurrence slots.
    pub fn expected_utilities(&self, scenario: &Scenario) -> Result<Vec<f64>> {
        let dist = self.prob_dist(scenario, Perspective::All)?;
        let util = self.util_over_positions(scenario);
        Ok(util
            .iter()
            .map(|row| {
                dist.prob
                    .iter()
                    .zip(&dist.slots)
                    .map(|(p, &slot)| p * row[slot])
                    .sum()
            })
            .collect())
    }

    /// Two states are equivalent iff every actor holds the same option in both.
    pub fn equiv(&self, other: &State) -> bool {
        self.positions == other.positions
    }
}

pub fn equiv_states(a: &State, b: &State) -> bool {
    a.equiv(b)
}
