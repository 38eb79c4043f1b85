//! Probabilistic coalition equilibrium.
//!
//! Every actor votes over every pair of options with a strength given by the
//! [`VotingRule`]. The aggregated support defines the probability that one
//! option beats another ([`Victory`]), from which a [`PceVariant`] derives a
//! probability distribution over the options.

use crate::utils::{check_mat, check_num, check_vec};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Default maximum number of refinement passes of the iterative variant.
pub const MAX_PASSES: usize = 64;

/// L1 distance between successive distributions below which the iterative variant has converged.
pub const TOLERANCE: f64 = 1e-12;

/// Map from an actor's weight and utility gap to a directional vote strength.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VotingRule {
    Binary,
    PropBin,
    #[default]
    Proportional,
    PropCbc,
    Cubic,
}

impl VotingRule {
    /// Signed strength of a vote for `a` over `b`, where `gap = u(a) - u(b)`.
    ///
    /// Odd in `gap` and linear in `weight`.
    pub fn vote(self, weight: f64, gap: f64) -> f64 {
        let sgn = if gap > 0.0 {
            1.0
        } else if gap < 0.0 {
            -1.0
        } else {
            0.0
        };
        match self {
            VotingRule::Binary => weight * sgn,
            VotingRule::PropBin => weight * (gap + sgn) / 2.0,
            VotingRule::Proportional => weight * gap,
            VotingRule::PropCbc => weight * (gap + gap.powi(3)) / 2.0,
            VotingRule::Cubic => weight * gap.powi(3),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PceVariant {
    /// Stationary distribution of the challenger chain, refined iteratively.
    #[default]
    MarkovIpcm,
    /// Closed form: each option weighted by its chance of beating every rival.
    ConditionalPcm,
}

/// Pairwise victory probabilities over a list of options.
#[derive(Debug, Clone)]
pub struct Victory {
    n_opt: usize,
    prob: Vec<f64>,
}

impl Victory {
    /// Aggregate the votes of all actors over every pair of options.
    ///
    /// `utilities` holds one row per actor, `weights` one entry per actor.
    pub fn new(weights: &[f64], utilities: &[Vec<f64>], rule: VotingRule) -> Self {
        let n_opt = utilities.first().map_or(0, Vec::len);
        let mut support = vec![0.0; n_opt * n_opt];

        for (&weight, row) in weights.iter().zip(utilities) {
            for a in 0..n_opt {
                for b in (a + 1)..n_opt {
                    let vote = rule.vote(weight, row[a] - row[b]);
                    if vote > 0.0 {
                        support[a * n_opt + b] += vote;
                    } else if vote < 0.0 {
                        support[b * n_opt + a] -= vote;
                    }
                }
            }
        }

        let mut prob = vec![0.5; n_opt * n_opt];
        for a in 0..n_opt {
            for b in 0..n_opt {
                let for_a = support[a * n_opt + b];
                let total = for_a + support[b * n_opt + a];
                if a != b && total > 0.0 {
                    prob[a * n_opt + b] = for_a / total;
                }
            }
        }

        Self { n_opt, prob }
    }

    pub fn n_options(&self) -> usize {
        self.n_opt
    }

    /// Probability that option `a` beats option `b`.
    pub fn beats(&self, a: usize, b: usize) -> f64 {
        self.prob[a * self.n_opt + b]
    }

    /// Contest restricted to `options`, listed in the given order.
    pub fn restrict(&self, options: &[usize]) -> Self {
        let n_opt = options.len();
        let mut prob = Vec::with_capacity(n_opt * n_opt);
        for &a in options {
            for &b in options {
                prob.push(self.beats(a, b));
            }
        }
        Self { n_opt, prob }
    }
}

/// Equilibrium distribution over the options of a contest.
pub fn equilibrium(victory: &Victory, variant: PceVariant) -> Result<Vec<f64>> {
    equilibrium_within(victory, variant, MAX_PASSES)
}

/// Same as [`equilibrium`], giving the iterative variant at most `max_passes` passes.
///
/// # Errors
/// Returns an error if the contest has no options or if the iterative
/// variant has not converged after `max_passes` passes.
pub fn equilibrium_within(
    victory: &Victory,
    variant: PceVariant,
    max_passes: usize,
) -> Result<Vec<f64>> {
    match victory.n_options() {
        0 => bail!("contest must have at least one option"),
        1 => Ok(vec![1.0]),
        _ => match variant {
            PceVariant::MarkovIpcm => markov_ipcm(victory, max_passes),
            PceVariant::ConditionalPcm => conditional_pcm(victory, max_passes),
        },
    }
}

/// Equilibrium over the full option space of a weighted utility matrix.
///
/// Returns one probability per option (column of `utilities`).
pub fn compute_equilibrium(
    weights: &[f64],
    utilities: &[Vec<f64>],
    rule: VotingRule,
    variant: PceVariant,
) -> Result<Vec<f64>> {
    let n_act = weights.len();
    check_num(n_act, 1..).context("invalid number of actors")?;
    let n_opt = utilities.first().map_or(0, Vec::len);
    check_num(n_opt, 1..).context("invalid number of options")?;
    check_vec(weights, n_act, true).context("invalid weights")?;
    check_mat(utilities, (n_act, n_opt)).context("invalid utilities")?;

    equilibrium(&Victory::new(weights, utilities, rule), variant)
}

fn transition_matrix(victory: &Victory) -> Vec<Vec<f64>> {
    let n_opt = victory.n_options();
    let challenge = 1.0 / (n_opt - 1) as f64;
    (0..n_opt)
        .map(|k| {
            let mut row: Vec<f64> = (0..n_opt)
                .map(|j| {
                    if j == k {
                        0.0
                    } else {
                        victory.beats(j, k) * challenge
                    }
                })
                .collect();
            let leave: f64 = row.iter().sum();
            row[k] = (1.0 - leave).max(0.0);
            row
        })
        .collect()
}

fn markov_ipcm(victory: &Victory, max_passes: usize) -> Result<Vec<f64>> {
    let n_opt = victory.n_options();
    let mut trans = transition_matrix(victory);
    let mut prob = vec![1.0 / n_opt as f64; n_opt];

    let mut dist = f64::INFINITY;
    for _ in 0..max_passes {
        let mut next = vec_mat_mul(&prob, &trans);
        normalize(&mut next);
        trans = mat_mul(&trans, &trans);

        dist = prob.iter().zip(&next).map(|(p, q)| (p - q).abs()).sum();
        prob = next;
        if dist < TOLERANCE {
            return Ok(prob);
        }
    }

    bail!("equilibrium failed to converge after {max_passes} passes (residual {dist:e})");
}

fn conditional_pcm(victory: &Victory, max_passes: usize) -> Result<Vec<f64>> {
    let n_opt = victory.n_options();
    let mut prob: Vec<f64> = (0..n_opt)
        .map(|a| {
            (0..n_opt)
                .filter(|&b| b != a)
                .map(|b| victory.beats(a, b))
                .product()
        })
        .collect();

    if prob.iter().sum::<f64>() <= 0.0 {
        log::debug!("every option is beaten with certainty, falling back to the Markov chain");
        return markov_ipcm(victory, max_passes);
    }
    normalize(&mut prob);
    Ok(prob)
}

fn normalize(vec: &mut [f64]) {
    vec.iter_mut().for_each(|ele| *ele = ele.max(0.0));
    let sum: f64 = vec.iter().sum();
    if sum > 0.0 {
        vec.iter_mut().for_each(|ele| *ele /= sum);
    }
}

fn vec_mat_mul(vec: &[f64], mat: &[Vec<f64>]) -> Vec<f64> {
    let mut out = vec![0.0; mat.first().map_or(0, Vec::len)];
    for (&v, row) in vec.iter().zip(mat) {
        for (o, &m) in out.iter_mut().zip(row) {
            *o += v * m;
        }
    }
    out
}

fn mat_mul(a: &[Vec<f64>], b: &[Vec<f64>]) -> Vec<Vec<f64>> {
    a.iter().map(|row| vec_mat_mul(row, b)).collect()
}
