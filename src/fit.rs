//! Estimation of actor weights from observed outcomes.
//!
//! The fit is under-determined: many weightings reproduce the same outcome
//! distribution. Besides the best solution (`baseline`) the search therefore
//! reports the most different weighting that is still acceptable (`shifted`).

use crate::config::FitConfig;
use crate::data::Outcomes;
use crate::pce::{PceVariant, Victory, VotingRule, equilibrium};
use crate::stats::{Accumulator, centered_correlation};
use crate::utils::rescale_rows;
use anyhow::{Context, Result, bail};
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

const ELITES: usize = 2;
const TOURNAMENT: usize = 3;
const INIT_STEP: f64 = 0.1;
const MIN_STEP: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    /// The probability error reached the tolerance.
    Converged,
    /// The search budget ran out; the best solution found is returned.
    Approximate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    pub weights: Vec<f64>,
    pub error: f64,
    pub distribution: Vec<f64>,
    pub correlation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub utilities: Vec<Vec<f64>>,
    pub target: Vec<f64>,
    pub baseline: Solution,
    pub shifted: Solution,
    pub status: FitStatus,
    pub evaluations: usize,
}

/// Risk-adjusted utilities from raw outcome values.
///
/// Rows are rescaled to `[0, 1]` and bent by `u = (1 + r) v - r v^2`.
pub fn utilities_from_values(values: &[Vec<f64>], risk: f64) -> Vec<Vec<f64>> {
    rescale_rows(values, 0.0, 1.0)
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|v| (1.0 + risk) * v - risk * v * v)
                .collect()
        })
        .collect()
}

/// Per-option scores implied by the raw values: column means of the rescaled rows.
pub fn implied_scores(values: &[Vec<f64>]) -> Vec<f64> {
    let rescaled = rescale_rows(values, 0.0, 1.0);
    let n_opt = values.first().map_or(0, Vec::len);
    (0..n_opt)
        .map(|j| rescaled.iter().map(|row| row[j]).sum::<f64>() / rescaled.len() as f64)
        .collect()
}

/// Normalize observed scores into a probability distribution.
pub fn target_distribution(scores: &[f64]) -> Result<Vec<f64>> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let shift = if min < 0.0 { -min } else { 0.0 };
    let sum: f64 = scores.iter().map(|s| s + shift).sum();
    if sum.is_nan() || sum <= 0.0 {
        bail!("observed scores must not all be equal to the minimum");
    }
    Ok(scores.iter().map(|s| (s + shift) / sum).collect())
}

/// Sum of squared differences between two distributions.
pub fn prob_error(dist: &[f64], target: &[f64]) -> f64 {
    dist.iter().zip(target).map(|(p, t)| (p - t).powi(2)).sum()
}

struct Objective<'a> {
    utilities: &'a [Vec<f64>],
    target: &'a [f64],
    rule: VotingRule,
    variant: PceVariant,
}

impl Objective<'_> {
    fn distribution(&self, weights: &[f64]) -> Result<Vec<f64>> {
        let victory = Victory::new(weights, self.utilities, self.rule);
        equilibrium(&victory, self.variant)
    }

    fn error(&self, weights: &[f64]) -> Result<f64> {
        if weights.iter().all(|&w| w <= 0.0) {
            return Ok(f64::INFINITY);
        }
        Ok(prob_error(&self.distribution(weights)?, self.target))
    }

    fn errors(&self, candidates: &[Vec<f64>]) -> Result<Vec<f64>> {
        candidates
            .par_iter()
            .map(|weights| self.error(weights))
            .collect()
    }

    fn solution(&self, weights: Vec<f64>, error: f64) -> Result<Solution> {
        let distribution = self.distribution(&weights)?;
        let correlation = centered_correlation(&distribution, self.target);
        Ok(Solution {
            weights,
            error,
            distribution,
            correlation,
        })
    }
}

/// Search for weights whose equilibrium reproduces the observed outcomes.
///
/// Deterministic for a given state of `rng`.
///
/// # Errors
/// Returns an error if `outcomes` or `cfg` are invalid, or if an
/// equilibrium cannot be computed.
pub fn fit<R: Rng>(
    outcomes: &Outcomes,
    cfg: &FitConfig,
    rule: VotingRule,
    variant: PceVariant,
    rng: &mut R,
) -> Result<FitResult> {
    cfg.validate().context("invalid fit parameters")?;
    outcomes.validate().context("invalid outcomes")?;

    let utilities = utilities_from_values(&outcomes.values, cfg.risk);
    let scores = match &outcomes.scores {
        Some(scores) => scores.clone(),
        None => implied_scores(&outcomes.values),
    };
    let target = target_distribution(&scores).context("failed to build target distribution")?;
    let objective = Objective {
        utilities: &utilities,
        target: &target,
        rule,
        variant,
    };

    let mut evaluations = 0;
    let archive = evolve(&objective, cfg, outcomes.n_actors(), rng, &mut evaluations)
        .context("failed to evolve population")?;

    let (start, start_err) = archive
        .iter()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(w, e)| (w.clone(), *e))
        .context("population search produced no candidates")?;
    let (best, best_err) = refine(&objective, cfg, start, start_err, &mut evaluations)
        .context("failed to refine best candidate")?;

    let max_shifted_err = cfg.tolerance.max(best_err) * cfg.shift_slack;
    let (shifted, shifted_err) =
        most_distant(&archive, &best, max_shifted_err).unwrap_or_else(|| (best.clone(), best_err));
    if shifted == best {
        log::warn!("no distinct shifted regime within the allowed error");
    }

    let status = if best_err <= cfg.tolerance {
        FitStatus::Converged
    } else {
        log::warn!(
            "search budget exhausted after {evaluations} evaluations, best error {best_err:.3e}"
        );
        FitStatus::Approximate
    };

    let baseline = objective.solution(best, best_err)?;
    let shifted = objective.solution(shifted, shifted_err)?;

    Ok(FitResult {
        utilities,
        target,
        baseline,
        shifted,
        status,
        evaluations,
    })
}

/// Genetic search; returns every evaluated candidate with its error.
fn evolve<R: Rng>(
    objective: &Objective,
    cfg: &FitConfig,
    n_act: usize,
    rng: &mut R,
    evaluations: &mut usize,
) -> Result<Vec<(Vec<f64>, f64)>> {
    let gene_dist = Uniform::new_inclusive(0.0_f64, 1.0)?;
    let noise_dist = Normal::new(0.0, cfg.mutation_std_dev)?;
    let prob_mut = 1.0 / n_act as f64;

    let mut population: Vec<Vec<f64>> = (0..cfg.population)
        .map(|_| (0..n_act).map(|_| gene_dist.sample(rng)).collect())
        .collect();
    let mut archive = Vec::with_capacity(cfg.population * cfg.generations);

    for generation in 0..cfg.generations {
        let errors = objective.errors(&population)?;
        *evaluations += population.len();

        let mut ranked: Vec<usize> = (0..population.len()).collect();
        ranked.sort_by(|&a, &b| errors[a].total_cmp(&errors[b]));
        let best_err = errors[ranked[0]];

        let mut acc = Accumulator::new();
        for &error in errors.iter().filter(|e| e.is_finite()) {
            acc.add(error);
        }
        let report = acc.report();
        log::debug!(
            "generation {generation}: best {best_err:.3e}, mean {:.3e}, std dev {:.3e}",
            report.mean,
            report.std_dev
        );

        let tournament = |rng: &mut R| {
            (0..TOURNAMENT)
                .map(|_| rng.random_range(0..population.len()))
                .min_by(|&a, &b| errors[a].total_cmp(&errors[b]))
                .unwrap_or(0)
        };

        let mut next: Vec<Vec<f64>> = ranked
            .iter()
            .take(ELITES)
            .map(|&idx| population[idx].clone())
            .collect();
        while next.len() < population.len() {
            let a = &population[tournament(rng)];
            let b = &population[tournament(rng)];
            let child = a
                .iter()
                .zip(b)
                .map(|(&x, &y)| {
                    let mut gene = x + rng.random::<f64>() * (y - x);
                    if rng.random_bool(prob_mut) {
                        gene += noise_dist.sample(rng);
                    }
                    gene.clamp(0.0, 1.0)
                })
                .collect();
            next.push(child);
        }

        archive.extend(population.into_iter().zip(errors));
        population = next;

        if best_err <= cfg.tolerance {
            log::info!("tolerance reached at generation {generation}");
            break;
        }
    }

    Ok(archive)
}

/// Coordinate hill climbing with a shrinking step.
fn refine(
    objective: &Objective,
    cfg: &FitConfig,
    mut weights: Vec<f64>,
    mut error: f64,
    evaluations: &mut usize,
) -> Result<(Vec<f64>, f64)> {
    let mut step = INIT_STEP;
    for _ in 0..cfg.refine_steps {
        if error <= cfg.tolerance || step < MIN_STEP {
            break;
        }

        let trials: Vec<Vec<f64>> = (0..weights.len())
            .flat_map(|k| {
                [step, -step].map(|delta| {
                    let mut trial = weights.clone();
                    trial[k] = (trial[k] + delta).clamp(0.0, 1.0);
                    trial
                })
            })
            .collect();
        let errors = objective.errors(&trials)?;
        *evaluations += trials.len();

        let best = errors
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .filter(|&(_, &e)| e < error);
        match best {
            Some((idx, &e)) => {
                weights = trials[idx].clone();
                error = e;
            }
            None => step /= 2.0,
        }
    }
    Ok((weights, error))
}

fn normalized(weights: &[f64]) -> Vec<f64> {
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| w / sum).collect()
}

/// Acceptable candidate whose relative weights differ most from `best`.
fn most_distant(
    archive: &[(Vec<f64>, f64)],
    best: &[f64],
    max_error: f64,
) -> Option<(Vec<f64>, f64)> {
    let best_norm = normalized(best);
    let mut found: Option<(f64, &Vec<f64>, f64)> = None;
    for (weights, error) in archive {
        if *error > max_error {
            continue;
        }
        let dist: f64 = normalized(weights)
            .iter()
            .zip(&best_norm)
            .map(|(a, b)| (a - b).abs())
            .sum();
        if found.is_none_or(|(found_dist, _, _)| dist > found_dist) {
            found = Some((dist, weights, *error));
        }
    }
    found.map(|(_, weights, error)| (weights.clone(), error))
}
