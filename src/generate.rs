use crate::model::InitialPositions;
use crate::utils::rescale_rows;
use anyhow::Result;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Randomly generated scenario inputs.
#[derive(Debug, Clone)]
pub struct Generated {
    pub names: Vec<String>,
    pub weights: Vec<f64>,
    pub utilities: Vec<Vec<f64>>,
    pub initial: InitialPositions,
}

/// Generate a random scenario.
///
/// Fully random utilities would give actors no reason to cooperate, so each
/// actor's values are averaged with those of the actors three places away,
/// which correlates the actors into groups.
pub fn random_scenario<R: Rng>(rng: &mut R) -> Result<Generated> {
    let initial = if rng.random_bool(0.5) {
        InitialPositions::Central
    } else {
        InitialPositions::SelfInterested
    };
    let n_act: usize = rng.random_range(10..25);
    let n_opt: usize = rng.random_range(8..30);

    let salience_dist = Uniform::new(5.0_f64, 10.0)?;
    let weights = (0..n_act)
        .map(|_| salience_dist.sample(rng).powi(2))
        .collect();

    let value_dist = Uniform::new(-1000.0_f64, 10_000.0)?;
    let raw: Vec<Vec<f64>> = (0..n_act)
        .map(|_| (0..n_opt).map(|_| value_dist.sample(rng)).collect())
        .collect();
    let grouped: Vec<Vec<f64>> = (0..n_act)
        .map(|i| {
            let i_prev = (i + n_act - 3) % n_act;
            let i_next = (i + 3) % n_act;
            (0..n_opt)
                .map(|j| (raw[i_prev][j] + raw[i][j] + raw[i_next][j]) / 3.0)
                .collect()
        })
        .collect();
    let utilities = rescale_rows(&grouped, 0.0, 1.0);

    let names = (0..n_act).map(|i| format!("Actor-{i:02}")).collect();

    Ok(Generated {
        names,
        weights,
        utilities,
        initial,
    })
}
