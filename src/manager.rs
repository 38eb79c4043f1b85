use crate::analysis::{LogObserver, Readout, Report, RunReport};
use crate::config::Config;
use crate::convergence::Detector;
use crate::data::{Outcomes, ScenarioData};
use crate::engine::Engine;
use crate::fit::{FitResult, FitStatus, fit};
use crate::generate::random_scenario;
use crate::model::{InitialPositions, Scenario};
use crate::stats::centered_correlation;
use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::path::{Path, PathBuf};

/// Seed used when none is given on the command line.
pub const DEFAULT_SEED: u64 = 0xD67C_AF4F_7F1E_8FA1;

/// Replace a zero seed by a random non-zero one.
pub fn resolve_seed(seed: u64) -> u64 {
    let mut seed = seed;
    while seed == 0 {
        seed = rand::random();
    }
    log::info!("using PRNG seed {seed:020}");
    log::info!("same seed in hex 0x{seed:016X}");
    seed
}

pub struct Manager {
    cfg: Config,
    seed: u64,
    out_file: Option<PathBuf>,
}

impl Manager {
    pub fn new(cfg_file: Option<&Path>, seed: u64, out_file: Option<PathBuf>) -> Result<Self> {
        let cfg = match cfg_file {
            Some(file) => Config::from_file(file).context("failed to construct cfg")?,
            None => Config::default(),
        };
        log::info!("{cfg:#?}");

        Ok(Self {
            cfg,
            seed: resolve_seed(seed),
            out_file,
        })
    }

    /// Generate a random scenario and simulate it.
    pub fn simulate_random(&self) -> Result<()> {
        let mut rng = ChaCha12Rng::seed_from_u64(self.seed);
        let generated = random_scenario(&mut rng).context("failed to generate scenario")?;
        let initial = self.cfg.model.initial.unwrap_or(generated.initial);

        let scenario = self
            .scenario(generated.names, generated.weights, generated.utilities)
            .context("failed to construct generated scenario")?;
        log_landscape(&scenario).context("failed to assess option space")?;

        let run = self.run_model("random", scenario, initial)?;
        self.save(Report {
            runs: vec![run],
            fit: None,
        })
    }

    /// Simulate the scenario stored in `file`.
    pub fn simulate_file<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let data = ScenarioData::from_file(file)
            .with_context(|| format!("failed to load scenario from {file:?}"))?;
        let initial = self
            .cfg
            .model
            .initial
            .unwrap_or(InitialPositions::SelfInterested);

        let scenario = self
            .scenario(data.actors, data.weights, data.utilities)
            .context("failed to construct scenario")?;
        log_landscape(&scenario).context("failed to assess option space")?;

        let run = self.run_model("explicit", scenario, initial)?;
        self.save(Report {
            runs: vec![run],
            fit: None,
        })
    }

    /// Fit weights to the outcomes in `file` and simulate both fitted regimes.
    pub fn fit_file<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        log::info!("fitting {file:?}");
        let outcomes = Outcomes::from_file(file)
            .with_context(|| format!("failed to load outcomes from {file:?}"))?;

        let mut rng = ChaCha12Rng::seed_from_u64(self.seed);
        let fitted = fit(
            &outcomes,
            &self.cfg.fit,
            self.cfg.model.voting_rule,
            self.cfg.model.pce_variant,
            &mut rng,
        )
        .context("failed to fit weights")?;
        log_fit(&fitted);

        let initial = self
            .cfg
            .model
            .initial
            .unwrap_or(InitialPositions::SelfInterested);
        let mut runs = Vec::with_capacity(2);
        for (label, weights) in [
            ("baseline", &fitted.baseline.weights),
            ("shifted", &fitted.shifted.weights),
        ] {
            log::info!("simulating with {label} weights");
            let scenario = self
                .scenario(
                    outcomes.actors.clone(),
                    weights.clone(),
                    fitted.utilities.clone(),
                )
                .with_context(|| format!("failed to construct {label} scenario"))?;
            runs.push(self.run_model(label, scenario, initial)?);
        }

        self.save(Report {
            runs,
            fit: Some(fitted),
        })
    }

    fn scenario(
        &self,
        names: Vec<String>,
        weights: Vec<f64>,
        utilities: Vec<Vec<f64>>,
    ) -> Result<Scenario> {
        let scenario = Scenario::new(
            names,
            weights,
            utilities,
            self.cfg.model.voting_rule,
            self.cfg.model.pce_variant,
        )?;
        Ok(scenario.with_max_passes(self.cfg.model.max_passes))
    }

    fn run_model(
        &self,
        label: &str,
        scenario: Scenario,
        initial: InitialPositions,
    ) -> Result<RunReport> {
        log::info!(
            "{label}: {} actors, {} options, {:?} start, {:?} steps",
            scenario.n_actors(),
            scenario.n_options(),
            initial,
            self.cfg.model.step_rule
        );
        log::info!(
            "{:?} votes, {:?} equilibrium",
            scenario.voting_rule(),
            scenario.pce_variant()
        );

        let mut engine = Engine::new(
            scenario,
            initial,
            self.cfg.model.step_rule,
            self.cfg.model.mcn_draw,
            Detector::new(self.cfg.model.max_iter),
            self.seed,
        )
        .context("failed to construct engine")?;

        let termination = engine
            .run(&mut LogObserver)
            .with_context(|| format!("failed to run {label} simulation"))?;

        let readout: Readout = engine.readout()?;
        readout.log(engine.scenario());

        let scenario = engine.scenario();
        Ok(RunReport {
            label: label.to_string(),
            seed: self.seed,
            actors: scenario.actors().iter().map(|a| a.name.clone()).collect(),
            weights: scenario.weights().to_vec(),
            history: engine
                .history()
                .iter()
                .map(|state| state.positions().to_vec())
                .collect(),
            termination,
            readout,
        })
    }

    fn save(&self, report: Report) -> Result<()> {
        let Some(out_file) = &self.out_file else {
            return Ok(());
        };
        report
            .save(out_file)
            .with_context(|| format!("failed to save report to {out_file:?}"))?;
        log::info!("saved {out_file:?}");
        Ok(())
    }
}

/// Log the equilibrium over the full option space against aggregate utility.
fn log_landscape(scenario: &Scenario) -> Result<()> {
    let prob = scenario.equilibrium()?;
    let zeta = scenario.zeta();
    let log_prob: Vec<f64> = prob.iter().map(|p| p.ln()).collect();

    log::info!("corr(p, zeta): {:.3}", centered_correlation(&prob, &zeta));
    log::info!(
        "corr(ln p, zeta): {:.3}",
        centered_correlation(&log_prob, &zeta)
    );
    for (opt, ((p, lp), z)) in prob.iter().zip(&log_prob).zip(&zeta).enumerate() {
        log::debug!("{opt:2}  {p:6.4}  {lp:+8.3}  {z:5.1}");
    }
    log::info!("central option is {}", scenario.central_option());
    Ok(())
}

fn log_fit(fitted: &FitResult) {
    log::info!("target distribution: {:.4?}", fitted.target);
    for (label, solution) in [
        ("baseline", &fitted.baseline),
        ("shifted", &fitted.shifted),
    ] {
        log::info!(
            "{label}: error {:.3e}, corr {:.3}, weights {:.4?}",
            solution.error,
            solution.correlation,
            solution.weights
        );
    }
    if fitted.status == FitStatus::Approximate {
        log::warn!("fitted weights are approximate");
    }
    log::info!("{} candidate evaluations", fitted.evaluations);
}
