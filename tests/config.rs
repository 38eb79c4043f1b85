use pmatrix::config::{Config, FitConfig, ModelConfig};
use pmatrix::dynamics::{McnDraw, StepRule};
use pmatrix::model::InitialPositions;
use pmatrix::pce::{PceVariant, VotingRule};
use std::{fs, path::PathBuf};

fn write_config(name: &str, contents: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join("config_tests");
    fs::create_dir_all(&dir).expect("failed to create test directory");
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write config file");
    path
}

#[test]
fn partial_config_keeps_defaults() {
    let contents = String::new()
        + "[model]\n"
        + "step_rule = \"susn\"\n"
        + "voting_rule = \"cubic\"\n"
        + "initial = \"central\"\n"
        + "\n"
        + "[fit]\n"
        + "population = 16\n";
    let path = write_config("partial.toml", &contents);
    let cfg = Config::from_file(&path).expect("failed to load config");

    assert_eq!(cfg.model.step_rule, StepRule::Susn);
    assert_eq!(cfg.model.voting_rule, VotingRule::Cubic);
    assert_eq!(cfg.model.initial, Some(InitialPositions::Central));
    assert_eq!(cfg.model.pce_variant, PceVariant::MarkovIpcm);
    assert_eq!(cfg.model.mcn_draw, McnDraw::Sample);
    assert_eq!(cfg.model.max_iter, 1000);
    assert_eq!(cfg.model.max_passes, 64);
    assert_eq!(cfg.fit.population, 16);
    assert_eq!(cfg.fit.risk, 0.5);
}

#[test]
fn empty_config_is_default() {
    let path = write_config("empty.toml", "");
    assert_eq!(
        Config::from_file(&path).expect("failed to load config"),
        Config::default()
    );
    assert!(Config::default().validate().is_ok());
}

#[test]
fn invalid_configs_are_rejected() {
    let cases = [
        ("ceiling.toml", "[model]\nmax_iter = 0\n"),
        ("passes.toml", "[model]\nmax_passes = 0\n"),
        ("rule.toml", "[model]\nstep_rule = \"random\"\n"),
        ("unknown.toml", "[model]\nseed = 3\n"),
        ("risk.toml", "[fit]\nrisk = 2.0\n"),
        ("population.toml", "[fit]\npopulation = 2\n"),
        ("slack.toml", "[fit]\nshift_slack = 0.5\n"),
    ];
    for (name, contents) in cases {
        let path = write_config(name, contents);
        assert!(Config::from_file(&path).is_err(), "{name} should be rejected");
    }
    assert!(Config::from_file("does/not/exist.toml").is_err());
}

#[test]
fn sections_validate_on_their_own() {
    let model = ModelConfig {
        max_passes: 0,
        ..ModelConfig::default()
    };
    assert!(model.validate().is_err());

    let fit = FitConfig {
        population: 0,
        ..FitConfig::default()
    };
    assert!(fit.validate().is_err());

    assert!(ModelConfig::default().validate().is_ok());
    assert!(FitConfig::default().validate().is_ok());
}
