use pmatrix::pce::{
    MAX_PASSES, PceVariant, Victory, VotingRule, compute_equilibrium, equilibrium,
    equilibrium_within,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

const RULES: [VotingRule; 5] = [
    VotingRule::Binary,
    VotingRule::PropBin,
    VotingRule::Proportional,
    VotingRule::PropCbc,
    VotingRule::Cubic,
];
const VARIANTS: [PceVariant; 2] = [PceVariant::MarkovIpcm, PceVariant::ConditionalPcm];

fn random_inputs(rng: &mut ChaCha12Rng) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n_act = rng.random_range(1..12);
    let n_opt = rng.random_range(1..10);
    let weights = (0..n_act).map(|_| rng.random_range(0.1..10.0)).collect();
    let utilities = (0..n_act)
        .map(|_| (0..n_opt).map(|_| rng.random::<f64>()).collect())
        .collect();
    (weights, utilities)
}

#[test]
fn distribution_is_a_probability_vector() {
    let mut rng = ChaCha12Rng::seed_from_u64(7);
    for _ in 0..40 {
        let (weights, utilities) = random_inputs(&mut rng);
        for rule in RULES {
            for variant in VARIANTS {
                let prob = compute_equilibrium(&weights, &utilities, rule, variant)
                    .expect("failed to compute equilibrium");
                assert_eq!(prob.len(), utilities[0].len());
                assert!(prob.iter().all(|&p| p >= 0.0), "negative entry in {prob:?}");
                let sum: f64 = prob.iter().sum();
                assert!((sum - 1.0).abs() < 1e-9, "sum is {sum} for {rule:?} {variant:?}");
            }
        }
    }
}

#[test]
fn equilibrium_is_deterministic() {
    let mut rng = ChaCha12Rng::seed_from_u64(11);
    let (weights, utilities) = random_inputs(&mut rng);
    let rule = VotingRule::Proportional;
    for variant in VARIANTS {
        let first = compute_equilibrium(&weights, &utilities, rule, variant)
            .expect("failed to compute equilibrium");
        let second = compute_equilibrium(&weights, &utilities, rule, variant)
            .expect("failed to compute equilibrium");
        assert_eq!(first, second);
    }
}

#[test]
fn scaling_weights_leaves_equilibrium_unchanged() {
    let mut rng = ChaCha12Rng::seed_from_u64(13);
    let variant = PceVariant::MarkovIpcm;
    for _ in 0..10 {
        let (weights, utilities) = random_inputs(&mut rng);
        let scaled: Vec<f64> = weights.iter().map(|w| w * 3.7).collect();
        for rule in RULES {
            let prob = compute_equilibrium(&weights, &utilities, rule, variant)
                .expect("failed to compute equilibrium");
            let prob_scaled = compute_equilibrium(&scaled, &utilities, rule, variant)
                .expect("failed to compute equilibrium");
            for (p, q) in prob.iter().zip(&prob_scaled) {
                assert!((p - q).abs() < 1e-9, "{prob:?} != {prob_scaled:?}");
            }
        }
    }
}

#[test]
fn single_option_gets_all_mass() {
    for variant in VARIANTS {
        let prob = compute_equilibrium(&[1.0], &[vec![0.3]], VotingRule::Proportional, variant)
            .expect("failed to compute equilibrium");
        assert_eq!(prob, vec![1.0]);
    }
}

#[test]
fn dominant_option_gets_all_mass() {
    let utilities = vec![
        vec![1.0, 0.2, 0.0],
        vec![0.9, 0.0, 0.5],
        vec![1.0, 0.3, 0.1],
    ];
    let rule = VotingRule::Proportional;
    for variant in VARIANTS {
        let prob = compute_equilibrium(&[1.0, 2.0, 3.0], &utilities, rule, variant)
            .expect("failed to compute equilibrium");
        assert!(prob[0] > 1.0 - 1e-9, "{prob:?}");
    }
}

#[test]
fn balanced_contest_splits_evenly() {
    let utilities = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let prob = compute_equilibrium(
        &[2.0, 2.0],
        &utilities,
        VotingRule::Proportional,
        PceVariant::MarkovIpcm,
    )
    .expect("failed to compute equilibrium");
    assert!((prob[0] - 0.5).abs() < 1e-12);
    assert!((prob[1] - 0.5).abs() < 1e-12);
}

#[test]
fn two_options_follow_weight_ratio() {
    let utilities = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let prob = compute_equilibrium(
        &[3.0, 1.0],
        &utilities,
        VotingRule::Proportional,
        PceVariant::MarkovIpcm,
    )
    .expect("failed to compute equilibrium");
    assert!((prob[0] - 0.75).abs() < 1e-9, "{prob:?}");
}

#[test]
fn votes_are_odd_and_linear() {
    for rule in RULES {
        for gap in [-0.7, -0.1, 0.0, 0.4, 1.0] {
            assert_eq!(rule.vote(2.0, gap), -rule.vote(2.0, -gap));
            assert!((rule.vote(6.0, gap) - 3.0 * rule.vote(2.0, gap)).abs() < 1e-12);
        }
    }
    assert_eq!(VotingRule::Binary.vote(2.0, 0.01), 2.0);
    assert_eq!(VotingRule::Proportional.vote(2.0, 0.5), 1.0);
    assert_eq!(VotingRule::Cubic.vote(2.0, 0.5), 0.25);
}

#[test]
fn restricted_contest_matches_full_contest() {
    let weights = [1.0, 2.0, 0.5];
    let utilities = vec![
        vec![0.1, 0.9, 0.4, 0.0],
        vec![0.8, 0.2, 0.6, 1.0],
        vec![0.3, 0.3, 0.9, 0.5],
    ];
    let full = Victory::new(&weights, &utilities, VotingRule::Proportional);
    let restricted = full.restrict(&[3, 1]);
    assert_eq!(restricted.n_options(), 2);
    assert_eq!(restricted.beats(0, 1), full.beats(3, 1));
    assert_eq!(restricted.beats(1, 0), full.beats(1, 3));
    assert!((full.beats(3, 1) + full.beats(1, 3) - 1.0).abs() < 1e-12);

    let prob =
        equilibrium(&restricted, PceVariant::MarkovIpcm).expect("failed to compute equilibrium");
    assert_eq!(prob.len(), 2);
}

#[test]
fn indifferent_actors_split_evenly() {
    let prob = compute_equilibrium(
        &[1.0, 1.0],
        &[vec![0.5, 0.5, 0.5], vec![0.2, 0.2, 0.2]],
        VotingRule::Proportional,
        PceVariant::MarkovIpcm,
    )
    .expect("failed to compute equilibrium");
    for p in prob {
        assert!((p - 1.0 / 3.0).abs() < 1e-12);
    }
}

#[test]
fn invalid_inputs_are_rejected() {
    let utilities = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
    let rule = VotingRule::Proportional;
    let variant = PceVariant::MarkovIpcm;

    assert!(compute_equilibrium(&[0.0, 0.0], &utilities, rule, variant).is_err());
    assert!(compute_equilibrium(&[1.0, -1.0], &utilities, rule, variant).is_err());
    assert!(compute_equilibrium(&[1.0], &utilities, rule, variant).is_err());
    assert!(compute_equilibrium(&[], &[], rule, variant).is_err());
    assert!(compute_equilibrium(&[1.0], &[vec![]], rule, variant).is_err());
    let ragged = vec![vec![1.0, 0.0], vec![0.5]];
    assert!(compute_equilibrium(&[1.0, 1.0], &ragged, rule, variant).is_err());
}

#[test]
fn exhausted_pass_budget_is_an_error() {
    let utilities = vec![
        vec![1.0, 0.2, 0.0],
        vec![0.9, 0.0, 0.5],
        vec![1.0, 0.3, 0.1],
    ];
    let victory = Victory::new(&[1.0, 2.0, 3.0], &utilities, VotingRule::Proportional);

    let err = equilibrium_within(&victory, PceVariant::MarkovIpcm, 1)
        .expect_err("one pass should not reach the equilibrium");
    let msg = format!("{err:#}");
    assert!(msg.contains("failed to converge after 1 passes"), "{msg}");

    let prob = equilibrium_within(&victory, PceVariant::MarkovIpcm, MAX_PASSES)
        .expect("failed to compute equilibrium");
    assert!(prob[0] > 1.0 - 1e-9, "{prob:?}");

    let prob = equilibrium_within(&victory, PceVariant::ConditionalPcm, 1)
        .expect("closed form should not need passes");
    assert!(prob[0] > 1.0 - 1e-9, "{prob:?}");
}
