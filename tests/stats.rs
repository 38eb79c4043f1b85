use pmatrix::stats::{Accumulator, centered_correlation, compute_mean};
use pmatrix::utils::{arg_max, rescale_rows};

#[test]
fn accumulator_tracks_mean_and_std_dev() {
    let mut acc = Accumulator::new();
    for val in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
        acc.add(val);
    }
    let report = acc.report();
    assert!((report.mean - 5.0).abs() < 1e-12);
    assert!((report.std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);

    let report = Accumulator::new().report();
    assert!(report.mean.is_nan() && report.std_dev.is_nan());
}

#[test]
fn correlation_of_linear_series() {
    let x = [1.0, 2.0, 3.0, 4.0];
    let y = [3.0, 5.0, 7.0, 9.0];
    let z = [4.0, 3.0, 2.0, 1.0];
    assert!((centered_correlation(&x, &y) - 1.0).abs() < 1e-12);
    assert!((centered_correlation(&x, &z) + 1.0).abs() < 1e-12);
    assert!(centered_correlation(&x, &[1.0, 1.0, 1.0, 1.0]).is_nan());
    assert!(centered_correlation(&x, &y[..3]).is_nan());
    assert_eq!(compute_mean(&x), 2.5);
}

#[test]
fn arg_max_prefers_lowest_index() {
    assert_eq!(arg_max(&[0.1, 0.7, 0.7, 0.2]), Some(1));
    assert_eq!(arg_max(&[]), None);
}

#[test]
fn rows_are_rescaled_independently() {
    let rescaled = rescale_rows(&[vec![2.0, 4.0, 6.0], vec![-1.0, -1.0, -1.0]], 0.0, 1.0);
    assert_eq!(rescaled[0], vec![0.0, 0.5, 1.0]);
    assert_eq!(rescaled[1], vec![0.0, 0.0, 0.0]);
}
