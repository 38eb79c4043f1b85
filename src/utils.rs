use anyhow::{Context, Result, bail};
use std::{fmt::Debug, ops::RangeBounds};

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

/// Check the length of `vec` and that every element is finite.
///
/// With `non_neg` set the elements must also be non-negative
/// and at least one of them must be positive.
pub fn check_vec(vec: &[f64], exp_len: usize, non_neg: bool) -> Result<()> {
    let len = vec.len();
    if len != exp_len {
        bail!("vector length must be {exp_len}, but is {len}");
    }
    if vec.iter().any(|ele| !ele.is_finite()) {
        bail!("vector must have only finite elements");
    }
    if !non_neg {
        return Ok(());
    }
    if vec.iter().any(|&ele| ele < 0.0) {
        bail!("vector must have only non-negative elements");
    }
    if vec.iter().all(|&ele| ele == 0.0) {
        bail!("vector must have at least one positive element");
    }
    Ok(())
}

pub fn check_mat(mat: &[Vec<f64>], exp_dim: (usize, usize)) -> Result<()> {
    let (exp_n_rows, exp_n_cols) = exp_dim;
    let n_rows = mat.len();
    if n_rows != exp_n_rows {
        bail!("matrix must have {exp_n_rows} rows, but has {n_rows}");
    }
    for (i_row, row) in mat.iter().enumerate() {
        check_vec(row, exp_n_cols, false).with_context(|| format!("invalid row {i_row}"))?;
    }
    Ok(())
}

/// Index of the largest element, the lowest index winning ties.
pub fn arg_max(vec: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &val) in vec.iter().enumerate() {
        match best {
            Some((_, best_val)) if val <= best_val => {}
            _ => best = Some((idx, val)),
        }
    }
    best.map(|(idx, _)| idx)
}

/// Linearly map every row onto `[lo, hi]`.
///
/// Constant rows carry no preference and are mapped to `lo`.
pub fn rescale_rows(mat: &[Vec<f64>], lo: f64, hi: f64) -> Vec<Vec<f64>> {
    mat.iter()
        .map(|row| {
            let min = row.iter().copied().fold(f64::INFINITY, f64::min);
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let span = max - min;
            row.iter()
                .map(|&val| {
                    if span > 0.0 {
                        lo + (hi - lo) * (val - min) / span
                    } else {
                        lo
                    }
                })
                .collect()
        })
        .collect()
}
