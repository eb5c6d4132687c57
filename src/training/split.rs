//! Stratified train/test splitting

use crate::error::{CardioError, Result};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Row indices for one split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so that each class keeps its proportion in the holdout.
///
/// Every class is shuffled with a `ChaCha8Rng` seeded from `seed` and gives
/// `round(n_c * test_size)` rows to the test set, clamped to `[1, n_c - 1]`
/// when the class has at least two rows. Both outputs are sorted.
pub fn stratified_split_indices(labels: &[f64], test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(CardioError::ConfigError(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    // BTreeMap keyed by the label bits keeps class iteration order stable
    let mut by_class: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        if !label.is_finite() {
            return Err(CardioError::DataError(format!("non-finite label at row {}", i)));
        }
        by_class.entry(label.to_bits()).or_default().push(i);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n_c = indices.len();

        let mut n_test = (n_c as f64 * test_size).round() as usize;
        if n_c >= 2 {
            n_test = n_test.clamp(1, n_c - 1);
        }

        test.extend_from_slice(&indices[..n_test]);
        train.extend_from_slice(&indices[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();

    Ok(SplitIndices { train, test })
}

/// Rows of `df` at `indices`, in the given order
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n_neg: usize, n_pos: usize) -> Vec<f64> {
        let mut y = vec![0.0; n_neg];
        y.extend(vec![1.0; n_pos]);
        y
    }

    #[test]
    fn test_stratified_counts() {
        let y = labels(60, 40);
        let split = stratified_split_indices(&y, 0.2, 42).unwrap();

        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);

        let test_pos = split.test.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(test_pos, 8);
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let y = labels(13, 7);
        let split = stratified_split_indices(&y, 0.2, 1).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let y = labels(30, 30);
        let a = stratified_split_indices(&y, 0.2, 42).unwrap();
        let b = stratified_split_indices(&y, 0.2, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_small_class_keeps_one_row_each_side() {
        let y = labels(10, 2);
        let split = stratified_split_indices(&y, 0.2, 42).unwrap();

        let test_pos = split.test.iter().filter(|&&i| y[i] == 1.0).count();
        let train_pos = split.train.iter().filter(|&&i| y[i] == 1.0).count();
        assert_eq!(test_pos, 1);
        assert_eq!(train_pos, 1);
    }

    #[test]
    fn test_invalid_test_size() {
        assert!(matches!(
            stratified_split_indices(&[0.0, 1.0], 1.5, 42),
            Err(CardioError::ConfigError(_))
        ));
    }

    #[test]
    fn test_take_rows() {
        let df = df!("a" => &[10, 20, 30, 40]).unwrap();
        let taken = take_rows(&df, &[3, 1]).unwrap();
        let a: Vec<Option<i32>> = taken.column("a").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(40), Some(20)]);
    }
}
