//! Train/test splitting and k-fold partitioning.
//!
//! The stratified variants keep each class's share of the data roughly
//! constant across parts. Shuffling is seeded so runs are reproducible.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use voxscreen_core::{Error, Result};

/// Train and test row indices
pub type Split = (Vec<usize>, Vec<usize>);

fn shuffled_groups(labels: &[i64], rng: &mut StdRng) -> BTreeMap<i64, Vec<usize>> {
    let mut groups: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(idx);
    }
    for members in groups.values_mut() {
        members.shuffle(rng);
    }
    groups
}

/// Hold out `test_size` of every class for testing.
///
/// # Errors
/// Every class needs at least two rows so that it appears on both sides.
pub fn stratified_split(labels: &[i64], test_size: f64, seed: u64) -> Result<Split> {
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(Error::dataset(format!(
            "test size must be between 0 and 1, got {test_size}"
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let groups = shuffled_groups(labels, &mut rng);

    let mut train = Vec::new();
    let mut test = Vec::new();
    for (label, members) in groups {
        if members.len() < 2 {
            return Err(Error::dataset(format!(
                "class {label} has {} row(s); stratified splitting needs at least 2",
                members.len()
            )));
        }
        let n_test = ((members.len() as f64 * test_size).round() as usize).clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Hold out `ceil(test_size * n)` randomly chosen rows, ignoring labels.
pub fn shuffle_split(n: usize, test_size: f64, seed: u64) -> Result<Split> {
    if !(0.0..1.0).contains(&test_size) || test_size == 0.0 {
        return Err(Error::dataset(format!(
            "test size must be between 0 and 1, got {test_size}"
        )));
    }

    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(Error::dataset(format!(
            "cannot split {n} row(s) into non-empty train and test parts"
        )));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(&mut StdRng::seed_from_u64(seed));

    let mut test = order[..n_test].to_vec();
    let mut train = order[n_test..].to_vec();
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

/// Partition rows into `k` folds, each used once as the test part.
pub fn stratified_kfold(labels: &[i64], k: usize, seed: u64) -> Result<Vec<Split>> {
    if k < 2 {
        return Err(Error::dataset("cross-validation needs at least 2 folds"));
    }
    if labels.len() < k {
        return Err(Error::dataset(format!(
            "cannot make {k} folds from {} rows",
            labels.len()
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut fold_of = vec![0usize; labels.len()];
    let mut next = 0usize;
    for members in shuffled_groups(labels, &mut rng).into_values() {
        for idx in members {
            fold_of[idx] = next % k;
            next += 1;
        }
    }

    Ok((0..k)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..labels.len()).partition(|&i| fold_of[i] == fold);
            (train, test)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_shuffle_split_sizes() {
        let (train, test) = shuffle_split(5, 0.2, 42).unwrap();
        assert_eq!(test.len(), 1);
        assert_eq!(train.len(), 4);

        let (train, test) = shuffle_split(11, 0.2, 42).unwrap();
        assert_eq!(test.len(), 3);
        let mut all: Vec<usize> = train.into_iter().chain(test).collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());

        assert_eq!(shuffle_split(11, 0.2, 7).unwrap(), shuffle_split(11, 0.2, 7).unwrap());
    }

    #[test]
    fn test_shuffle_split_rejects_tiny_inputs() {
        assert!(shuffle_split(1, 0.2, 42).is_err());
        assert!(shuffle_split(0, 0.2, 42).is_err());
        assert!(shuffle_split(10, 1.5, 42).is_err());
    }

    fn labels(zeros: usize, ones: usize) -> Vec<i64> {
        let mut l = vec![0; zeros];
        l.extend(vec![1; ones]);
        l
    }

    #[test]
    fn test_split_keeps_class_shares() {
        let labels = labels(40, 10);
        let (train, test) = stratified_split(&labels, 0.2, 42).unwrap();

        assert_eq!(test.len(), 10);
        assert_eq!(train.len(), 40);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 2);
    }

    #[test]
    fn test_split_is_reproducible() {
        let labels = labels(20, 20);
        assert_eq!(
            stratified_split(&labels, 0.2, 42).unwrap(),
            stratified_split(&labels, 0.2, 42).unwrap()
        );
    }

    #[test]
    fn test_split_rejects_singleton_class() {
        assert!(stratified_split(&labels(5, 1), 0.2, 42).is_err());
        assert!(stratified_split(&labels(5, 5), 0.0, 42).is_err());
    }

    #[test]
    fn test_kfold_covers_every_row_once() {
        let labels = labels(23, 12);
        let folds = stratified_kfold(&labels, 5, 42).unwrap();
        assert_eq!(folds.len(), 5);

        let mut seen = vec![0; labels.len()];
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), labels.len());
            assert!(test.iter().any(|&i| labels[i] == 1));
            for &i in test {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn test_kfold_rejects_too_few_rows() {
        assert!(stratified_kfold(&labels(2, 1), 5, 42).is_err());
        assert!(stratified_kfold(&labels(5, 5), 1, 42).is_err());
    }

    proptest! {
        #[test]
        fn prop_split_partitions_and_keeps_both_classes(
            zeros in 2usize..60,
            ones in 2usize..60,
            seed in any::<u64>(),
        ) {
            let labels = labels(zeros, ones);
            let (train, test) = stratified_split(&labels, 0.2, seed).unwrap();

            prop_assert_eq!(train.len() + test.len(), labels.len());
            prop_assert!(train.iter().all(|i| !test.contains(i)));
            for class in [0, 1] {
                prop_assert!(train.iter().any(|&i| labels[i] == class));
                prop_assert!(test.iter().any(|&i| labels[i] == class));
            }
        }
    }
}
