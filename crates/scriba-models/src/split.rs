//! Seeded index shuffles, the validation split and the k-fold partition.

/// Fisher-Yates shuffle of `0..n` driven by a seeded RNG.
pub(crate) fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = oorandom::Rand32::new(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.rand_range(0..(i as u32 + 1)) as usize;
        indices.swap(i, j);
    }
    indices
}

/// Split `0..n` into a training set and a held-out fraction.
///
/// The held-out side gets `ceil(n * fraction)` items but never all of
/// them; with fewer than two items everything stays on the training side.
pub(crate) fn train_val_split(n: usize, fraction: f32, seed: u64) -> (Vec<usize>, Vec<usize>) {
    if n < 2 {
        return ((0..n).collect(), Vec::new());
    }
    let indices = shuffled_indices(n, seed);
    let held_out = (((n as f32) * fraction).ceil() as usize).clamp(1, n - 1);
    let (val, train) = indices.split_at(held_out);
    (train.to_vec(), val.to_vec())
}

/// Partition `0..n` into `k` disjoint, jointly exhaustive folds.
pub(crate) fn kfold_partition(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let indices = shuffled_indices(n, seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    for (i, index) in indices.into_iter().enumerate() {
        folds[i % k].push(index);
    }
    folds
}

/// Split paired data into train and test sides by a train fraction.
///
/// Mirrors the original corpus split helper: the first `n * fraction`
/// shuffled items train, the rest evaluate.
pub fn holdout_split<T: Clone, U: Clone>(
    x: &[T],
    y: &[U],
    train_fraction: f32,
    seed: u64,
) -> (Vec<T>, Vec<U>, Vec<T>, Vec<U>) {
    assert_eq!(x.len(), y.len());
    let indices = shuffled_indices(x.len(), seed);
    let cut = ((x.len() as f32) * train_fraction) as usize;
    let mut x_train = Vec::with_capacity(cut);
    let mut y_train = Vec::with_capacity(cut);
    let mut x_test = Vec::new();
    let mut y_test = Vec::new();
    for (rank, index) in indices.into_iter().enumerate() {
        if rank < cut {
            x_train.push(x[index].clone());
            y_train.push(y[index].clone());
        } else {
            x_test.push(x[index].clone());
            y_test.push(y[index].clone());
        }
    }
    (x_train, y_train, x_test, y_test)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shuffle_is_a_permutation() {
        let indices = shuffled_indices(100, 7);
        let unique: HashSet<_> = indices.iter().collect();
        assert_eq!(unique.len(), 100);
    }

    #[test]
    fn test_shuffle_is_deterministic() {
        assert_eq!(shuffled_indices(50, 3), shuffled_indices(50, 3));
        assert_ne!(shuffled_indices(50, 3), shuffled_indices(50, 4));
    }

    #[test]
    fn test_train_val_split_sizes() {
        let (train, val) = train_val_split(100, 0.1, 1);
        assert_eq!(train.len(), 90);
        assert_eq!(val.len(), 10);

        let (train, val) = train_val_split(3, 0.1, 1);
        assert_eq!(val.len(), 1);
        assert_eq!(train.len(), 2);

        let (train, val) = train_val_split(1, 0.1, 1);
        assert_eq!(train.len(), 1);
        assert!(val.is_empty());
    }

    #[test]
    fn test_kfold_partition_covers_everything_disjointly() {
        let folds = kfold_partition(23, 5, 9);
        assert_eq!(folds.len(), 5);
        let mut seen = HashSet::new();
        for fold in &folds {
            for &index in fold {
                assert!(seen.insert(index));
            }
        }
        assert_eq!(seen.len(), 23);
        assert!(folds.iter().all(|fold| !fold.is_empty()));
    }

    #[test]
    fn test_holdout_split_keeps_pairing() {
        let x: Vec<usize> = (0..20).collect();
        let y: Vec<usize> = (0..20).map(|v| v * 10).collect();
        let (x_train, y_train, x_test, y_test) = holdout_split(&x, &y, 0.9, 5);
        assert_eq!(x_train.len(), 18);
        assert_eq!(x_test.len(), 2);
        for (a, b) in x_train.iter().zip(&y_train) {
            assert_eq!(*b, *a * 10);
        }
        for (a, b) in x_test.iter().zip(&y_test) {
            assert_eq!(*b, *a * 10);
        }
    }
}
