//! Seeded train/test splits

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn test_count(n: usize, test_ratio: f64) -> usize {
    if n < 2 {
        return 0;
    }
    ((n as f64 * test_ratio - 1e-9).ceil() as usize).clamp(1, n - 1)
}

/// Shuffle indices `0..n` and hold out `test_ratio` of them
pub fn train_test_split(n: usize, test_ratio: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let n_test = test_count(n, test_ratio);
    let train = indices.split_off(n_test);
    Split { train, test: indices }
}

/// Per-class holdout so the test split keeps the label proportions.
///
/// Classes with a single row stay entirely in the training split.
pub fn stratified_split(labels: &[usize], test_ratio: f64, seed: u64) -> Split {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_classes = labels.iter().max().map_or(0, |m| m + 1);

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &l) in labels.iter().enumerate() {
        by_class[l].push(i);
    }

    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for mut members in by_class {
        members.shuffle(&mut rng);
        let n_test = test_count(members.len(), test_ratio);
        train.extend_from_slice(&members[n_test..]);
        test.extend_from_slice(&members[..n_test]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    Split { train, test }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_and_disjoint() {
        let split = train_test_split(100, 0.2, 42);
        assert_eq!(split.test.len(), 20);
        assert_eq!(split.train.len(), 80);

        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(train_test_split(50, 0.2, 7), train_test_split(50, 0.2, 7));
        assert_ne!(train_test_split(50, 0.2, 7), train_test_split(50, 0.2, 8));
    }

    #[test]
    fn test_stratified_keeps_proportions() {
        let labels: Vec<usize> = (0..100).map(|i| if i < 80 { 0 } else { 1 }).collect();
        let split = stratified_split(&labels, 0.2, 42);

        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(split.test.len(), 20);
        assert_eq!(test_pos, 4);
    }

    #[test]
    fn test_singleton_class_stays_in_train() {
        let split = stratified_split(&[0, 0, 0, 0, 1], 0.2, 1);
        assert!(split.train.contains(&4));
    }
}
