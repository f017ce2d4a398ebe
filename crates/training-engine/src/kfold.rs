//! Grouped K-Fold Splitting

use crate::TrainingError;
use std::collections::BTreeMap;

/// Sample indices of one train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// K-fold where every group lands in exactly one test partition
#[derive(Debug, Clone, Copy)]
pub struct GroupKFold {
    n_splits: usize,
}

impl GroupKFold {
    /// Create a splitter with the requested fold count
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    /// Fold count actually used for `groups`: the requested count, reduced
    /// to the number of distinct groups when there are fewer.
    pub fn effective_splits(&self, groups: &[String]) -> usize {
        let distinct = groups.iter().collect::<std::collections::HashSet<_>>().len();
        self.n_splits.min(distinct)
    }

    /// Assign groups to folds, largest group first, each to the fold with
    /// the fewest samples so far. Deterministic for a given `groups`.
    pub fn split(&self, groups: &[String]) -> Result<Vec<Fold>, TrainingError> {
        let n_splits = self.effective_splits(groups);
        if n_splits < 2 {
            return Err(TrainingError::InsufficientGroups { found: n_splits });
        }

        let mut sizes: BTreeMap<&str, usize> = BTreeMap::new();
        for group in groups {
            *sizes.entry(group.as_str()).or_default() += 1;
        }

        let mut order: Vec<(&str, usize)> = sizes.into_iter().collect();
        order.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));

        let mut fold_weight = vec![0usize; n_splits];
        let mut assignment: BTreeMap<&str, usize> = BTreeMap::new();
        for (group, size) in order {
            let lightest = (0..n_splits)
                .min_by_key(|&f| (fold_weight[f], f))
                .unwrap_or(0);
            fold_weight[lightest] += size;
            assignment.insert(group, lightest);
        }

        let mut folds = vec![
            Fold {
                train: Vec::new(),
                test: Vec::new(),
            };
            n_splits
        ];
        for (idx, group) in groups.iter().enumerate() {
            let home = assignment[group.as_str()];
            for (f, fold) in folds.iter_mut().enumerate() {
                if f == home {
                    fold.test.push(idx);
                } else {
                    fold.train.push(idx);
                }
            }
        }

        Ok(folds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn groups(sizes: &[(&str, usize)]) -> Vec<String> {
        sizes.iter()
            .flat_map(|(g, n)| std::iter::repeat(g.to_string()).take(*n))
            .collect()
    }

    #[test]
    fn test_balanced_assignment() {
        let g = groups(&[("a", 6), ("b", 4), ("c", 3), ("d", 2), ("e", 1)]);
        let folds = GroupKFold::new(2).split(&g).unwrap();

        assert_eq!(folds.len(), 2);
        // a -> 0, b -> 1, c -> 1, d -> 0, e -> 1
        assert_eq!(folds[0].test.len(), 8);
        assert_eq!(folds[1].test.len(), 8);
    }

    #[test]
    fn test_fold_count_reduced_to_groups() {
        let g = groups(&[("s1", 5), ("s2", 5), ("s3", 5)]);
        let kfold = GroupKFold::new(5);
        assert_eq!(kfold.effective_splits(&g), 3);
        assert_eq!(kfold.split(&g).unwrap().len(), 3);
    }

    #[test]
    fn test_single_group_is_insufficient() {
        let g = groups(&[("only", 10)]);
        assert!(matches!(
            GroupKFold::new(5).split(&g),
            Err(TrainingError::InsufficientGroups { found: 1 })
        ));
        assert!(matches!(
            GroupKFold::new(5).split(&[]),
            Err(TrainingError::InsufficientGroups { found: 0 })
        ));
    }

    proptest! {
        #[test]
        fn prop_groups_never_straddle_partitions(
            labels in proptest::collection::vec(0u8..12, 2..200),
            n_splits in 2usize..8,
        ) {
            let g: Vec<String> = labels.iter().map(|l| format!("g{}", l)).collect();
            let distinct = g.iter().collect::<HashSet<_>>().len();
            prop_assume!(distinct >= 2);

            let folds = GroupKFold::new(n_splits).split(&g).unwrap();
            prop_assert_eq!(folds.len(), n_splits.min(distinct));

            let mut tested = vec![0usize; g.len()];
            for fold in &folds {
                prop_assert!(!fold.test.is_empty());
                prop_assert_eq!(fold.train.len() + fold.test.len(), g.len());

                let train: HashSet<&String> = fold.train.iter().map(|&i| &g[i]).collect();
                let test: HashSet<&String> = fold.test.iter().map(|&i| &g[i]).collect();
                prop_assert!(train.is_disjoint(&test));

                for &i in &fold.test {
                    tested[i] += 1;
                }
            }
            prop_assert!(tested.iter().all(|&t| t == 1));
        }
    }
}
