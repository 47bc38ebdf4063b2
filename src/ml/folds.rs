//! Stratified K-fold assignment of subject IDs.

use rand::Rng;
use rand::seq::SliceRandom;

use super::error::ClassificationError;
use super::pipeline::FoldSplit;

/// Split `ids` into `folds` contiguous groups; the first `len % folds` groups get one extra ID.
pub fn partition<T: Clone>(ids: &[T], folds: usize) -> Vec<Vec<T>> {
    let folds = folds.max(1);
    let base = ids.len() / folds;
    let extra = ids.len() % folds;
    let mut groups = Vec::with_capacity(folds);
    let mut start = 0;
    for fold in 0..folds {
        let size = base + usize::from(fold < extra);
        groups.push(ids[start..start + size].to_vec());
        start += size;
    }
    groups
}

/// Fold assignment of both diagnostic strata, each shuffled and partitioned independently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StratifiedFolds {
    non_diabetic: Vec<Vec<String>>,
    diabetic: Vec<Vec<String>>,
}

impl StratifiedFolds {
    /// Shuffle each stratum with `rng` (non-diabetic first) and cut both into `folds` groups.
    ///
    /// `folds` must be at least 2 and at most the size of the smaller stratum.
    pub fn new<R: Rng + ?Sized>(
        mut non_diabetic: Vec<String>,
        mut diabetic: Vec<String>,
        folds: usize,
        rng: &mut R,
    ) -> Result<Self, ClassificationError> {
        let max = non_diabetic.len().min(diabetic.len());
        if folds < 2 || folds > max {
            return Err(ClassificationError::InvalidFoldCount { folds, max });
        }
        non_diabetic.shuffle(rng);
        diabetic.shuffle(rng);
        Ok(Self {
            non_diabetic: partition(&non_diabetic, folds),
            diabetic: partition(&diabetic, folds),
        })
    }

    pub fn fold_count(&self) -> usize {
        self.non_diabetic.len()
    }

    pub fn non_diabetic(&self) -> &[Vec<String>] {
        &self.non_diabetic
    }

    pub fn diabetic(&self) -> &[Vec<String>] {
        &self.diabetic
    }

    /// Fold `index` of both strata held out; every other fold trains.
    pub fn split(&self, index: usize) -> FoldSplit {
        let others = |groups: &[Vec<String>]| -> Vec<String> {
            groups
                .iter()
                .enumerate()
                .filter(|(fold, _)| *fold != index)
                .flat_map(|(_, ids)| ids.iter().cloned())
                .collect()
        };
        let held_out = |groups: &[Vec<String>]| groups.get(index).cloned().unwrap_or_default();
        FoldSplit {
            train_non_diabetic: others(&self.non_diabetic),
            train_diabetic: others(&self.diabetic),
            test_non_diabetic: held_out(&self.non_diabetic),
            test_diabetic: held_out(&self.diabetic),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ids(prefix: &str, n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    fn partition_sizes_differ_by_at_most_one() {
        let groups = partition(&(0..11).collect::<Vec<_>>(), 4);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 2]);
        let flat: Vec<i32> = groups.concat();
        assert_eq!(flat, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn folds_partition_each_stratum() {
        let mut rng = StdRng::seed_from_u64(3);
        let folds = StratifiedFolds::new(ids("h", 13), ids("d", 7), 5, &mut rng).unwrap();
        for (stratum, expected) in [(folds.non_diabetic(), ids("h", 13)), (folds.diabetic(), ids("d", 7))] {
            let mut all: Vec<String> = stratum.concat();
            all.sort();
            let mut expected = expected;
            expected.sort();
            assert_eq!(all, expected);
            let sizes: Vec<usize> = stratum.iter().map(Vec::len).collect();
            let spread = sizes.iter().max().unwrap() - sizes.iter().min().unwrap();
            assert!(spread <= 1);
        }
        let split = folds.split(2);
        assert_eq!(
            split.train_non_diabetic.len() + split.test_non_diabetic.len(),
            13
        );
        assert!(split.test_diabetic.iter().all(|id| !split.train_diabetic.contains(id)));
    }

    #[test]
    fn same_seed_same_partition() {
        let make = || {
            let mut rng = StdRng::seed_from_u64(11);
            StratifiedFolds::new(ids("h", 10), ids("d", 10), 5, &mut rng).unwrap()
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn fold_count_is_bounded_by_smaller_stratum() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            StratifiedFolds::new(ids("h", 10), ids("d", 3), 4, &mut rng),
            Err(ClassificationError::InvalidFoldCount { folds: 4, max: 3 })
        );
        assert!(matches!(
            StratifiedFolds::new(ids("h", 10), ids("d", 3), 1, &mut rng),
            Err(ClassificationError::InvalidFoldCount { folds: 1, .. })
        ));
    }
}
