//! Subset dataset and index list persistence.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::config::SelectionConfig;
use crate::error::SubsetError;
use crate::selection::{retained_count, Collection, DistanceSource, LatentClassPartition, SasSelector};

/// A collection restricted to an ordered list of its indices.
///
/// Position `i` of the subset maps to item `indices()[i]` of the underlying
/// collection.
#[derive(Debug, Clone)]
pub struct SubsetDataset<C> {
    collection: C,
    indices: Vec<usize>,
    subset_fraction: f64,
}

impl<C: Collection> SubsetDataset<C> {
    /// Samples `floor(len × fraction)` distinct indices uniformly at random.
    ///
    /// With a seed the sample is reproducible.
    ///
    /// # Errors
    ///
    /// Returns `SubsetError::InvalidFraction` unless `fraction` is in (0, 1].
    pub fn random(collection: C, fraction: f64, seed: Option<u64>) -> Result<Self, SubsetError> {
        if !(fraction.is_finite() && fraction > 0.0 && fraction <= 1.0) {
            return Err(SubsetError::InvalidFraction(fraction));
        }

        let size = retained_count(collection.len(), fraction);
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        let mut indices: Vec<usize> = (0..collection.len()).collect();
        indices.shuffle(&mut rng);
        indices.truncate(size);

        let subset = Self {
            collection,
            indices,
            subset_fraction: fraction,
        };
        subset.log_summary(false);
        Ok(subset)
    }

    /// Uses caller-supplied indices as the subset.
    ///
    /// The effective fraction is `indices.len() / collection.len()`.
    ///
    /// # Errors
    ///
    /// Returns `SubsetError::IndexOutOfRange` or `SubsetError::DuplicateIndex`
    /// for an invalid index list.
    pub fn custom(collection: C, indices: Vec<usize>) -> Result<Self, SubsetError> {
        let len = collection.len();
        let mut seen = HashSet::with_capacity(indices.len());
        for &index in &indices {
            if index >= len {
                return Err(SubsetError::IndexOutOfRange { index, len });
            }
            if !seen.insert(index) {
                return Err(SubsetError::DuplicateIndex(index));
            }
        }

        let subset_fraction = if len == 0 {
            0.0
        } else {
            indices.len() as f64 / len as f64
        };
        let subset = Self {
            collection,
            indices,
            subset_fraction,
        };
        subset.log_summary(false);
        Ok(subset)
    }

    /// Selects the subset with augmentation similarity coverage.
    ///
    /// Each latent class of `partition` keeps `floor(fraction × size)` of its
    /// members, ranked by [`SasSelector`] over the matrices `source` supplies.
    ///
    /// # Errors
    ///
    /// Propagates configuration, distance and selection errors. No partial
    /// subset is produced.
    pub fn sas<S>(
        collection: C,
        partition: &LatentClassPartition,
        source: &S,
        config: &SelectionConfig,
    ) -> Result<Self, SubsetError>
    where
        S: DistanceSource<C> + ?Sized,
    {
        let selector = SasSelector::new(config.clone())?;
        let indices = selector.select(&collection, partition, source)?;

        let subset = Self {
            collection,
            indices,
            subset_fraction: config.subset_fraction,
        };
        subset.log_summary(config.verbose);
        Ok(subset)
    }

    /// Number of items in the subset.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Item at subset position `position`.
    pub fn get(&self, position: usize) -> Option<C::Item> {
        self.indices
            .as_slice()
            .get(position)
            .and_then(|&index| self.collection.get(index))
    }

    /// Collection indices in subset order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Requested fraction, or the effective one for custom subsets.
    pub fn subset_fraction(&self) -> f64 {
        self.subset_fraction
    }

    /// Number of collection items left out of the subset.
    pub fn discarded(&self) -> usize {
        self.collection.len().saturating_sub(self.indices.len())
    }

    /// The underlying collection.
    pub fn collection(&self) -> &C {
        &self.collection
    }

    /// Iterates over the subset items in order.
    pub fn iter(&self) -> impl Iterator<Item = C::Item> + '_ {
        self.indices
            .iter()
            .filter_map(move |&index| self.collection.get(index))
    }

    /// Writes the index list to `path` as a JSON array.
    pub fn save_indices(&self, path: &Path) -> Result<(), SubsetError> {
        save_indices(path, &self.indices)
    }

    fn log_summary(&self, verbose: bool) {
        if verbose {
            info!("Subset size: {}", self.len());
            info!("Discarded {} examples", self.discarded());
        } else {
            debug!(
                subset_size = self.len(),
                discarded = self.discarded(),
                "subset resolved"
            );
        }
    }
}

/// Writes an index list to `path` as a JSON array.
pub fn save_indices(path: &Path, indices: &[usize]) -> Result<(), SubsetError> {
    let json = serde_json::to_string_pretty(indices)?;
    fs::write(path, json)?;
    Ok(())
}

/// Reads an index list written by [`save_indices`].
pub fn load_indices(path: &Path) -> Result<Vec<usize>, SubsetError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::PrecomputedDistances;
    use ndarray::array;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_random_size_and_distinctness() {
        let subset = SubsetDataset::random(0..10, 0.35, Some(7)).unwrap();
        assert_eq!(subset.len(), 3);
        assert_eq!(subset.discarded(), 7);

        let unique: HashSet<usize> = subset.indices().iter().copied().collect();
        assert_eq!(unique.len(), 3);
        assert!(subset.indices().iter().all(|&i| i < 10));
    }

    #[test]
    fn test_random_is_reproducible_with_seed() {
        let first = SubsetDataset::random(0..100, 0.2, Some(42)).unwrap();
        let second = SubsetDataset::random(0..100, 0.2, Some(42)).unwrap();
        assert_eq!(first.indices(), second.indices());
    }

    #[test]
    fn test_random_without_seed() {
        let subset = SubsetDataset::random(0..50, 1.0, None).unwrap();
        let mut indices = subset.indices().to_vec();
        indices.sort_unstable();
        assert_eq!(indices, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_random_rejects_invalid_fraction() {
        assert!(matches!(
            SubsetDataset::random(0..10, 0.0, Some(1)),
            Err(SubsetError::InvalidFraction(_))
        ));
        assert!(matches!(
            SubsetDataset::random(0..10, f64::NAN, Some(1)),
            Err(SubsetError::InvalidFraction(_))
        ));
    }

    #[test]
    fn test_custom_subset() {
        let items = vec!["a", "b", "c", "d"];
        let subset = SubsetDataset::custom(items, vec![3, 1]).unwrap();

        assert_eq!(subset.len(), 2);
        assert_eq!(subset.get(0), Some("d"));
        assert_eq!(subset.get(1), Some("b"));
        assert_eq!(subset.get(2), None);
        assert!((subset.subset_fraction() - 0.5).abs() < 1e-12);
        assert_eq!(subset.iter().collect::<Vec<_>>(), vec!["d", "b"]);
    }

    #[test]
    fn test_custom_rejects_bad_indices() {
        assert!(matches!(
            SubsetDataset::custom(0..3, vec![0, 3]),
            Err(SubsetError::IndexOutOfRange { index: 3, len: 3 })
        ));
        assert!(matches!(
            SubsetDataset::custom(0..3, vec![1, 1]),
            Err(SubsetError::DuplicateIndex(1))
        ));
    }

    #[test]
    fn test_custom_on_empty_collection() {
        let subset = SubsetDataset::custom(Vec::<u8>::new(), Vec::new()).unwrap();
        assert!(subset.is_empty());
        assert_eq!(subset.subset_fraction(), 0.0);
    }

    #[test]
    fn test_sas_subset() {
        let partition =
            LatentClassPartition::new(BTreeMap::from([(0, vec![0, 1, 2]), (1, vec![3, 4])]))
                .unwrap();
        let distances = PrecomputedDistances::new(BTreeMap::from([
            (0, array![[1.0, 0.1, 0.1], [0.1, 1.0, 0.9], [0.1, 0.9, 1.0]]),
            (1, array![[1.0, 0.2], [0.2, 1.0]]),
        ]));
        let config = SelectionConfig::default().with_subset_fraction(0.7);

        let subset = SubsetDataset::sas(0..5, &partition, &distances, &config).unwrap();
        // floor(0.7 × 3) = 2 and floor(0.7 × 2) = 1.
        assert_eq!(subset.len(), 3);
        assert_eq!(subset.indices(), &[1, 2, 3]);
        assert_eq!(subset.discarded(), 2);
        assert_eq!(subset.subset_fraction(), 0.7);
    }

    #[test]
    fn test_save_and_load_indices() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("subset.json");

        let subset = SubsetDataset::custom(0..10, vec![8, 2, 5]).unwrap();
        subset.save_indices(&path).unwrap();

        let loaded = load_indices(&path).unwrap();
        assert_eq!(loaded, vec![8, 2, 5]);

        let restored = SubsetDataset::custom(0..10, loaded).unwrap();
        assert_eq!(restored.indices(), subset.indices());
    }

    #[test]
    fn test_load_indices_rejects_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(load_indices(&path), Err(SubsetError::Json(_))));
        assert!(matches!(
            load_indices(&dir.path().join("missing.json")),
            Err(SubsetError::Io(_))
        ));
    }
}
