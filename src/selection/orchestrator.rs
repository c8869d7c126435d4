//! Partitioned subset selection.
//!
//! Each latent class is ranked on its own: its augmentation distance matrix
//! is copied into a [`CoverageObjective`], the whole class is ordered by
//! [`lazy_greedy`], and local positions are mapped back to collection
//! indices. Truncating every ranking to `floor(fraction × class size)` and
//! concatenating the classes in ascending id order yields the subset.
//!
//! Ranking fully and truncating afterwards makes subsets nested: for
//! `f1 < f2` each class's `f1` selection is a prefix of its `f2` selection.

use std::collections::BTreeMap;

use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::config::SelectionConfig;
use crate::error::SubsetError;

use super::distance::pairwise_cosine_similarity;
use super::encoder::{encode_indices, Collection, VectorEncoder};
use super::lazy_greedy::lazy_greedy;
use super::objective::CoverageObjective;
use super::partition::{LatentClassPartition, PartitionId};

/// Supplies the augmentation distance matrix of one latent class.
///
/// The returned matrix is owned by the caller and indexed by local position
/// in `members`. `block_size` is the configured pairwise distance block size;
/// sources that build matrices use it for encoding batches and similarity
/// blocks. The selector checks the shape of whatever is returned.
pub trait DistanceSource<C: ?Sized> {
    fn distance(
        &self,
        collection: &C,
        partition: PartitionId,
        members: &[usize],
        block_size: usize,
    ) -> Result<Array2<f64>, SubsetError>;
}

/// Distance matrices computed ahead of time, one per class.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedDistances {
    matrices: BTreeMap<PartitionId, Array2<f64>>,
}

impl PrecomputedDistances {
    pub fn new(matrices: BTreeMap<PartitionId, Array2<f64>>) -> Self {
        Self { matrices }
    }

    /// Matrix stored for `partition`, if any.
    pub fn get(&self, partition: PartitionId) -> Option<&Array2<f64>> {
        self.matrices.get(&partition)
    }

    pub fn insert(&mut self, partition: PartitionId, matrix: Array2<f64>) {
        self.matrices.insert(partition, matrix);
    }
}

impl From<BTreeMap<PartitionId, Array2<f64>>> for PrecomputedDistances {
    fn from(matrices: BTreeMap<PartitionId, Array2<f64>>) -> Self {
        Self::new(matrices)
    }
}

impl<C: ?Sized> DistanceSource<C> for PrecomputedDistances {
    fn distance(
        &self,
        _collection: &C,
        partition: PartitionId,
        _members: &[usize],
        _block_size: usize,
    ) -> Result<Array2<f64>, SubsetError> {
        self.matrices
            .get(&partition)
            .cloned()
            .ok_or(SubsetError::MissingDistance(partition))
    }
}

/// Distance matrices built on demand by encoding class members.
///
/// Members are encoded in batches of the selector's block size and compared
/// with [`pairwise_cosine_similarity`] using the same block size.
#[derive(Debug, Clone)]
pub struct EncodedDistances<E> {
    encoder: E,
}

impl<E> EncodedDistances<E> {
    pub fn new(encoder: E) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }
}

impl<C, E> DistanceSource<C> for EncodedDistances<E>
where
    C: Collection + ?Sized,
    E: VectorEncoder<C::Item>,
{
    fn distance(
        &self,
        collection: &C,
        partition: PartitionId,
        members: &[usize],
        block_size: usize,
    ) -> Result<Array2<f64>, SubsetError> {
        let encodings = encode_indices(collection, &self.encoder, members, block_size)?;
        if encodings.nrows() != members.len() {
            return Err(SubsetError::VectorCountMismatch {
                partition,
                expected: members.len(),
                actual: encodings.nrows(),
            });
        }
        Ok(pairwise_cosine_similarity(&encodings, &encodings, block_size)?)
    }
}

/// Full selection order of one latent class, as collection indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionRanking {
    pub partition: PartitionId,
    pub ranked: Vec<usize>,
}

impl PartitionRanking {
    /// Leading part of the ranking kept for `fraction`.
    pub fn retained(&self, fraction: f64) -> &[usize] {
        &self.ranked[..retained_count(self.ranked.len(), fraction)]
    }
}

/// Rankings of every class, in ascending class id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionRankings {
    rankings: Vec<PartitionRanking>,
}

impl PartitionRankings {
    pub fn len(&self) -> usize {
        self.rankings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rankings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionRanking> {
        self.rankings.iter()
    }

    /// Ranking of one class.
    pub fn get(&self, partition: PartitionId) -> Option<&PartitionRanking> {
        self.rankings.iter().find(|r| r.partition == partition)
    }

    /// Concatenates the retained prefix of every class.
    ///
    /// # Errors
    ///
    /// Returns `SubsetError::InvalidFraction` unless `fraction` is in (0, 1].
    pub fn truncate(&self, fraction: f64) -> Result<Vec<usize>, SubsetError> {
        check_fraction(fraction)?;
        Ok(self
            .rankings
            .iter()
            .flat_map(|ranking| ranking.retained(fraction).iter().copied())
            .collect())
    }
}

/// Number of elements a class of `size` keeps at `fraction`, rounded down.
pub fn retained_count(size: usize, fraction: f64) -> usize {
    ((fraction * size as f64) as usize).min(size)
}

/// Rejects a class matrix that is not `size × size` or holds non-finite values.
fn check_distance(
    partition: PartitionId,
    size: usize,
    distance: &Array2<f64>,
) -> Result<(), SubsetError> {
    if distance.nrows() != distance.ncols() {
        return Err(SubsetError::NonSquareDistance {
            partition,
            rows: distance.nrows(),
            cols: distance.ncols(),
        });
    }
    if distance.nrows() != size {
        return Err(SubsetError::DistanceSizeMismatch {
            partition,
            expected: size,
            actual: distance.nrows(),
        });
    }
    if distance.iter().any(|value| !value.is_finite()) {
        return Err(SubsetError::NonFiniteDistance(partition));
    }
    Ok(())
}

fn check_fraction(fraction: f64) -> Result<(), SubsetError> {
    if fraction.is_finite() && fraction > 0.0 && fraction <= 1.0 {
        Ok(())
    } else {
        Err(SubsetError::InvalidFraction(fraction))
    }
}

/// Selects a coverage-maximizing subset inside every latent class.
#[derive(Debug, Clone)]
pub struct SasSelector {
    config: SelectionConfig,
}

impl SasSelector {
    /// Creates a selector.
    ///
    /// # Errors
    ///
    /// Returns `SubsetError::Config` if the configuration is invalid.
    pub fn new(config: SelectionConfig) -> Result<Self, SubsetError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Ranks every class of `partition` in full.
    ///
    /// # Errors
    ///
    /// Fails if a member is outside `collection`, if the source cannot
    /// provide a valid matrix for a class, or if selection fails. No partial
    /// result is returned.
    pub fn rank<C, S>(
        &self,
        collection: &C,
        partition: &LatentClassPartition,
        source: &S,
    ) -> Result<PartitionRankings, SubsetError>
    where
        C: Collection + ?Sized,
        S: DistanceSource<C> + ?Sized,
    {
        partition.check_bounds(collection.len())?;

        let mut rankings = Vec::with_capacity(partition.len());
        for (id, members) in partition.iter() {
            let ranked = self.rank_class(collection, id, members, source)?;
            rankings.push(PartitionRanking {
                partition: id,
                ranked,
            });
        }

        Ok(PartitionRankings { rankings })
    }

    /// Ranks every class and keeps the configured fraction of each.
    pub fn select<C, S>(
        &self,
        collection: &C,
        partition: &LatentClassPartition,
        source: &S,
    ) -> Result<Vec<usize>, SubsetError>
    where
        C: Collection + ?Sized,
        S: DistanceSource<C> + ?Sized,
    {
        self.rank(collection, partition, source)?
            .truncate(self.config.subset_fraction)
    }

    fn rank_class<C, S>(
        &self,
        collection: &C,
        id: PartitionId,
        members: &[usize],
        source: &S,
    ) -> Result<Vec<usize>, SubsetError>
    where
        C: Collection + ?Sized,
        S: DistanceSource<C> + ?Sized,
    {
        if members.is_empty() {
            debug!(partition = id, "skipping empty partition");
            return Ok(Vec::new());
        }

        let distance = source.distance(
            collection,
            id,
            members,
            self.config.pairwise_distance_block_size,
        )?;
        check_distance(id, members.len(), &distance)?;
        if members.len() == 1 {
            warn!(partition = id, "partition has a single member");
        }

        let mut objective = CoverageObjective::new(distance, self.config.threshold);
        let universe: Vec<usize> = (0..members.len()).collect();
        let local = lazy_greedy(&mut objective, &universe, members.len())?;
        let ranked: Vec<usize> = local.into_iter().map(|position| members[position]).collect();

        let keep = retained_count(ranked.len(), self.config.subset_fraction);
        if keep == 0 {
            warn!(
                partition = id,
                size = members.len(),
                fraction = self.config.subset_fraction,
                "partition contributes no elements at this fraction"
            );
        }
        if self.config.verbose {
            info!(partition = id, size = members.len(), keep, "ranked partition");
        } else {
            debug!(partition = id, size = members.len(), keep, "ranked partition");
        }

        Ok(ranked)
    }
}
