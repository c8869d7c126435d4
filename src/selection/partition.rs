//! Latent class partitions of a collection.
//!
//! A partition maps a class id to the ordered list of collection indices
//! belonging to that class. Selection runs independently inside each class,
//! and the order of a member list defines the local positions used by that
//! class's similarity matrix.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::SubsetError;

/// Identifier of one latent class.
pub type PartitionId = u32;

/// Disjoint grouping of collection indices into latent classes.
///
/// Classes are kept in ascending id order, which is also the order in which
/// per-class selections are concatenated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<PartitionId, Vec<usize>>",
    into = "BTreeMap<PartitionId, Vec<usize>>"
)]
pub struct LatentClassPartition {
    classes: BTreeMap<PartitionId, Vec<usize>>,
}

impl LatentClassPartition {
    /// Creates a partition from a class id → members mapping.
    ///
    /// # Errors
    ///
    /// Returns `SubsetError::EmptyPartitionMapping` if the mapping has no
    /// classes, and `SubsetError::DuplicateIndex` if an index is listed twice
    /// (within one class or across classes).
    pub fn new(classes: BTreeMap<PartitionId, Vec<usize>>) -> Result<Self, SubsetError> {
        if classes.is_empty() {
            return Err(SubsetError::EmptyPartitionMapping);
        }

        let mut seen = HashSet::new();
        for members in classes.values() {
            for &index in members {
                if !seen.insert(index) {
                    return Err(SubsetError::DuplicateIndex(index));
                }
            }
        }

        Ok(Self { classes })
    }

    /// Builds a partition from one class label per collection item.
    ///
    /// Item `i` joins class `labels[i]`; members keep collection order.
    pub fn from_labels(labels: &[PartitionId]) -> Result<Self, SubsetError> {
        let mut classes: BTreeMap<PartitionId, Vec<usize>> = BTreeMap::new();
        for (index, &label) in labels.iter().enumerate() {
            classes.entry(label).or_default().push(index);
        }
        Self::new(classes)
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Total number of indices across all classes.
    pub fn total_members(&self) -> usize {
        self.classes.values().map(Vec::len).sum()
    }

    /// Members of one class, in local position order.
    pub fn members(&self, id: PartitionId) -> Option<&[usize]> {
        self.classes.get(&id).map(Vec::as_slice)
    }

    /// Class ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = PartitionId> + '_ {
        self.classes.keys().copied()
    }

    /// Iterates over `(id, members)` in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (PartitionId, &[usize])> {
        self.classes.iter().map(|(id, members)| (*id, members.as_slice()))
    }

    /// Checks that every member addresses an item of a collection of `len` items.
    pub fn check_bounds(&self, len: usize) -> Result<(), SubsetError> {
        for (_, members) in self.iter() {
            if let Some(&index) = members.iter().find(|&&index| index >= len) {
                return Err(SubsetError::IndexOutOfRange { index, len });
            }
        }
        Ok(())
    }
}

impl TryFrom<BTreeMap<PartitionId, Vec<usize>>> for LatentClassPartition {
    type Error = SubsetError;

    fn try_from(classes: BTreeMap<PartitionId, Vec<usize>>) -> Result<Self, Self::Error> {
        Self::new(classes)
    }
}

impl From<LatentClassPartition> for BTreeMap<PartitionId, Vec<usize>> {
    fn from(partition: LatentClassPartition) -> Self {
        partition.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(entries: &[(PartitionId, &[usize])]) -> BTreeMap<PartitionId, Vec<usize>> {
        entries
            .iter()
            .map(|(id, members)| (*id, members.to_vec()))
            .collect()
    }

    #[test]
    fn test_new_rejects_empty_mapping() {
        let result = LatentClassPartition::new(BTreeMap::new());
        assert!(matches!(result, Err(SubsetError::EmptyPartitionMapping)));
    }

    #[test]
    fn test_new_rejects_overlapping_classes() {
        let result = LatentClassPartition::new(classes(&[(0, &[0, 1, 2]), (1, &[3, 1])]));
        assert!(matches!(result, Err(SubsetError::DuplicateIndex(1))));
    }

    #[test]
    fn test_new_rejects_repeated_member() {
        let result = LatentClassPartition::new(classes(&[(0, &[4, 4])]));
        assert!(matches!(result, Err(SubsetError::DuplicateIndex(4))));
    }

    #[test]
    fn test_empty_class_is_allowed() {
        let partition = LatentClassPartition::new(classes(&[(0, &[]), (1, &[2, 3])])).unwrap();
        assert_eq!(partition.len(), 2);
        assert_eq!(partition.total_members(), 2);
        assert_eq!(partition.members(0), Some(&[][..]));
    }

    #[test]
    fn test_iteration_is_in_id_order() {
        let partition =
            LatentClassPartition::new(classes(&[(7, &[0]), (2, &[1]), (4, &[2])])).unwrap();
        let ids: Vec<PartitionId> = partition.ids().collect();
        assert_eq!(ids, vec![2, 4, 7]);
    }

    #[test]
    fn test_from_labels() {
        let partition = LatentClassPartition::from_labels(&[1, 0, 1, 2, 0]).unwrap();
        assert_eq!(partition.members(0), Some(&[1, 4][..]));
        assert_eq!(partition.members(1), Some(&[0, 2][..]));
        assert_eq!(partition.members(2), Some(&[3][..]));
        assert_eq!(partition.members(3), None);
    }

    #[test]
    fn test_from_labels_empty() {
        let result = LatentClassPartition::from_labels(&[]);
        assert!(matches!(result, Err(SubsetError::EmptyPartitionMapping)));
    }

    #[test]
    fn test_check_bounds() {
        let partition = LatentClassPartition::new(classes(&[(0, &[0, 5]), (1, &[2])])).unwrap();
        assert!(partition.check_bounds(6).is_ok());
        assert!(matches!(
            partition.check_bounds(5),
            Err(SubsetError::IndexOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn test_json_round_trip_validates() {
        let partition: LatentClassPartition =
            serde_json::from_str(r#"{"0": [0, 2], "1": [1, 3]}"#).unwrap();
        assert_eq!(partition.members(1), Some(&[1, 3][..]));

        let json = serde_json::to_string(&partition).unwrap();
        assert_eq!(json, r#"{"0":[0,2],"1":[1,3]}"#);

        let invalid: Result<LatentClassPartition, _> = serde_json::from_str("{}");
        assert!(invalid.is_err());
    }
}
