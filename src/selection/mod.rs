//! Subset selection by augmentation similarity.
//!
//! This module selects a representative subset of a collection so that a
//! model trained on the subset behaves close to one trained on everything.
//! Selection runs independently inside each latent class of the collection
//! and keeps the elements that cover the rest of their class best.
//!
//! # Overview
//!
//! The pipeline has five stages:
//!
//! 1. **Encoding** - Items are fetched from a [`Collection`] and turned into
//!    vectors by a [`VectorEncoder`]
//! 2. **Distance** - Pairwise cosine similarity inside each class, computed
//!    block by block
//! 3. **Objective** - A thresholded coverage function over one class's matrix
//! 4. **Lazy greedy** - Orders the whole class by marginal gain without
//!    re-evaluating every candidate each round
//! 5. **Orchestration** - Truncates each class ranking to the requested
//!    fraction and concatenates the classes
//!
//! # Usage
//!
//! ```rust
//! use sas_subset::config::SelectionConfig;
//! use sas_subset::selection::{
//!     EncodedDistances, LatentClassPartition, PrecomputedEncoder, SasSelector,
//! };
//!
//! let items = vec![
//!     vec![1.0, 0.0],
//!     vec![0.9, 0.1],
//!     vec![0.0, 1.0],
//!     vec![0.1, 0.9],
//! ];
//! let partition = LatentClassPartition::from_labels(&[0, 0, 1, 1]).unwrap();
//! let source = EncodedDistances::new(PrecomputedEncoder::new(2));
//!
//! let selector = SasSelector::new(SelectionConfig::default().with_subset_fraction(0.5)).unwrap();
//! let subset = selector.select(&items, &partition, &source).unwrap();
//! assert_eq!(subset.len(), 2);
//! ```
//!
//! # Objective caveat
//!
//! The coverage objective ignores similarities below the threshold. With a
//! positive threshold it can lose the diminishing returns property, and the
//! lazy greedy ordering is then an approximation of the naive greedy one.

pub mod distance;
pub mod encoder;
pub mod lazy_greedy;
pub mod objective;
pub mod orchestrator;
pub mod partition;

pub use distance::{cosine_similarity, pairwise_cosine_similarity};
pub use encoder::{encode_indices, Collection, HashingTextEncoder, PrecomputedEncoder, VectorEncoder};
pub use lazy_greedy::{lazy_greedy, naive_greedy};
pub use objective::{CoverageObjective, SubmodularObjective};
pub use orchestrator::{
    retained_count, DistanceSource, EncodedDistances, PartitionRanking, PartitionRankings,
    PrecomputedDistances, SasSelector,
};
pub use partition::{LatentClassPartition, PartitionId};
