//! Error types for sas-subset operations.
//!
//! Defines error types for each subsystem of the selection engine:
//! - Pairwise similarity computation
//! - Vector encoding of collection items
//! - Lazy greedy selection
//! - Partitioned subset orchestration and index-list persistence

use thiserror::Error;

use crate::config::ConfigError;
use crate::selection::PartitionId;

/// Errors that can occur while building pairwise similarity matrices.
#[derive(Debug, Error)]
pub enum DistanceError {
    #[error("Invalid block size {0}: must be greater than 0")]
    InvalidBlockSize(usize),

    #[error("Vector dimension mismatch: left has {left} columns, right has {right}")]
    DimensionMismatch { left: usize, right: usize },
}

/// Errors that can occur during lazy greedy selection.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Budget {budget} exceeds universe size {universe}")]
    BudgetExceedsUniverse { budget: usize, universe: usize },

    #[error("Candidate {0} appears more than once in the universe")]
    DuplicateCandidate(usize),

    #[error("Candidate {index} is outside the objective universe of size {size}")]
    CandidateOutOfRange { index: usize, size: usize },
}

/// Errors that can occur while encoding collection items.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Item {0} not found in collection")]
    ItemNotFound(usize),

    #[error("Encoder produced vectors of dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors that can occur while resolving a subset of a collection.
#[derive(Debug, Error)]
pub enum SubsetError {
    #[error("Latent class partition mapping is empty")]
    EmptyPartitionMapping,

    #[error("Invalid subset fraction {0}: must be in (0, 1]")]
    InvalidFraction(f64),

    #[error("Partition {partition} declares {expected} members but the encoder produced {actual} vectors")]
    VectorCountMismatch {
        partition: PartitionId,
        expected: usize,
        actual: usize,
    },

    #[error("No augmentation distance supplied for partition {0}")]
    MissingDistance(PartitionId),

    #[error("Augmentation distance for partition {partition} is not square ({rows}x{cols})")]
    NonSquareDistance {
        partition: PartitionId,
        rows: usize,
        cols: usize,
    },

    #[error("Augmentation distance for partition {partition} has size {actual}, partition has {expected} members")]
    DistanceSizeMismatch {
        partition: PartitionId,
        expected: usize,
        actual: usize,
    },

    #[error("Augmentation distance for partition {0} contains non-finite values")]
    NonFiniteDistance(PartitionId),

    #[error("Item index {0} appears more than once")]
    DuplicateIndex(usize),

    #[error("Item index {index} is out of range for a collection of {len} items")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Distance error: {0}")]
    Distance(#[from] DistanceError),

    #[error("Selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
