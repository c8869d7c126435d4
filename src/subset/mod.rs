//! Subset views over a collection.
//!
//! A [`SubsetDataset`] pairs a collection with a resolved list of indices.
//! The list comes from a uniform random sample, from the caller, or from the
//! augmentation similarity selector in [`crate::selection`].

mod dataset;

pub use dataset::{load_indices, save_indices, SubsetDataset};
