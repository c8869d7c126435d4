//! sas-subset: Training subset selection by augmentation similarity.
//!
//! This library ranks the members of each latent class of a collection by
//! how well they cover the rest of their class, and keeps the top fraction
//! of every class.

// Core modules
pub mod cli;
pub mod config;
pub mod error;
pub mod selection;
pub mod subset;

// Re-export commonly used error types
pub use config::ConfigError;
pub use error::{DistanceError, EncoderError, SelectionError, SubsetError};
