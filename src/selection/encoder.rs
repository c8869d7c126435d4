//! Vector encoding of collection items.
//!
//! The selection engine never looks inside collection items. It fetches them
//! through [`Collection`] and hands them in batches to a [`VectorEncoder`],
//! which returns one fixed-size row per item. Encoders must be deterministic
//! for selections to be reproducible.

use std::ops::Range;

use ndarray::{Array1, Array2, ArrayView2, Axis};
use sha2::{Digest, Sha256};

use crate::error::EncoderError;

/// Default dimension for [`HashingTextEncoder`].
const DEFAULT_TEXT_DIMENSION: usize = 128;

const WORD_WEIGHT: f64 = 1.0;
const TRIGRAM_WEIGHT: f64 = 0.5;

/// Index-addressable collection of items.
pub trait Collection {
    /// Item type handed to the encoder.
    type Item;

    /// Number of items in the collection.
    fn len(&self) -> usize;

    /// Returns true if the collection holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches the item at `index`, or `None` if it is out of range.
    fn get(&self, index: usize) -> Option<Self::Item>;
}

impl<T: Clone> Collection for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).cloned()
    }
}

/// A collection known only by its index range; item `i` is the index itself.
impl Collection for Range<usize> {
    type Item = usize;

    fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    fn get(&self, index: usize) -> Option<usize> {
        let item = self.start.checked_add(index)?;
        (item < self.end).then_some(item)
    }
}

impl<C: Collection + ?Sized> Collection for &C {
    type Item = C::Item;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, index: usize) -> Option<Self::Item> {
        (**self).get(index)
    }
}

/// Maps a batch of items to a matrix with one encoding row per item.
pub trait VectorEncoder<T> {
    /// Length of every produced vector.
    fn dimension(&self) -> usize;

    /// Encodes a batch. Row `i` of the result encodes `batch[i]`.
    fn encode(&self, batch: &[T]) -> Result<Array2<f64>, EncoderError>;
}

impl<T, E: VectorEncoder<T> + ?Sized> VectorEncoder<T> for &E {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn encode(&self, batch: &[T]) -> Result<Array2<f64>, EncoderError> {
        (**self).encode(batch)
    }
}

/// Encodes the given collection indices in batches of `batch_size`.
///
/// Rows are returned in `indices` order. The encoder is trusted for the row
/// count (callers compare it against `indices.len()`), but every batch must
/// have `encoder.dimension()` columns.
///
/// # Errors
///
/// Returns `EncoderError::ItemNotFound` for an index the collection does not
/// hold, `EncoderError::DimensionMismatch` for a batch of the wrong width,
/// and any error raised by the encoder itself.
pub fn encode_indices<C, E>(
    collection: &C,
    encoder: &E,
    indices: &[usize],
    batch_size: usize,
) -> Result<Array2<f64>, EncoderError>
where
    C: Collection + ?Sized,
    E: VectorEncoder<C::Item> + ?Sized,
{
    let dimension = encoder.dimension();
    let mut blocks: Vec<Array2<f64>> = Vec::new();

    for chunk in indices.chunks(batch_size.max(1)) {
        let batch = chunk
            .iter()
            .map(|&index| collection.get(index).ok_or(EncoderError::ItemNotFound(index)))
            .collect::<Result<Vec<_>, _>>()?;

        let encoded = encoder.encode(&batch)?;
        if encoded.ncols() != dimension {
            return Err(EncoderError::DimensionMismatch {
                expected: dimension,
                actual: encoded.ncols(),
            });
        }
        blocks.push(encoded);
    }

    if blocks.is_empty() {
        return Ok(Array2::zeros((0, dimension)));
    }

    let views: Vec<ArrayView2<'_, f64>> = blocks.iter().map(|block| block.view()).collect();
    ndarray::concatenate(Axis(0), &views).map_err(|e| EncoderError::Encoding(e.to_string()))
}

/// Encoder for items that already are vectors.
///
/// Stacks each item as one row; useful when encodings were produced ahead of
/// time by an external model.
#[derive(Debug, Clone)]
pub struct PrecomputedEncoder {
    dimension: usize,
}

impl PrecomputedEncoder {
    /// Creates an encoder accepting vectors of exactly `dimension` values.
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl VectorEncoder<Vec<f64>> for PrecomputedEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, batch: &[Vec<f64>]) -> Result<Array2<f64>, EncoderError> {
        let mut result = Array2::zeros((batch.len(), self.dimension));
        for (i, vector) in batch.iter().enumerate() {
            if vector.len() != self.dimension {
                return Err(EncoderError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
            result.row_mut(i).assign(&Array1::from(vector.clone()));
        }
        Ok(result)
    }
}

/// Deterministic text encoder based on feature hashing.
///
/// Lowercased words and character trigrams are hashed into a shared set of
/// buckets and the result is scaled to unit length. Intended for quick
/// selections over raw text without an external model.
#[derive(Debug, Clone)]
pub struct HashingTextEncoder {
    dimension: usize,
}

impl Default for HashingTextEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_DIMENSION)
    }
}

impl HashingTextEncoder {
    /// Creates a text encoder with the specified dimension.
    ///
    /// # Example
    ///
    /// ```
    /// use sas_subset::selection::{HashingTextEncoder, VectorEncoder};
    ///
    /// let encoder = HashingTextEncoder::new(64);
    /// assert_eq!(encoder.dimension(), 64);
    /// ```
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Encodes a single text. Empty text maps to the zero vector.
    pub fn encode_text(&self, text: &str) -> Array1<f64> {
        let mut vector = Array1::zeros(self.dimension);
        if self.dimension == 0 {
            return vector;
        }

        let lowered = text.to_lowercase();
        for word in lowered.split_whitespace() {
            vector[bucket(FeatureKind::Word, word, self.dimension)] += WORD_WEIGHT;
        }

        let chars: Vec<char> = lowered.chars().collect();
        for window in chars.windows(3) {
            let trigram: String = window.iter().collect();
            vector[bucket(FeatureKind::Trigram, &trigram, self.dimension)] += TRIGRAM_WEIGHT;
        }

        normalize(&mut vector);
        vector
    }
}

impl VectorEncoder<String> for HashingTextEncoder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, batch: &[String]) -> Result<Array2<f64>, EncoderError> {
        let mut result = Array2::zeros((batch.len(), self.dimension));
        for (i, text) in batch.iter().enumerate() {
            result.row_mut(i).assign(&self.encode_text(text));
        }
        Ok(result)
    }
}

#[derive(Debug, Clone, Copy)]
enum FeatureKind {
    Word,
    Trigram,
}

/// Bucket of `feature` among `buckets`. Words and trigrams hash with
/// different prefixes so equal strings of different kinds do not collide.
fn bucket(kind: FeatureKind, feature: &str, buckets: usize) -> usize {
    let prefix: &[u8] = match kind {
        FeatureKind::Word => b"w\0",
        FeatureKind::Trigram => b"t\0",
    };
    let digest = Sha256::new()
        .chain_update(prefix)
        .chain_update(feature.as_bytes())
        .finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_le_bytes(head) % buckets as u64) as usize
}

/// Normalizes a vector to unit length (L2 norm).
fn normalize(v: &mut Array1<f64>) {
    let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > 1e-10 {
        v.mapv_inplace(|x| x / norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records the size of every batch it is asked to encode.
    struct RecordingEncoder {
        batches: RefCell<Vec<usize>>,
    }

    impl VectorEncoder<Vec<f64>> for RecordingEncoder {
        fn dimension(&self) -> usize {
            2
        }

        fn encode(&self, batch: &[Vec<f64>]) -> Result<Array2<f64>, EncoderError> {
            self.batches.borrow_mut().push(batch.len());
            PrecomputedEncoder::new(2).encode(batch)
        }
    }

    fn items(n: usize) -> Vec<Vec<f64>> {
        (0..n).map(|i| vec![i as f64, 1.0]).collect()
    }

    #[test]
    fn test_vec_collection() {
        let collection = vec!["a".to_string(), "b".to_string()];
        assert_eq!(Collection::len(&collection), 2);
        assert!(!Collection::is_empty(&collection));
        assert_eq!(Collection::get(&collection, 1), Some("b".to_string()));
        assert_eq!(Collection::get(&collection, 2), None);
    }

    #[test]
    fn test_range_collection() {
        let collection = 3..6;
        assert_eq!(Collection::len(&collection), 3);
        assert_eq!(Collection::get(&collection, 0), Some(3));
        assert_eq!(Collection::get(&collection, 2), Some(5));
        assert_eq!(Collection::get(&collection, 3), None);
    }

    #[test]
    fn test_encode_indices_batches_and_order() {
        let collection = items(7);
        let encoder = RecordingEncoder {
            batches: RefCell::new(Vec::new()),
        };

        let encoded = encode_indices(&collection, &encoder, &[6, 0, 3, 2, 5], 2).unwrap();

        assert_eq!(*encoder.batches.borrow(), vec![2, 2, 1]);
        assert_eq!(encoded.shape(), &[5, 2]);
        let firsts: Vec<f64> = encoded.column(0).to_vec();
        assert_eq!(firsts, vec![6.0, 0.0, 3.0, 2.0, 5.0]);
    }

    #[test]
    fn test_encode_indices_empty() {
        let collection = items(3);
        let encoded = encode_indices(&collection, &PrecomputedEncoder::new(2), &[], 4).unwrap();
        assert_eq!(encoded.shape(), &[0, 2]);
    }

    #[test]
    fn test_encode_indices_missing_item() {
        let collection = items(3);
        let result = encode_indices(&collection, &PrecomputedEncoder::new(2), &[0, 9], 4);
        assert!(matches!(result, Err(EncoderError::ItemNotFound(9))));
    }

    #[test]
    fn test_precomputed_encoder_rejects_wrong_dimension() {
        let encoder = PrecomputedEncoder::new(3);
        let result = encoder.encode(&[vec![1.0, 2.0, 3.0], vec![1.0]]);
        assert!(matches!(
            result,
            Err(EncoderError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_encode_indices_checks_encoder_width() {
        struct WideEncoder;

        impl VectorEncoder<Vec<f64>> for WideEncoder {
            fn dimension(&self) -> usize {
                2
            }

            fn encode(&self, batch: &[Vec<f64>]) -> Result<Array2<f64>, EncoderError> {
                Ok(Array2::zeros((batch.len(), 3)))
            }
        }

        let result = encode_indices(&items(2), &WideEncoder, &[0, 1], 8);
        assert!(matches!(
            result,
            Err(EncoderError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_text_encoder_unit_norm() {
        let encoder = HashingTextEncoder::new(64);
        let embedding = encoder.encode_text("a horse grazing in an open field");
        assert_eq!(embedding.len(), 64);
        let norm: f64 = embedding.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_text_encoder_empty_text() {
        let encoder = HashingTextEncoder::default();
        let embedding = encoder.encode_text("");
        assert_eq!(embedding.len(), DEFAULT_TEXT_DIMENSION);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_text_encoder_shared_words_score_higher() {
        let encoder = HashingTextEncoder::new(256);
        let cat = encoder.encode_text("the cat sat on the mat");
        let similar = encoder.encode_text("The cat sat on a mat");
        let unrelated = encoder.encode_text("quantum chromodynamics lecture notes");

        assert!(cat.dot(&similar) > 0.7);
        assert!(cat.dot(&similar) > cat.dot(&unrelated) + 0.4);
    }

    #[test]
    fn test_text_encoder_deterministic() {
        let encoder = HashingTextEncoder::new(32);
        let batch = vec!["red car".to_string(), "blue boat".to_string()];
        let first = encoder.encode(&batch).unwrap();
        let second = encoder.encode(&batch).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.shape(), &[2, 32]);
    }
}
