//! Pairwise augmentation distance between encodings.
//!
//! The augmentation distance between two items is the cosine similarity of
//! their encodings. Full matrices are assembled block by block so that only
//! one `block_size × block_size` product is live at a time.

use ndarray::{s, Array2, ArrayView1};

use crate::error::DistanceError;

/// Norms below this are treated as zero vectors.
const NORM_EPSILON: f64 = 1e-10;

/// Computes cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has (near) zero norm.
///
/// # Panics
///
/// Panics if vectors have different lengths.
pub fn cosine_similarity(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    assert_eq!(
        a.len(),
        b.len(),
        "Vectors must have the same length for cosine similarity"
    );

    let norm_a = a.dot(&a).sqrt();
    let norm_b = b.dot(&b).sqrt();

    if norm_a < NORM_EPSILON || norm_b < NORM_EPSILON {
        return 0.0;
    }

    (a.dot(&b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

/// Computes the `left.nrows() × right.nrows()` cosine similarity matrix.
///
/// Both inputs hold one encoding per row. The rows of each input are split
/// into contiguous blocks of at most `block_size`; every block pair is
/// multiplied on its own and written into the result in row-major block
/// order. The trailing block of each side holds the remainder rows. The
/// result does not depend on `block_size` beyond floating point rounding.
///
/// # Errors
///
/// Returns `DistanceError::InvalidBlockSize` for a zero block size and
/// `DistanceError::DimensionMismatch` if the inputs have different widths.
pub fn pairwise_cosine_similarity(
    left: &Array2<f64>,
    right: &Array2<f64>,
    block_size: usize,
) -> Result<Array2<f64>, DistanceError> {
    if block_size == 0 {
        return Err(DistanceError::InvalidBlockSize(block_size));
    }
    if left.ncols() != right.ncols() {
        return Err(DistanceError::DimensionMismatch {
            left: left.ncols(),
            right: right.ncols(),
        });
    }

    let (n1, n2) = (left.nrows(), right.nrows());
    let left = normalize_rows(left);
    let right = normalize_rows(right);
    let mut similarity = Array2::zeros((n1, n2));

    for row_start in (0..n1).step_by(block_size) {
        let row_end = (row_start + block_size).min(n1);
        let row_block = left.slice(s![row_start..row_end, ..]);

        for col_start in (0..n2).step_by(block_size) {
            let col_end = (col_start + block_size).min(n2);
            let col_block = right.slice(s![col_start..col_end, ..]);

            let block = row_block.dot(&col_block.t()).mapv(|x| x.clamp(-1.0, 1.0));
            similarity
                .slice_mut(s![row_start..row_end, col_start..col_end])
                .assign(&block);
        }
    }

    Ok(similarity)
}

/// Scales every row to unit length; rows with zero norm become all zeros.
fn normalize_rows(matrix: &Array2<f64>) -> Array2<f64> {
    let mut normalized = matrix.to_owned();
    for mut row in normalized.rows_mut() {
        let norm = row.dot(&row).sqrt();
        if norm < NORM_EPSILON {
            row.fill(0.0);
        } else {
            row.mapv_inplace(|x| x / norm);
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array1};
    use rand::{RngExt, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_vectors(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.random_range(-1.0..1.0))
    }

    fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = arr1(&[1.0, 2.0, 3.0]);
        let sim = cosine_similarity(a.view(), a.view());
        assert!((sim - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = arr1(&[1.0, 0.0, 0.0]);
        let b = arr1(&[0.0, 1.0, 0.0]);
        assert!(cosine_similarity(a.view(), b.view()).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = arr1(&[1.0, 2.0, 3.0]);
        let b = arr1(&[-1.0, -2.0, -3.0]);
        assert!((cosine_similarity(a.view(), b.view()) + 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = arr1(&[1.0, 2.0, 3.0]);
        let b: Array1<f64> = Array1::zeros(3);
        assert_eq!(cosine_similarity(a.view(), b.view()), 0.0);
    }

    #[test]
    #[should_panic(expected = "Vectors must have the same length")]
    fn test_cosine_similarity_different_lengths() {
        let a = arr1(&[1.0, 2.0]);
        let b = arr1(&[1.0, 2.0, 3.0]);
        cosine_similarity(a.view(), b.view());
    }

    #[test]
    fn test_block_size_does_not_change_result() {
        let vectors = random_vectors(37, 16, 11);
        let small_blocks = pairwise_cosine_similarity(&vectors, &vectors, 4).unwrap();
        let single_block = pairwise_cosine_similarity(&vectors, &vectors, 1000).unwrap();

        assert_eq!(small_blocks.shape(), &[37, 37]);
        assert!(max_abs_diff(&small_blocks, &single_block) < 1e-12);
    }

    #[test]
    fn test_remainder_blocks_match_direct_computation() {
        let left = random_vectors(10, 5, 3);
        let right = random_vectors(7, 5, 4);
        let similarity = pairwise_cosine_similarity(&left, &right, 3).unwrap();

        assert_eq!(similarity.shape(), &[10, 7]);
        for i in 0..10 {
            for j in 0..7 {
                let expected = cosine_similarity(left.row(i), right.row(j));
                assert!(
                    (similarity[[i, j]] - expected).abs() < 1e-12,
                    "mismatch at ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_exact_multiple_of_block_size() {
        let vectors = random_vectors(8, 3, 5);
        let blocked = pairwise_cosine_similarity(&vectors, &vectors, 4).unwrap();
        let single = pairwise_cosine_similarity(&vectors, &vectors, 8).unwrap();
        assert!(max_abs_diff(&blocked, &single) < 1e-12);
    }

    #[test]
    fn test_self_similarity_is_symmetric_with_unit_diagonal() {
        let vectors = random_vectors(12, 6, 9);
        let similarity = pairwise_cosine_similarity(&vectors, &vectors, 5).unwrap();
        for i in 0..12 {
            assert!((similarity[[i, i]] - 1.0).abs() < 1e-12);
            for j in 0..12 {
                assert!((similarity[[i, j]] - similarity[[j, i]]).abs() < 1e-12);
                assert!((-1.0..=1.0).contains(&similarity[[i, j]]));
            }
        }
    }

    #[test]
    fn test_zero_rows_have_zero_similarity() {
        let mut vectors = random_vectors(4, 3, 2);
        vectors.row_mut(2).fill(0.0);
        let similarity = pairwise_cosine_similarity(&vectors, &vectors, 2).unwrap();
        assert!(similarity.row(2).iter().all(|&x| x == 0.0));
        assert!(similarity.column(2).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_empty_inputs() {
        let left: Array2<f64> = Array2::zeros((0, 4));
        let right = random_vectors(3, 4, 1);
        let similarity = pairwise_cosine_similarity(&left, &right, 2).unwrap();
        assert_eq!(similarity.shape(), &[0, 3]);
    }

    #[test]
    fn test_invalid_block_size() {
        let vectors = random_vectors(3, 2, 1);
        let result = pairwise_cosine_similarity(&vectors, &vectors, 0);
        assert!(matches!(result, Err(DistanceError::InvalidBlockSize(0))));
    }

    #[test]
    fn test_dimension_mismatch() {
        let left = random_vectors(3, 2, 1);
        let right = random_vectors(3, 4, 1);
        let result = pairwise_cosine_similarity(&left, &right, 2);
        assert!(matches!(
            result,
            Err(DistanceError::DimensionMismatch { left: 2, right: 4 })
        ));
    }
}
