//! Symmetric covariance matrices with a cached inverse and optional shared
//! labels.

use std::sync::Arc;

use crate::error::TrackError;
use crate::matrix::{self, Matrix, MatrixLike};

/// Covariance diagonals must exceed this magnitude; it guards against
/// catastrophic cancellation in χ² evaluation.
pub const DIAGONAL_FLOOR: f64 = 1e-12;

/// A symmetric matrix together with its cached inverse, and (optionally) a
/// shared handle to the owning [`crate::datum::Datum`]'s label array.
///
/// Writes go through [`CovarianceMatrix::set`], which enforces the diagonal
/// floor and keeps the cached inverse in lockstep: a write is only
/// committed once its inverse has been computed successfully, so a
/// `CovarianceMatrix` never observably holds a stale or missing inverse
/// after a successful `set`.
#[derive(Debug, Clone)]
pub struct CovarianceMatrix {
    size: usize,
    data: Matrix,
    inv: Matrix,
    labels: Option<Arc<[String]>>,
}

impl CovarianceMatrix {
    /// The `size x size` identity covariance (the default starting point
    /// before `*_err` diagonals are absorbed).
    pub fn identity(size: usize) -> Self {
        let data = Matrix::identity(size);
        let inv = data.clone();
        CovarianceMatrix {
            size,
            data,
            inv,
            labels: None,
        }
    }

    /// Build from an arbitrary square matrix, validating the diagonal floor
    /// and computing the initial inverse.
    ///
    /// # Errors
    /// [`TrackError::NonSquare`] if `data` isn't square,
    /// [`TrackError::InvalidCovariance`] if a diagonal entry doesn't clear
    /// [`DIAGONAL_FLOOR`], or [`TrackError::Singular`] if `data` isn't
    /// invertible.
    pub fn from_matrix(data: Matrix) -> Result<Self, TrackError> {
        let size = data.rows();
        if data.cols() != size {
            return Err(TrackError::NonSquare {
                rows: data.rows(),
                cols: data.cols(),
            });
        }
        for i in 0..size {
            let d = data.get(i, i);
            if d <= DIAGONAL_FLOOR {
                return Err(TrackError::InvalidCovariance { index: i, value: d });
            }
        }
        let inv = matrix::invert(&data)?;
        Ok(CovarianceMatrix {
            size,
            data,
            inv,
            labels: None,
        })
    }

    /// Attach a shared label handle (cloning the `Arc`, not the strings).
    /// Never allocates a fresh copy of the labels and never mutates them.
    pub fn attach_labels(&mut self, labels: Arc<[String]>) {
        self.labels = Some(labels);
    }

    /// The shared label handle, if one has been attached.
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// Size of the (square) covariance matrix.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Element at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data.get(i, j)
    }

    /// Write `(i, j)`; off-diagonal writes mirror to `(j, i)` to preserve
    /// symmetry. The write is transactional: if the resulting matrix turns
    /// out singular, neither `data` nor `inv` are changed.
    ///
    /// # Errors
    /// [`TrackError::InvalidCovariance`] for a diagonal write at or below
    /// [`DIAGONAL_FLOOR`], or [`TrackError::Singular`] if the resulting
    /// matrix is not invertible — the way a covariance that has become
    /// non-positive-definite is detected.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<(), TrackError> {
        if i == j && value <= DIAGONAL_FLOOR {
            return Err(TrackError::InvalidCovariance { index: i, value });
        }
        let mut scratch = self.data.clone();
        scratch.set(i, j, value);
        scratch.set(j, i, value);
        let inv = matrix::invert(&scratch)?;
        self.data = scratch;
        self.inv = inv;
        Ok(())
    }

    /// The cached inverse.
    pub fn inv(&self) -> &Matrix {
        &self.inv
    }

    /// Determinant of the underlying matrix.
    pub fn determinant(&self) -> f64 {
        matrix::determinant(&self.data).unwrap_or(f64::NAN)
    }

    /// The submatrix formed by selecting `indices` from both rows and
    /// columns, in the order given. Labels are not carried over — the
    /// caller (`Datum::project`) attaches its own projected label array.
    ///
    /// # Errors
    /// [`TrackError::Singular`] if the selected submatrix is not
    /// invertible.
    pub fn submatrix(&self, indices: &[usize]) -> Result<CovarianceMatrix, TrackError> {
        let n = indices.len();
        let mut data = Matrix::zeros(n, n);
        for (a, &i) in indices.iter().enumerate() {
            for (b, &j) in indices.iter().enumerate() {
                data.set(a, b, self.data.get(i, j));
            }
        }
        CovarianceMatrix::from_matrix(data)
    }
}

impl MatrixLike for CovarianceMatrix {
    fn rows(&self) -> usize {
        self.size
    }
    fn cols(&self) -> usize {
        self.size
    }
    fn get(&self, i: usize, j: usize) -> f64 {
        CovarianceMatrix::get(self, i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_close(m: &Matrix, eps: f64) -> bool {
        (0..m.rows()).all(|i| {
            (0..m.cols()).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (m.get(i, j) - expected).abs() < eps
            })
        })
    }

    #[test]
    fn off_diagonal_write_mirrors() {
        let mut cov = CovarianceMatrix::identity(3);
        cov.set(0, 2, 0.4).unwrap();
        assert_eq!(cov.get(0, 2), cov.get(2, 0));
    }

    #[test]
    fn inverse_is_kept_fresh_after_every_write() {
        let mut cov = CovarianceMatrix::identity(3);
        cov.set(0, 1, 0.2).unwrap();
        cov.set(1, 1, 4.0).unwrap();
        let product = Matrix::mul(&Matrix::from_rows(
            (0..3).map(|i| (0..3).map(|j| cov.get(i, j)).collect()).collect(),
        )
        .unwrap(), cov.inv())
        .unwrap();
        assert!(identity_close(&product, 1e-10));
    }

    #[test]
    fn diagonal_write_below_floor_is_rejected() {
        let mut cov = CovarianceMatrix::identity(2);
        assert!(matches!(
            cov.set(0, 0, 1e-13),
            Err(TrackError::InvalidCovariance { .. })
        ));
        // rejected write must not have mutated the matrix
        assert_eq!(cov.get(0, 0), 1.0);
    }

    #[test]
    fn negative_diagonal_is_rejected() {
        let mut cov = CovarianceMatrix::identity(2);
        assert!(matches!(
            cov.set(1, 1, -2.0),
            Err(TrackError::InvalidCovariance { .. })
        ));
    }
}
