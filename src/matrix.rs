//! Dense real matrix kernel.
//!
//! The hot path only ever touches 1xN, NxN, and Nx1 shapes with N typically
//! at most 20 (vertex/covariance dimensions), so a naive, allocation-light
//! kernel outperforms pulling in a BLAS/LAPACK-backed array library for
//! this crate's purposes. `determinant`/`cofactors`/`invert` are generic
//! over [`MatrixLike`] so [`crate::covariance::CovarianceMatrix`] and
//! [`crate::datum::Datum`] can be handed to them directly, without copying
//! into a scratch `Matrix` first.

use crate::error::TrackError;

/// A read-only view over something shaped like a matrix: known row/column
/// counts and indexed element access. `Matrix` itself, `CovarianceMatrix`,
/// and a single `Datum` (as a 1xN row) all implement this, so the kernel's
/// square-matrix routines never need to know which concrete type they were
/// handed.
pub trait MatrixLike {
    /// Number of rows.
    fn rows(&self) -> usize;
    /// Number of columns.
    fn cols(&self) -> usize;
    /// Element at `(i, j)`, zero-indexed.
    fn get(&self, i: usize, j: usize) -> f64;
}

/// A dense, row-major, owned matrix of `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// An all-zeros `rows x cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// The `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Matrix::zeros(n, n);
        for i in 0..n {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build a matrix from row-major nested rows.
    ///
    /// # Errors
    /// Returns [`TrackError::Shape`] if the rows are not all the same length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, TrackError> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in &rows {
            if row.len() != n_cols {
                return Err(TrackError::Shape(format!(
                    "ragged rows: expected {n_cols} columns, found {}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix {
            rows: n_rows,
            cols: n_cols,
            data,
        })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    /// Overwrite the element at `(i, j)`.
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.cols + j] = value;
    }

    /// The `i`-th row as a contiguous slice.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    fn same_shape(&self, other: &Matrix) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }

    /// Elementwise sum, written into `out`, which is resized to match.
    pub fn add_into(&self, other: &Matrix, out: &mut Matrix) -> Result<(), TrackError> {
        if !self.same_shape(other) {
            return Err(TrackError::Shape(format!(
                "add: {}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        *out = Matrix::zeros(self.rows, self.cols);
        for (o, (a, b)) in out.data.iter_mut().zip(self.data.iter().zip(&other.data)) {
            *o = a + b;
        }
        Ok(())
    }

    /// Elementwise sum.
    ///
    /// # Errors
    /// Returns [`TrackError::Shape`] when `self` and `other` differ in shape.
    pub fn add(&self, other: &Matrix) -> Result<Matrix, TrackError> {
        let mut out = Matrix::zeros(0, 0);
        self.add_into(other, &mut out)?;
        Ok(out)
    }

    /// Elementwise difference, written into `out`, which is resized to match.
    pub fn sub_into(&self, other: &Matrix, out: &mut Matrix) -> Result<(), TrackError> {
        if !self.same_shape(other) {
            return Err(TrackError::Shape(format!(
                "sub: {}x{} vs {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        *out = Matrix::zeros(self.rows, self.cols);
        for (o, (a, b)) in out.data.iter_mut().zip(self.data.iter().zip(&other.data)) {
            *o = a - b;
        }
        Ok(())
    }

    /// Elementwise difference.
    ///
    /// # Errors
    /// Returns [`TrackError::Shape`] when `self` and `other` differ in shape.
    pub fn sub(&self, other: &Matrix) -> Result<Matrix, TrackError> {
        let mut out = Matrix::zeros(0, 0);
        self.sub_into(other, &mut out)?;
        Ok(out)
    }

    /// Matrix product, written into `out`, which is resized to match.
    pub fn mul_into(&self, other: &Matrix, out: &mut Matrix) -> Result<(), TrackError> {
        if self.cols != other.rows {
            return Err(TrackError::Shape(format!(
                "mul: {}x{} * {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        *out = Matrix::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..other.cols {
                    let v = out.get(i, j) + a * other.get(k, j);
                    out.set(i, j, v);
                }
            }
        }
        Ok(())
    }

    /// Matrix product. Legal when `self.cols == other.rows`.
    ///
    /// # Errors
    /// Returns [`TrackError::Shape`] when the inner dimensions disagree.
    pub fn mul(&self, other: &Matrix) -> Result<Matrix, TrackError> {
        let mut out = Matrix::zeros(0, 0);
        self.mul_into(other, &mut out)?;
        Ok(out)
    }

    /// Scalar multiple.
    pub fn scale(&self, factor: f64) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// Transpose, written into `out`, which is resized to match.
    pub fn transpose_into(&self, out: &mut Matrix) {
        *out = Matrix::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                out.set(j, i, self.get(i, j));
            }
        }
    }

    /// Transpose: `out[j][i] = self[i][j]`.
    pub fn transpose(&self) -> Matrix {
        let mut out = Matrix::zeros(0, 0);
        self.transpose_into(&mut out);
        out
    }

    /// Determinant, for square matrices only.
    ///
    /// # Errors
    /// Returns [`TrackError::NonSquare`] when `self` is not square.
    pub fn determinant(&self) -> Result<f64, TrackError> {
        determinant(self)
    }

    /// Cofactor matrix: `C[i][j] = (-1)^(i+j) * det(minor(self, i, j))`.
    ///
    /// # Errors
    /// Returns [`TrackError::NonSquare`] when `self` is not square.
    pub fn cofactors(&self) -> Result<Matrix, TrackError> {
        cofactors(self)
    }

    /// Inverse, via `adjugate(self) / det(self)`.
    ///
    /// # Errors
    /// Returns [`TrackError::NonSquare`] when `self` is not square, or
    /// [`TrackError::Singular`] when `det(self) == 0`.
    pub fn invert(&self) -> Result<Matrix, TrackError> {
        invert(self)
    }
}

impl MatrixLike for Matrix {
    fn rows(&self) -> usize {
        self.rows
    }
    fn cols(&self) -> usize {
        self.cols
    }
    fn get(&self, i: usize, j: usize) -> f64 {
        Matrix::get(self, i, j)
    }
}

enum Axis {
    Row,
    Col,
}

/// Pick the row or column with the most zero entries ("ideal axis") to
/// expand the determinant along.
fn ideal_axis<M: MatrixLike + ?Sized>(m: &M) -> (Axis, usize) {
    let n = m.rows();
    let mut best_axis = Axis::Row;
    let mut best_index = 0;
    let mut best_zeros: i64 = -1;

    for i in 0..n {
        let zeros = (0..n).filter(|&j| m.get(i, j) == 0.0).count() as i64;
        if zeros > best_zeros {
            best_zeros = zeros;
            best_axis = Axis::Row;
            best_index = i;
        }
    }
    for j in 0..n {
        let zeros = (0..n).filter(|&i| m.get(i, j) == 0.0).count() as i64;
        if zeros > best_zeros {
            best_zeros = zeros;
            best_axis = Axis::Col;
            best_index = j;
        }
    }
    (best_axis, best_index)
}

/// The `(n-1) x (n-1)` submatrix formed by deleting `skip_row`/`skip_col`.
fn minor<M: MatrixLike + ?Sized>(m: &M, skip_row: usize, skip_col: usize) -> Matrix {
    let n = m.rows();
    let mut data = Vec::with_capacity((n - 1) * (n - 1));
    for i in 0..n {
        if i == skip_row {
            continue;
        }
        for j in 0..n {
            if j == skip_col {
                continue;
            }
            data.push(m.get(i, j));
        }
    }
    Matrix {
        rows: n - 1,
        cols: n - 1,
        data,
    }
}

fn det_recursive<M: MatrixLike + ?Sized>(m: &M) -> f64 {
    let n = m.rows();
    match n {
        0 => 1.0,
        1 => m.get(0, 0),
        2 => m.get(0, 0) * m.get(1, 1) - m.get(0, 1) * m.get(1, 0),
        _ => {
            let (axis, index) = ideal_axis(m);
            let mut det = 0.0;
            for k in 0..n {
                let (i, j) = match axis {
                    Axis::Row => (index, k),
                    Axis::Col => (k, index),
                };
                let value = m.get(i, j);
                if value == 0.0 {
                    continue;
                }
                let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                let sub = minor(m, i, j);
                det += sign * value * det_recursive(&sub);
            }
            det
        }
    }
}

/// Determinant of any square [`MatrixLike`] view.
///
/// # Errors
/// Returns [`TrackError::NonSquare`] when `m.rows() != m.cols()`.
pub fn determinant<M: MatrixLike + ?Sized>(m: &M) -> Result<f64, TrackError> {
    if m.rows() != m.cols() {
        return Err(TrackError::NonSquare {
            rows: m.rows(),
            cols: m.cols(),
        });
    }
    Ok(det_recursive(m))
}

/// Cofactor matrix of any square [`MatrixLike`] view.
///
/// # Errors
/// Returns [`TrackError::NonSquare`] when `m.rows() != m.cols()`.
pub fn cofactors<M: MatrixLike + ?Sized>(m: &M) -> Result<Matrix, TrackError> {
    let n = m.rows();
    if n != m.cols() {
        return Err(TrackError::NonSquare {
            rows: m.rows(),
            cols: m.cols(),
        });
    }
    let mut out = Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
            let sub = minor(m, i, j);
            out.set(i, j, sign * det_recursive(&sub));
        }
    }
    Ok(out)
}

/// Inverse of any square [`MatrixLike`] view, via `adjugate(m) / det(m)`.
///
/// # Errors
/// Returns [`TrackError::NonSquare`] for a non-square `m`, or
/// [`TrackError::Singular`] when `det(m) == 0`.
pub fn invert<M: MatrixLike + ?Sized>(m: &M) -> Result<Matrix, TrackError> {
    let det = determinant(m)?;
    if det == 0.0 || !det.is_finite() {
        return Err(TrackError::Singular);
    }
    let adjugate = cofactors(m)?.transpose();
    Ok(adjugate.scale(1.0 / det))
}
