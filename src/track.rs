//! An ordered, weighted polyline through N-dimensional observable space.

use std::collections::HashMap;

use crate::error::TrackError;
use crate::matrix::Matrix;
use crate::validate_label;

/// A sequence of vertices (an ordered, piecewise-linear curve) together with
/// a per-vertex weight proportional to the density of the track at that
/// vertex.
///
/// Vertices are stored as rows of a dense `Matrix` rather than a
/// `Vec<Vec<f64>>`: the shape is fixed at construction and every row has the
/// full dimensionality, so the row-major `Matrix` layout used everywhere
/// else in this crate applies here too.
#[derive(Debug, Clone)]
pub struct Track {
    n_vertices: usize,
    dim: usize,
    labels: Vec<String>,
    index: HashMap<String, usize>,
    predictions: Matrix,
    weights: Vec<f64>,
    /// Whether [`crate::likelihood`] should apply the per-segment
    /// marginalization correction around the nearest vertex, rather than
    /// treating the track as a set of isolated points.
    pub use_line_segment_corrections: bool,
    /// Whether [`crate::likelihood`] should rescale `weights` before use,
    /// rather than using them as given.
    pub normalize_weights: bool,
    n_threads: usize,
}

impl Track {
    /// Build a Track from an ordered list of `(label, values)` pairs, one
    /// entry per dimension, each `values` of length `n_vertices`.
    ///
    /// A pair whose label is exactly `"weights"` supplies the per-vertex
    /// weight instead of a dimension; it is mutually exclusive with the
    /// `weights` argument. With neither, every vertex gets weight 1.0.
    ///
    /// # Errors
    /// [`TrackError::Shape`] if `pairs` is empty of dimension columns, or if
    /// any column (including `weights`) disagrees in length with the first;
    /// [`TrackError::DuplicateLabel`] for a repeated dimension label;
    /// [`TrackError::DuplicateWeights`] if both a `"weights"` pair and the
    /// `weights` argument are supplied; [`TrackError::NonAscii`]/
    /// [`TrackError::LabelTooLong`] for a malformed label.
    pub fn from_mapping(
        pairs: &[(&str, Vec<f64>)],
        weights: Option<Vec<f64>>,
    ) -> Result<Self, TrackError> {
        let mut label_order: Vec<String> = Vec::new();
        let mut columns: HashMap<String, Vec<f64>> = HashMap::new();
        let mut mapping_weights: Option<Vec<f64>> = None;
        let mut n_vertices: Option<usize> = None;

        for (raw_label, values) in pairs {
            if *raw_label == "weights" {
                mapping_weights = Some(values.clone());
                continue;
            }
            validate_label(raw_label)?;
            if let Some(n) = n_vertices {
                if values.len() != n {
                    return Err(TrackError::Shape(format!(
                        "label '{raw_label}' has {} vertices, expected {n}",
                        values.len()
                    )));
                }
            } else {
                n_vertices = Some(values.len());
            }
            if columns.insert(raw_label.to_string(), values.clone()).is_some() {
                return Err(TrackError::DuplicateLabel(raw_label.to_string()));
            }
            label_order.push(raw_label.to_string());
        }

        let n_vertices = n_vertices.ok_or_else(|| {
            TrackError::Shape("a track needs at least one dimension column".to_string())
        })?;

        if let Some(w) = &mapping_weights {
            if w.len() != n_vertices {
                return Err(TrackError::Shape(format!(
                    "weights has {} vertices, expected {n_vertices}",
                    w.len()
                )));
            }
        }

        let weights = match (mapping_weights, weights) {
            (Some(_), Some(_)) => return Err(TrackError::DuplicateWeights),
            (Some(w), None) => w,
            (None, Some(w)) => {
                if w.len() != n_vertices {
                    return Err(TrackError::Shape(format!(
                        "weights has {} vertices, expected {n_vertices}",
                        w.len()
                    )));
                }
                w
            }
            (None, None) => vec![1.0; n_vertices],
        };

        let dim = label_order.len();
        let index: HashMap<String, usize> = label_order
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect();
        let mut predictions = Matrix::zeros(n_vertices, dim);
        for (j, label) in label_order.iter().enumerate() {
            let col = &columns[label];
            for i in 0..n_vertices {
                predictions.set(i, j, col[i]);
            }
        }

        Ok(Track {
            n_vertices,
            dim,
            labels: label_order,
            index,
            predictions,
            weights,
            use_line_segment_corrections: false,
            normalize_weights: true,
            n_threads: 1,
        })
    }

    /// Number of vertices.
    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    /// Number of dimensions (columns).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Dimension labels, in column order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Whether `label` names a dimension of this track.
    pub fn has_label(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Per-vertex weights, as stored (not renormalized).
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Number of worker threads a likelihood evaluation over this track
    /// should use.
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    /// Set the number of worker threads. Threading is only available under
    /// the `std` feature.
    ///
    /// # Errors
    /// [`TrackError::NoConcurrency`] if `n > 1` and the crate was built
    /// without the `std` feature.
    pub fn set_n_threads(&mut self, n: usize) -> Result<(), TrackError> {
        if n > 1 && !cfg!(feature = "std") {
            return Err(TrackError::NoConcurrency);
        }
        self.n_threads = n.max(1);
        Ok(())
    }

    /// The vertex `i` as a row slice, in `labels()` order.
    pub fn row(&self, i: usize) -> &[f64] {
        self.predictions.row(i)
    }

    /// Component `label` at vertex `index`.
    ///
    /// # Errors
    /// [`TrackError::UnknownLabel`] if `label` is not a dimension of this
    /// track.
    pub fn value(&self, label: &str, index: usize) -> Result<f64, TrackError> {
        let &j = self
            .index
            .get(label)
            .ok_or_else(|| TrackError::UnknownLabel(label.to_string()))?;
        Ok(self.predictions.get(index, j))
    }

    /// Every value of `label` across all vertices, in vertex order.
    ///
    /// # Errors
    /// [`TrackError::UnknownLabel`] if `label` is not a dimension of this
    /// track.
    pub fn column(&self, label: &str) -> Result<Vec<f64>, TrackError> {
        let &j = self
            .index
            .get(label)
            .ok_or_else(|| TrackError::UnknownLabel(label.to_string()))?;
        Ok((0..self.n_vertices).map(|i| self.predictions.get(i, j)).collect())
    }

    /// The full set of `(label, value)` pairs at vertex `index`, including a
    /// trailing `("weights", w)` entry.
    pub fn vertex(&self, index: usize) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .labels
            .iter()
            .enumerate()
            .map(|(j, l)| (l.clone(), self.predictions.get(index, j)))
            .collect();
        out.push(("weights".to_string(), self.weights[index]));
        out
    }

    /// A new Track containing only the vertices at `indices`, in the order
    /// given, preserving dimension labels and configuration flags.
    pub fn slice(&self, indices: &[usize]) -> Track {
        let mut predictions = Matrix::zeros(indices.len(), self.dim);
        let mut weights = Vec::with_capacity(indices.len());
        for (a, &i) in indices.iter().enumerate() {
            for j in 0..self.dim {
                predictions.set(a, j, self.predictions.get(i, j));
            }
            weights.push(self.weights[i]);
        }
        Track {
            n_vertices: indices.len(),
            dim: self.dim,
            labels: self.labels.clone(),
            index: self.index.clone(),
            predictions,
            weights,
            use_line_segment_corrections: self.use_line_segment_corrections,
            normalize_weights: self.normalize_weights,
            n_threads: self.n_threads,
        }
    }

    /// A copy of this Track with `weights` substituted for its own, every
    /// other field unchanged. Used by [`crate::likelihood`] to evaluate
    /// against a rescaled weight vector without mutating the caller's Track.
    pub(crate) fn with_weights(&self, weights: Vec<f64>) -> Track {
        Track {
            weights,
            ..self.clone()
        }
    }

    /// A new Track exposing only `labels`, in the given order, with every
    /// vertex and its weight carried over unchanged.
    ///
    /// Returns `None` if none of `labels` are dimensions of this track.
    pub fn project(&self, labels: &[&str]) -> Option<Track> {
        let mut cols = Vec::new();
        let mut new_labels = Vec::new();
        for &l in labels {
            if let Some(&j) = self.index.get(l) {
                cols.push(j);
                new_labels.push(l.to_string());
            }
        }
        if cols.is_empty() {
            return None;
        }

        let mut predictions = Matrix::zeros(self.n_vertices, cols.len());
        for i in 0..self.n_vertices {
            for (a, &j) in cols.iter().enumerate() {
                predictions.set(i, a, self.predictions.get(i, j));
            }
        }
        let index: HashMap<String, usize> = new_labels
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect();

        Some(Track {
            n_vertices: self.n_vertices,
            dim: new_labels.len(),
            labels: new_labels,
            index,
            predictions,
            weights: self.weights.clone(),
            use_line_segment_corrections: self.use_line_segment_corrections,
            normalize_weights: self.normalize_weights,
            n_threads: self.n_threads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_mapping_defaults_to_unit_weights() {
        let t = Track::from_mapping(&[("x", vec![0.0, 1.0, 2.0]), ("y", vec![0.0, 0.0, 0.0])], None)
            .unwrap();
        assert_eq!(t.n_vertices(), 3);
        assert_eq!(t.dim(), 2);
        assert_eq!(t.weights(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn weights_key_in_mapping_is_used() {
        let t = Track::from_mapping(
            &[("x", vec![0.0, 1.0]), ("weights", vec![0.25, 0.75])],
            None,
        )
        .unwrap();
        assert_eq!(t.dim(), 1);
        assert_eq!(t.weights(), &[0.25, 0.75]);
    }

    #[test]
    fn duplicate_weights_is_rejected() {
        let err = Track::from_mapping(
            &[("x", vec![0.0, 1.0]), ("weights", vec![0.5, 0.5])],
            Some(vec![1.0, 1.0]),
        )
        .unwrap_err();
        assert_eq!(err, TrackError::DuplicateWeights);
    }

    #[test]
    fn ragged_column_is_rejected() {
        let err = Track::from_mapping(&[("x", vec![0.0, 1.0]), ("y", vec![0.0])], None).unwrap_err();
        assert!(matches!(err, TrackError::Shape(_)));
    }

    #[test]
    fn project_drops_unmatched_labels_and_keeps_order() {
        let t = Track::from_mapping(
            &[("x", vec![0.0, 1.0]), ("y", vec![2.0, 3.0]), ("z", vec![4.0, 5.0])],
            None,
        )
        .unwrap();
        let p = t.project(&["z", "x", "q"]).unwrap();
        assert_eq!(p.labels(), &["z".to_string(), "x".to_string()]);
        assert_eq!(p.value("z", 1).unwrap(), 5.0);
        assert_eq!(p.value("x", 0).unwrap(), 0.0);
    }

    #[test]
    fn slice_preserves_flags_and_selects_vertices() {
        let mut t = Track::from_mapping(&[("x", vec![0.0, 1.0, 2.0])], None).unwrap();
        t.use_line_segment_corrections = true;
        let s = t.slice(&[2, 0]);
        assert_eq!(s.n_vertices(), 2);
        assert_eq!(s.value("x", 0).unwrap(), 2.0);
        assert_eq!(s.value("x", 1).unwrap(), 0.0);
        assert!(s.use_line_segment_corrections);
    }

    #[test]
    fn set_n_threads_rejects_multi_without_concurrency() {
        let mut t = Track::from_mapping(&[("x", vec![0.0, 1.0])], None).unwrap();
        if cfg!(feature = "std") {
            assert!(t.set_n_threads(4).is_ok());
            assert_eq!(t.n_threads(), 4);
        } else {
            assert_eq!(t.set_n_threads(4), Err(TrackError::NoConcurrency));
        }
    }
}
