//! A single measured data vector: values, labels, and a covariance matrix.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::covariance::CovarianceMatrix;
use crate::matrix::MatrixLike;
use crate::error::TrackError;
use crate::validate_label;

/// A labeled measurement vector with a per-datum covariance matrix.
///
/// Labels are held once, in `labels` (a reference-counted slice so
/// [`CovarianceMatrix`] can share the same handle without copying the
/// strings). `shadow` holds labels that are valid
/// in the owning [`crate::sample::Sample`] but absent from this particular
/// Datum (§4.3.1): indexing by one of those returns `NaN` instead of
/// [`TrackError::UnknownLabel`].
#[derive(Debug, Clone)]
pub struct Datum {
    dim: usize,
    vector: Vec<f64>,
    labels: Arc<[String]>,
    index: HashMap<String, usize>,
    cov: CovarianceMatrix,
    shadow: HashSet<String>,
}

/// If `label` follows the `err_<base>` or `<base>_err` convention, return
/// `<base>`; otherwise `None`.
fn strip_err_affix(label: &str) -> Option<&str> {
    if let Some(rest) = label.strip_prefix("err_") {
        if !rest.is_empty() {
            return Some(rest);
        }
    }
    if let Some(rest) = label.strip_suffix("_err") {
        if !rest.is_empty() {
            return Some(rest);
        }
    }
    None
}

impl Datum {
    /// Build a Datum from an ordered list of `(label, value)` pairs.
    ///
    /// Keys matching the `err_<base>`/`<base>_err` convention supply the
    /// 1-sigma uncertainty of `<base>` (squared onto the covariance
    /// diagonal); every other key is a base quantity. Base quantities keep
    /// the order they first appear in `pairs`.
    ///
    /// # Errors
    /// [`TrackError::NonAscii`]/[`TrackError::LabelTooLong`] for malformed
    /// labels, [`TrackError::DuplicateLabel`] for a repeated base label,
    /// [`TrackError::MissingBase`] for an uncertainty key with no matching
    /// base, or [`TrackError::InvalidCovariance`] for a non-positive
    /// uncertainty.
    pub fn from_mapping(pairs: &[(&str, f64)]) -> Result<Self, TrackError> {
        let mut base_order: Vec<String> = Vec::new();
        let mut base_seen: HashSet<String> = HashSet::new();
        let mut base_values: HashMap<String, f64> = HashMap::new();
        let mut err_specs: Vec<(String, f64)> = Vec::new();

        for &(raw_label, value) in pairs {
            validate_label(raw_label)?;
            if let Some(base) = strip_err_affix(raw_label) {
                err_specs.push((base.to_string(), value));
            } else {
                if !base_seen.insert(raw_label.to_string()) {
                    return Err(TrackError::DuplicateLabel(raw_label.to_string()));
                }
                base_order.push(raw_label.to_string());
                base_values.insert(raw_label.to_string(), value);
            }
        }

        for (base, _) in &err_specs {
            if !base_seen.contains(base) {
                return Err(TrackError::MissingBase(base.clone()));
            }
        }

        let dim = base_order.len();
        let vector: Vec<f64> = base_order.iter().map(|l| base_values[l]).collect();
        let index: HashMap<String, usize> = base_order
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect();
        let labels: Arc<[String]> = Arc::from(base_order.into_boxed_slice());

        let mut cov = CovarianceMatrix::identity(dim);
        for (base, sigma) in &err_specs {
            let i = index[base];
            cov.set(i, i, sigma * sigma)?;
        }
        cov.attach_labels(Arc::clone(&labels));

        Ok(Datum {
            dim,
            vector,
            labels,
            index,
            cov,
            shadow: HashSet::new(),
        })
    }

    /// Number of components.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The measured vector.
    pub fn vector(&self) -> &[f64] {
        &self.vector
    }

    /// Labels, in the order they index `vector`.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The per-datum covariance matrix.
    pub fn cov(&self) -> &CovarianceMatrix {
        &self.cov
    }

    /// Whether `label` is a genuine component of this Datum (as opposed to
    /// a shadow label or an unknown one).
    pub fn has_label(&self, label: &str) -> bool {
        self.index.contains_key(label)
    }

    /// Mark `label` as a shadow label: a label valid in the owning Sample
    /// but absent from this Datum. A no-op if `label` is already a real
    /// component. Used by [`crate::sample::Sample::add`].
    pub(crate) fn mark_shadow(&mut self, label: &str) {
        if !self.index.contains_key(label) {
            self.shadow.insert(label.to_string());
        }
    }

    /// Component value for `label`.
    ///
    /// # Errors
    /// [`TrackError::UnknownLabel`] if `label` is neither a real nor a
    /// shadow component. Shadow components return `Ok(f64::NAN)`.
    pub fn get(&self, label: &str) -> Result<f64, TrackError> {
        if let Some(&i) = self.index.get(label) {
            return Ok(self.vector[i]);
        }
        if self.shadow.contains(label) {
            return Ok(f64::NAN);
        }
        Err(TrackError::UnknownLabel(label.to_string()))
    }

    /// Overwrite the component value for `label`.
    ///
    /// # Errors
    /// [`TrackError::UnknownLabel`] if `label` is not a real component of
    /// this Datum.
    pub fn set(&mut self, label: &str, value: f64) -> Result<(), TrackError> {
        let &i = self
            .index
            .get(label)
            .ok_or_else(|| TrackError::UnknownLabel(label.to_string()))?;
        self.vector[i] = value;
        Ok(())
    }

    /// A new Datum exposing only `labels`, in the given order. The
    /// covariance is the submatrix selecting the corresponding rows and
    /// columns.
    ///
    /// Returns `None` if none of `labels` are real components of this
    /// Datum, or if the resulting covariance submatrix is not invertible.
    pub fn project(&self, labels: &[&str]) -> Option<Datum> {
        let mut indices = Vec::new();
        let mut new_labels = Vec::new();
        for &l in labels {
            if let Some(&i) = self.index.get(l) {
                indices.push(i);
                new_labels.push(l.to_string());
            }
        }
        if indices.is_empty() {
            return None;
        }

        let vector: Vec<f64> = indices.iter().map(|&i| self.vector[i]).collect();
        let index: HashMap<String, usize> = new_labels
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, l)| (l, i))
            .collect();
        let labels_rc: Arc<[String]> = Arc::from(new_labels.into_boxed_slice());

        let mut cov = self.cov.submatrix(&indices).ok()?;
        cov.attach_labels(Arc::clone(&labels_rc));

        Some(Datum {
            dim: labels_rc.len(),
            vector,
            labels: labels_rc,
            index,
            cov,
            shadow: HashSet::new(),
        })
    }
}

impl MatrixLike for Datum {
    fn rows(&self) -> usize {
        1
    }
    fn cols(&self) -> usize {
        self.dim
    }
    fn get(&self, i: usize, j: usize) -> f64 {
        debug_assert_eq!(i, 0, "Datum is a single-row view");
        self.vector[j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_and_err_suffix_partition() {
        let d = Datum::from_mapping(&[("x", 1.0), ("x_err", 2.0), ("y", 3.0)]).unwrap();
        assert_eq!(d.dim(), 2);
        assert_eq!(d.get("x").unwrap(), 1.0);
        assert_eq!(d.get("y").unwrap(), 3.0);
        assert_eq!(d.cov().get(0, 0), 4.0); // sigma^2
        assert_eq!(d.cov().get(1, 1), 1.0); // default identity variance
    }

    #[test]
    fn err_prefix_convention_also_works() {
        let d = Datum::from_mapping(&[("x", 1.0), ("err_x", 0.5)]).unwrap();
        assert_eq!(d.cov().get(0, 0), 0.25);
    }

    #[test]
    fn missing_base_is_rejected() {
        let err = Datum::from_mapping(&[("x_err", 1.0)]).unwrap_err();
        assert_eq!(err, TrackError::MissingBase("x".to_string()));
    }

    #[test]
    fn duplicate_label_is_rejected() {
        let err = Datum::from_mapping(&[("x", 1.0), ("x", 2.0)]).unwrap_err();
        assert_eq!(err, TrackError::DuplicateLabel("x".to_string()));
    }

    #[test]
    fn non_ascii_label_is_rejected() {
        let err = Datum::from_mapping(&[("Ω", 1.0)]).unwrap_err();
        assert!(matches!(err, TrackError::NonAscii(_)));
    }

    #[test]
    fn unknown_label_errors_but_shadow_label_is_nan() {
        let mut d = Datum::from_mapping(&[("x", 1.0)]).unwrap();
        assert!(matches!(d.get("y"), Err(TrackError::UnknownLabel(_))));
        d.mark_shadow("y");
        assert!(d.get("y").unwrap().is_nan());
    }

    #[test]
    fn project_preserves_values() {
        let d = Datum::from_mapping(&[("x", 1.0), ("y", 2.0), ("z", 3.0)]).unwrap();
        let p = d.project(&["z", "x"]).unwrap();
        assert_eq!(p.dim(), 2);
        assert_eq!(p.get("z").unwrap(), 3.0);
        assert_eq!(p.get("x").unwrap(), 1.0);
    }

    #[test]
    fn project_with_no_matching_labels_is_none() {
        let d = Datum::from_mapping(&[("x", 1.0)]).unwrap();
        assert!(d.project(&["q"]).is_none());
    }
}
