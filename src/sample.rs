//! An ordered, possibly heterogeneous collection of measured [`Datum`]s.

use crate::datum::Datum;
use crate::error::TrackError;
use crate::validate_label;

/// Relational operators accepted by [`Sample::filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Relation {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Relation::Lt => lhs < rhs,
            Relation::Le => lhs <= rhs,
            Relation::Gt => lhs > rhs,
            Relation::Ge => lhs >= rhs,
            Relation::Eq => lhs == rhs,
        }
    }
}

/// An ordered collection of [`Datum`]s that need not all share the same
/// labels.
///
/// Labels are tracked in first-appearance order across the whole sample
/// (`keys()`). When a Datum is added whose labels differ from the sample's
/// existing key set, both sides are reconciled with shadow labels: the new
/// Datum gets a shadow label for every prior key it lacks, and every prior
/// Datum gets a shadow label for every
/// novel key the new one introduces. A shadow label reads as `NaN` rather
/// than failing with [`TrackError::UnknownLabel`].
#[derive(Debug, Clone, Default)]
pub struct Sample {
    data: Vec<Datum>,
    keys: Vec<String>,
}

impl Sample {
    /// An empty sample.
    pub fn new() -> Self {
        Sample {
            data: Vec::new(),
            keys: Vec::new(),
        }
    }

    /// Number of data in the sample.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the sample holds no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The union of every label ever seen, in first-appearance order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The data, in insertion order.
    pub fn data(&self) -> &[Datum] {
        &self.data
    }

    /// Append `datum`, reconciling shadow labels in both directions.
    pub fn add(&mut self, mut datum: Datum) {
        for key in &self.keys {
            if !datum.has_label(key) {
                datum.mark_shadow(key);
            }
        }
        for label in datum.labels().to_vec() {
            if !self.keys.iter().any(|k| k == &label) {
                for existing in &mut self.data {
                    existing.mark_shadow(&label);
                }
                self.keys.push(label);
            }
        }
        self.data.push(datum);
    }

    /// Build a sample from ordered `(label, values)` columns, one Datum per
    /// row. Uncertainty columns follow the `err_<base>`/`<base>_err`
    /// convention, as in [`Datum::from_mapping`].
    ///
    /// # Errors
    /// [`TrackError::Shape`] if columns disagree in length; otherwise
    /// whatever [`Datum::from_mapping`] can return for a single row.
    pub fn from_columns(pairs: &[(&str, Vec<f64>)]) -> Result<Self, TrackError> {
        for (label, _) in pairs {
            validate_label(label)?;
        }
        let n_rows = pairs.first().map_or(0, |(_, v)| v.len());
        for (label, values) in pairs {
            if values.len() != n_rows {
                return Err(TrackError::Shape(format!(
                    "column '{label}' has {} rows, expected {n_rows}",
                    values.len()
                )));
            }
        }

        let mut sample = Sample::new();
        for row in 0..n_rows {
            let row_pairs: Vec<(&str, f64)> =
                pairs.iter().map(|(label, values)| (*label, values[row])).collect();
            sample.add(Datum::from_mapping(&row_pairs)?);
        }
        Ok(sample)
    }

    /// The `i`-th Datum.
    pub fn get(&self, i: usize) -> Option<&Datum> {
        self.data.get(i)
    }

    /// `label` for every Datum, in sample order (`NaN` for shadow labels).
    ///
    /// # Errors
    /// [`TrackError::UnknownLabel`] if `label` is not in [`Sample::keys`].
    pub fn column(&self, label: &str) -> Result<Vec<f64>, TrackError> {
        if !self.keys.iter().any(|k| k == label) {
            return Err(TrackError::UnknownLabel(label.to_string()));
        }
        self.data.iter().map(|d| d.get(label)).collect()
    }

    /// `label`'s value on the Datum at `index` (`NaN` if `label` is a shadow
    /// label on that Datum).
    ///
    /// # Errors
    /// [`TrackError::UnknownLabel`] if `label` is not in [`Sample::keys`].
    /// Panics (via the underlying slice index) if `index >= self.len()`.
    pub fn value(&self, label: &str, index: usize) -> Result<f64, TrackError> {
        if !self.keys.iter().any(|k| k == label) {
            return Err(TrackError::UnknownLabel(label.to_string()));
        }
        self.data[index].get(label)
    }

    /// A new Sample containing only the data at `indices`, in the order
    /// given.
    pub fn slice(&self, indices: &[usize]) -> Sample {
        let mut out = Sample::new();
        for &i in indices {
            out.add(self.data[i].clone());
        }
        out
    }

    /// A new Sample keeping only the data for which `label`'s value stands
    /// in `relation` to `value`.
    ///
    /// `keep_missing` controls what happens to a Datum for which `label` is
    /// a shadow label (value `NaN`): `true` keeps it, `false` drops it.
    /// Emits a `log::warn!` if the result is empty.
    ///
    /// # Errors
    /// [`TrackError::UnknownLabel`] if `label` is not in [`Sample::keys`].
    pub fn filter(
        &self,
        label: &str,
        relation: Relation,
        value: f64,
        keep_missing: bool,
    ) -> Result<Sample, TrackError> {
        if !self.keys.iter().any(|k| k == label) {
            return Err(TrackError::UnknownLabel(label.to_string()));
        }
        let mut out = Sample::new();
        for datum in &self.data {
            let v = datum.get(label)?;
            let keep = if v.is_nan() {
                keep_missing
            } else {
                relation.holds(v, value)
            };
            if keep {
                out.add(datum.clone());
            }
        }
        if out.is_empty() {
            #[cfg(feature = "std")]
            log::warn!("Sample::filter on '{label}' produced an empty sample");
        }
        Ok(out)
    }

    /// A new Sample with every Datum projected onto `labels` ([`Datum::project`]).
    /// Data with no matching labels are dropped entirely.
    pub fn project(&self, labels: &[&str]) -> Sample {
        let mut out = Sample::new();
        for datum in &self.data {
            if let Some(projected) = datum.project(labels) {
                out.add(projected);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_reconciles_shadow_labels_both_ways() {
        let mut s = Sample::new();
        s.add(Datum::from_mapping(&[("x", 1.0), ("y", 2.0)]).unwrap());
        s.add(Datum::from_mapping(&[("x", 3.0), ("z", 4.0)]).unwrap());

        assert_eq!(s.keys(), &["x".to_string(), "y".to_string(), "z".to_string()]);
        assert!(s.get(0).unwrap().get("z").unwrap().is_nan());
        assert!(s.get(1).unwrap().get("y").unwrap().is_nan());
        assert_eq!(s.get(1).unwrap().get("x").unwrap(), 3.0);
    }

    #[test]
    fn from_columns_builds_one_datum_per_row() {
        let s = Sample::from_columns(&[("x", vec![1.0, 2.0, 3.0]), ("x_err", vec![0.1, 0.1, 0.1])])
            .unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.column("x").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn filter_keeps_matching_and_respects_keep_missing() {
        let mut s = Sample::new();
        s.add(Datum::from_mapping(&[("x", 1.0), ("y", 10.0)]).unwrap());
        s.add(Datum::from_mapping(&[("x", 5.0)]).unwrap());

        let kept = s.filter("y", Relation::Gt, 5.0, false).unwrap();
        assert_eq!(kept.len(), 1);

        let kept_missing = s.filter("y", Relation::Gt, 5.0, true).unwrap();
        assert_eq!(kept_missing.len(), 2);
    }

    #[test]
    fn filter_on_unknown_label_errors() {
        let s = Sample::new();
        assert!(matches!(
            s.filter("q", Relation::Eq, 0.0, true),
            Err(TrackError::UnknownLabel(_))
        ));
    }

    #[test]
    fn value_reads_a_single_scalar_by_label_and_row() {
        let mut s = Sample::new();
        s.add(Datum::from_mapping(&[("x", 1.0), ("y", 2.0)]).unwrap());
        s.add(Datum::from_mapping(&[("x", 3.0), ("z", 4.0)]).unwrap());

        assert_eq!(s.value("x", 1).unwrap(), 3.0);
        assert!(s.value("y", 1).unwrap().is_nan());
        assert!(matches!(s.value("q", 0), Err(TrackError::UnknownLabel(_))));
    }

    #[test]
    fn slice_selects_data_by_index_and_preserves_shadow_reconciliation() {
        let mut s = Sample::new();
        s.add(Datum::from_mapping(&[("x", 1.0), ("y", 2.0)]).unwrap());
        s.add(Datum::from_mapping(&[("x", 3.0), ("z", 4.0)]).unwrap());
        s.add(Datum::from_mapping(&[("x", 5.0)]).unwrap());

        let sliced = s.slice(&[2, 0]);
        assert_eq!(sliced.len(), 2);
        assert_eq!(sliced.get(0).unwrap().get("x").unwrap(), 5.0);
        assert_eq!(sliced.get(1).unwrap().get("x").unwrap(), 1.0);
        assert_eq!(sliced.get(1).unwrap().get("y").unwrap(), 2.0);
    }

    #[test]
    fn project_drops_data_with_no_matching_labels() {
        let mut s = Sample::new();
        s.add(Datum::from_mapping(&[("x", 1.0), ("y", 2.0)]).unwrap());
        s.add(Datum::from_mapping(&[("z", 3.0)]).unwrap());

        let projected = s.project(&["x"]);
        assert_eq!(projected.len(), 1);
    }
}
