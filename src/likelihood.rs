//! χ², segment correction, and log-likelihood evaluation: the core
//! computation relating a [`Track`] to a [`Datum`] or a whole [`Sample`].

use std::sync::Mutex;

use crate::concurrency;
use crate::datum::Datum;
use crate::error::TrackError;
use crate::matrix::Matrix;
use crate::quadrature::Simpson;
use crate::sample::Sample;
use crate::track::Track;

const SEGMENT_TOLERANCE: f64 = 1e-3;
const SEGMENT_N_MIN: usize = 64;
const SEGMENT_N_MAX: usize = 1_000_000;

/// Project `track` onto exactly `datum`'s labels.
///
/// Unlike [`Track::project`], which silently drops labels with no match,
/// this requires every label of `datum` to be present in `track`.
///
/// # Errors
/// [`TrackError::ProjectionIncomplete`] naming a label of `datum` absent
/// from `track`.
fn project_onto_datum(track: &Track, datum: &Datum) -> Result<Track, TrackError> {
    for label in datum.labels() {
        if !track.has_label(label) {
            return Err(TrackError::ProjectionIncomplete(label.clone()));
        }
    }
    let labels: Vec<&str> = datum.labels().iter().map(String::as_str).collect();
    track
        .project(&labels)
        .ok_or_else(|| TrackError::ProjectionIncomplete(datum.labels()[0].clone()))
}

/// `T.weights[i] / W̄`, `W̄ = sum(T.weights) / (1000 * n_vertices)`.
fn rescaled_weights(track: &Track) -> Vec<f64> {
    let n = track.n_vertices() as f64;
    let w_bar = track.weights().iter().sum::<f64>() / (1000.0 * n);
    if w_bar == 0.0 {
        track.weights().to_vec()
    } else {
        track.weights().iter().map(|w| w / w_bar).collect()
    }
}

fn vector_diff(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// `u . cov_inv . v` (not assumed symmetric in `u`/`v`: the β integrand
/// needs both `L.cov_inv.L` and `Δ.cov_inv.L`).
fn quadratic_form(cov_inv: &Matrix, u: &[f64], v: &[f64]) -> f64 {
    let k = u.len();
    let mut total = 0.0;
    for i in 0..k {
        let mut row_sum = 0.0;
        for j in 0..k {
            row_sum += cov_inv.get(i, j) * v[j];
        }
        total += u[i] * row_sum;
    }
    total
}

fn euclidean_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// The per-datum routine, assuming `track.weights()` are already the
/// weights to use as given (no rescaling). Shared by
/// [`log_likelihood_datum`] and [`log_likelihood_sample`], each of which
/// arranges for `track` to already carry the right (possibly rescaled)
/// weights before calling in.
fn log_likelihood_datum_raw(track: &Track, datum: &Datum) -> Result<f64, TrackError> {
    let projected = project_onto_datum(track, datum)?;
    let det = datum.cov().determinant();
    if det <= 0.0 || !det.is_finite() {
        return Err(TrackError::Singular);
    }
    let cov_inv = datum.cov().inv();
    let n = projected.n_vertices();
    let quadrature = Simpson::new(SEGMENT_N_MIN, SEGMENT_N_MAX, SEGMENT_TOLERANCE);

    let mut result = 0.0;
    for i in 0..n {
        let vertex_i = projected.row(i);
        let diff = vector_diff(datum.vector(), vertex_i);
        let chi2 = quadratic_form(cov_inv, &diff, &diff);

        let delta_m = if i + 1 < n {
            euclidean_norm(&vector_diff(projected.row(i + 1), vertex_i))
        } else {
            0.0
        };

        let beta = if !projected.use_line_segment_corrections {
            1.0
        } else if i + 1 >= n {
            0.0
        } else {
            let l = vector_diff(projected.row(i + 1), vertex_i);
            let a = quadratic_form(cov_inv, &l, &l);
            let b = quadratic_form(cov_inv, &diff, &l);
            quadrature.integrate(|q| (-0.5 * (a * q * q - 2.0 * b * q)).exp(), 0.0, 1.0)
        };

        result += projected.weights()[i] * (-0.5 * chi2).exp() * delta_m * beta;
    }

    let normalization = (2.0 * std::f64::consts::PI * det).sqrt();
    Ok((result / normalization).ln())
}

/// Log-likelihood of a single [`Datum`] under `track`: the nearest-vertex χ²
/// at every track vertex, weighted, optionally corrected for the segment the
/// vertex sits on, summed, and normalized against the Datum's own covariance.
///
/// # Arguments
/// * `track` - the weighted polyline to evaluate against. Only the labels
///   `datum` has are used; `track` may carry extra dimensions.
/// * `datum` - the measured vector and its covariance.
///
/// # Returns
/// The log-likelihood, or `f64::NEG_INFINITY` for a track whose nearest
/// vertex to `datum` is also its final vertex (zero segment length).
///
/// If `track.normalize_weights` is set, a throwaway local copy of
/// `track`'s weights is rescaled for this call only; `track` itself is
/// never mutated.
///
/// # Errors
/// [`TrackError::ProjectionIncomplete`] if `track` lacks a label `datum`
/// requires, or [`TrackError::Singular`] if `datum.cov()`'s determinant is
/// not strictly positive.
///
/// # Example
/// ```
/// use tracklike::{log_likelihood_datum, Datum, Track};
///
/// let track = Track::from_mapping(&[("x", vec![0.0, 1.0, 2.0])], None).unwrap();
/// let datum = Datum::from_mapping(&[("x", 1.1), ("x_err", 0.2)]).unwrap();
/// let logl = log_likelihood_datum(&track, &datum).unwrap();
/// assert!(logl.is_finite());
/// ```
pub fn log_likelihood_datum(track: &Track, datum: &Datum) -> Result<f64, TrackError> {
    if track.normalize_weights {
        let rescaled = track.with_weights(rescaled_weights(track));
        log_likelihood_datum_raw(&rescaled, datum)
    } else {
        log_likelihood_datum_raw(track, datum)
    }
}

/// Summed log-likelihood of an entire [`Sample`] under `track`, optionally
/// split across `track.n_threads()` worker threads
/// ([`crate::concurrency::sum_partitioned`]).
///
/// # Arguments
/// * `track` - the weighted polyline, shared by every Datum in `sample`.
///   `track.n_threads()` controls how many worker threads the summation is
///   split across; `track.normalize_weights` controls whether weights are
///   rescaled before use.
/// * `sample` - the data to sum over, each evaluated against the labels it
///   individually carries (a heterogeneous Sample is fine: each Datum is
///   projected onto `track` independently).
///
/// # Returns
/// The sum of each Datum's [`log_likelihood_datum`], with one correction: if
/// `track.normalize_weights` is unset, `sum(track.weights())` is subtracted
/// from the total exactly once (not once per Datum).
///
/// Weights are rescaled (if `track.normalize_weights`) exactly once and
/// reused for every Datum, rather than per call.
///
/// # Errors
/// [`TrackError::ProjectionIncomplete`]/[`TrackError::Singular`], the first
/// time any Datum in `sample` triggers one.
///
/// # Example
/// ```
/// use tracklike::{log_likelihood_sample, Datum, Sample, Track};
///
/// let track = Track::from_mapping(&[("x", vec![0.0, 1.0, 2.0])], None).unwrap();
/// let mut sample = Sample::new();
/// sample.add(Datum::from_mapping(&[("x", 0.3)]).unwrap());
/// sample.add(Datum::from_mapping(&[("x", 1.8)]).unwrap());
/// let logl = log_likelihood_sample(&track, &sample).unwrap();
/// assert!(logl.is_finite());
/// ```
pub fn log_likelihood_sample(track: &Track, sample: &Sample) -> Result<f64, TrackError> {
    let working = if track.normalize_weights {
        track.with_weights(rescaled_weights(track))
    } else {
        track.clone()
    };

    let data = sample.data();
    let first_error: Mutex<Option<TrackError>> = Mutex::new(None);
    let total = concurrency::sum_partitioned(data, track.n_threads(), |datum| {
        match log_likelihood_datum_raw(&working, datum) {
            Ok(v) => v,
            Err(e) => {
                *first_error.lock().expect("lock poisoned") = Some(e);
                0.0
            }
        }
    });

    if let Some(e) = first_error.into_inner().expect("lock poisoned") {
        return Err(e);
    }

    let total = if track.normalize_weights {
        total
    } else {
        total - track.weights().iter().sum::<f64>()
    };
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_track_label_is_projection_incomplete() {
        let track = Track::from_mapping(&[("x", vec![0.0, 1.0])], None).unwrap();
        let datum = Datum::from_mapping(&[("x", 0.0), ("y", 0.0)]).unwrap();
        assert!(matches!(
            log_likelihood_datum(&track, &datum),
            Err(TrackError::ProjectionIncomplete(_))
        ));
    }

    #[test]
    fn rescaled_weights_preserves_relative_proportions() {
        let track =
            Track::from_mapping(&[("x", vec![0.0, 1.0, 2.0]), ("weights", vec![1.0, 3.0, 2.0])], None)
                .unwrap();
        let scaled = rescaled_weights(&track);
        assert!((scaled[1] / scaled[0] - 3.0).abs() < 1e-12);
        assert!((scaled[2] / scaled[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn quadratic_form_matches_hand_computation() {
        let cov_inv = Matrix::identity(2);
        let u = [1.0, 2.0];
        let v = [3.0, 4.0];
        assert_eq!(quadratic_form(&cov_inv, &u, &v), 11.0);
    }
}
