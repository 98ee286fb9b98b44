//! Likelihood that a set of measured, covariant data vectors was drawn from
//! a weighted track through an N-dimensional observable space.
//!
//! A [`track::Track`] is an ordered sequence of vertices, each an N-vector,
//! with a per-vertex weight proportional to the density of the track at
//! that point. A [`sample::Sample`] is an ordered collection of
//! [`datum::Datum`]s, each a measured N-vector with its own covariance. The
//! core computation, [`likelihood`], sums a per-datum log-likelihood (a
//! weighted nearest-vertex χ², optionally corrected for the segment the
//! nearest vertex sits on) across a sample, optionally splitting the sum
//! across worker threads via [`concurrency`].

pub mod concurrency;
pub mod covariance;
pub mod datum;
pub mod error;
pub mod likelihood;
pub mod matrix;
pub mod quadrature;
pub mod sample;
pub mod track;

pub use covariance::CovarianceMatrix;
pub use datum::Datum;
pub use error::TrackError;
pub use likelihood::{log_likelihood_datum, log_likelihood_sample};
pub use matrix::{Matrix, MatrixLike};
pub use sample::{Relation, Sample};
pub use track::Track;

/// Maximum length, in bytes, of a label string.
pub const MAX_LABEL_LEN: usize = 100;

/// Multiplier applied to the detected CPU count to cap `n_threads`: a
/// `Track`/likelihood call may request at most `MAX_THREAD_FACTOR *
/// num_cpus::get()` worker threads before the request is silently clamped
/// (with a `log::warn!`, under the `std` feature).
pub const MAX_THREAD_FACTOR: usize = 10;

/// Shared label validation used by every label-accepting constructor
/// ([`datum::Datum::from_mapping`], [`track::Track::from_mapping`],
/// [`sample::Sample::from_columns`]).
///
/// # Errors
/// [`TrackError::NonAscii`] for non-ASCII bytes, [`TrackError::LabelTooLong`]
/// past [`MAX_LABEL_LEN`].
pub(crate) fn validate_label(label: &str) -> Result<(), TrackError> {
    if !label.is_ascii() {
        return Err(TrackError::NonAscii(label.to_string()));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(TrackError::LabelTooLong {
            label: label.to_string(),
            max: MAX_LABEL_LEN,
        });
    }
    Ok(())
}
