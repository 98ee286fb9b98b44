use thiserror::Error;

/// Errors produced by the track-likelihood core.
///
/// Every fallible construction, mutation, or projection in this crate
/// returns one of these variants rather than panicking; only internal
/// kernel inconsistencies (a bug, not bad input) abort with a diagnostic.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackError {
    /// Dimension mismatch in matrix algebra (`add`/`sub`/`mul`).
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Determinant or inverse requested on a non-square matrix.
    #[error("determinant/inverse requested on a non-square {rows}x{cols} matrix")]
    NonSquare {
        /// Row count of the offending matrix.
        rows: usize,
        /// Column count of the offending matrix.
        cols: usize,
    },

    /// Zero determinant encountered while inverting a matrix.
    #[error("singular matrix: determinant is zero (or the covariance is not positive-definite)")]
    Singular,

    /// Covariance diagonal write was non-positive or below the 1e-12 floor.
    #[error("invalid covariance diagonal at index {index}: {value} (must exceed 1e-12)")]
    InvalidCovariance {
        /// Diagonal index that was rejected.
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// Lookup by a label that is neither a real nor a shadow label.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// Duplicate label supplied at construction time.
    #[error("duplicate label: {0}")]
    DuplicateLabel(String),

    /// An `*_err`/`err_*` key referenced a base quantity that does not exist.
    #[error("uncertainty key '{0}' has no matching base quantity")]
    MissingBase(String),

    /// A label contained non-ASCII bytes.
    #[error("label is not ASCII: {0:?}")]
    NonAscii(String),

    /// A label exceeded the compile-time maximum length.
    #[error("label '{label}' exceeds the maximum length of {max} bytes")]
    LabelTooLong {
        /// The offending label.
        label: String,
        /// The compile-time limit it exceeded.
        max: usize,
    },

    /// Both a `weights` mapping entry and an explicit `weights` argument
    /// were supplied to a Track constructor.
    #[error("weights supplied both in the mapping and as a separate argument")]
    DuplicateWeights,

    /// A Track lacked a label that a Datum required during projection.
    #[error("track projection incomplete: missing label '{0}'")]
    ProjectionIncomplete(String),

    /// A request for `n_threads > 1` was made in a build without threading.
    #[error("n_threads > 1 requested but multi-threading is unavailable")]
    NoConcurrency,
}
